//! In-memory expense ledger.
//!
//! Lines are validated on the way in so the aggregator can stay total: every
//! line in the ledger has non-negative amounts whose tax-inclusive products
//! fit a `Decimal`, a registered theme and taxes that exist.

use std::collections::{HashMap, HashSet};

use cible_shared::types::{ExpenseLineId, TaxId, ThemeId};
use rust_decimal::Decimal;
use tracing::info;

use super::error::BudgetError;
use super::service::BudgetAggregator;
use super::types::{CreateExpenseLineInput, ExpenseLine, Tax};

/// Taxes, registered themes and the expense lines of each theme.
#[derive(Debug, Clone, Default)]
pub struct ExpenseLedger {
    taxes: HashMap<TaxId, Tax>,
    themes: HashSet<ThemeId>,
    lines: HashMap<ExpenseLineId, ExpenseLine>,
    lines_by_theme: HashMap<ThemeId, Vec<ExpenseLineId>>,
}

impl ExpenseLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a theme so lines can be attached to it. Returns false if already known.
    pub fn register_theme(&mut self, theme_id: ThemeId) -> bool {
        self.themes.insert(theme_id)
    }

    /// Whether the theme is registered.
    #[must_use]
    pub fn has_theme(&self, theme_id: ThemeId) -> bool {
        self.themes.contains(&theme_id)
    }

    /// Removes a theme together with its lines, returning the removed lines.
    ///
    /// # Errors
    ///
    /// Returns `BudgetError::ThemeNotFound` if the theme is not registered.
    pub fn remove_theme(&mut self, theme_id: ThemeId) -> Result<Vec<ExpenseLine>, BudgetError> {
        if !self.themes.remove(&theme_id) {
            return Err(BudgetError::ThemeNotFound(theme_id));
        }

        let removed: Vec<ExpenseLine> = self
            .lines_by_theme
            .remove(&theme_id)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|id| self.lines.remove(&id))
            .collect();

        info!(%theme_id, lines = removed.len(), "Removed theme budget");
        Ok(removed)
    }

    /// Adds a tax.
    ///
    /// # Errors
    ///
    /// Returns `BudgetError::NegativeTaxRate` for a negative rate and
    /// `BudgetError::DuplicateTax` if the ID is taken.
    pub fn add_tax(&mut self, tax: Tax) -> Result<TaxId, BudgetError> {
        if tax.rate < Decimal::ZERO {
            return Err(BudgetError::NegativeTaxRate { rate: tax.rate });
        }
        if self.taxes.contains_key(&tax.id) {
            return Err(BudgetError::DuplicateTax(tax.id));
        }

        let id = tax.id;
        info!(tax_id = %id, rate = %tax.rate, "Added tax");
        self.taxes.insert(id, tax);
        Ok(id)
    }

    /// Removes a tax no line references any more.
    ///
    /// # Errors
    ///
    /// Returns `BudgetError::TaxNotFound` for an unknown tax and
    /// `BudgetError::TaxInUse` while lines still reference it.
    pub fn remove_tax(&mut self, tax_id: TaxId) -> Result<Tax, BudgetError> {
        if !self.taxes.contains_key(&tax_id) {
            return Err(BudgetError::TaxNotFound(tax_id));
        }

        let lines = self
            .lines
            .values()
            .filter(|line| line.tax_ids.contains(&tax_id))
            .count();
        if lines > 0 {
            return Err(BudgetError::TaxInUse { tax: tax_id, lines });
        }

        info!(%tax_id, "Removed tax");
        self.taxes.remove(&tax_id).ok_or(BudgetError::TaxNotFound(tax_id))
    }

    /// Looks up a tax.
    #[must_use]
    pub fn tax(&self, tax_id: TaxId) -> Option<&Tax> {
        self.taxes.get(&tax_id)
    }

    /// Adds a validated line to its theme.
    ///
    /// # Errors
    ///
    /// Returns a `BudgetError` if the input fails validation.
    pub fn add_line(&mut self, input: CreateExpenseLineInput) -> Result<ExpenseLineId, BudgetError> {
        let line = self.validate(ExpenseLineId::new(), input)?;
        let id = line.id;

        info!(
            line_id = %id,
            theme_id = %line.theme_id,
            category = %line.category,
            "Added expense line"
        );
        self.lines_by_theme.entry(line.theme_id).or_default().push(id);
        self.lines.insert(id, line);
        Ok(id)
    }

    /// Replaces every field of an existing line, possibly moving it to another theme.
    ///
    /// # Errors
    ///
    /// Returns `BudgetError::LineNotFound` for an unknown line, or a
    /// validation error for the new content.
    pub fn update_line(
        &mut self,
        line_id: ExpenseLineId,
        input: CreateExpenseLineInput,
    ) -> Result<&ExpenseLine, BudgetError> {
        let previous_theme = self
            .lines
            .get(&line_id)
            .map(|line| line.theme_id)
            .ok_or(BudgetError::LineNotFound(line_id))?;

        let line = self.validate(line_id, input)?;
        if line.theme_id != previous_theme {
            self.detach(previous_theme, line_id);
            self.lines_by_theme.entry(line.theme_id).or_default().push(line_id);
        }

        info!(%line_id, theme_id = %line.theme_id, "Updated expense line");
        self.lines.insert(line_id, line);
        self.lines.get(&line_id).ok_or(BudgetError::LineNotFound(line_id))
    }

    /// Deletes a line immediately.
    ///
    /// # Errors
    ///
    /// Returns `BudgetError::LineNotFound` for an unknown line.
    pub fn remove_line(&mut self, line_id: ExpenseLineId) -> Result<ExpenseLine, BudgetError> {
        let line = self
            .lines
            .remove(&line_id)
            .ok_or(BudgetError::LineNotFound(line_id))?;
        self.detach(line.theme_id, line_id);

        info!(%line_id, theme_id = %line.theme_id, "Removed expense line");
        Ok(line)
    }

    /// Looks up a line.
    #[must_use]
    pub fn line(&self, line_id: ExpenseLineId) -> Option<&ExpenseLine> {
        self.lines.get(&line_id)
    }

    /// Lines of a theme in insertion order. Unknown themes have no lines.
    pub fn lines_for_theme(&self, theme_id: ThemeId) -> impl Iterator<Item = &ExpenseLine> + '_ {
        self.lines_by_theme
            .get(&theme_id)
            .into_iter()
            .flatten()
            .filter_map(move |id| self.lines.get(id))
    }

    /// Total number of lines across themes.
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    fn detach(&mut self, theme_id: ThemeId, line_id: ExpenseLineId) {
        if let Some(ids) = self.lines_by_theme.get_mut(&theme_id) {
            ids.retain(|id| *id != line_id);
        }
    }

    fn validate(
        &self,
        id: ExpenseLineId,
        input: CreateExpenseLineInput,
    ) -> Result<ExpenseLine, BudgetError> {
        let planned_unit_price = input.planned_unit_price.ok_or(BudgetError::MissingField {
            field: "planned_unit_price",
        })?;
        let quantity = input.quantity.unwrap_or(Decimal::ONE);

        non_negative("quantity", quantity)?;
        non_negative("planned_unit_price", planned_unit_price)?;
        if let Some(actual) = input.actual_unit_price {
            non_negative("actual_unit_price", actual)?;
        }

        if !self.themes.contains(&input.theme_id) {
            return Err(BudgetError::ThemeNotFound(input.theme_id));
        }

        let mut tax_ids = input.tax_ids;
        tax_ids.sort_unstable();
        tax_ids.dedup();
        if let Some(missing) = tax_ids.iter().find(|id| !self.taxes.contains_key(*id)) {
            return Err(BudgetError::TaxNotFound(*missing));
        }

        let line = ExpenseLine {
            id,
            theme_id: input.theme_id,
            category: input.category,
            label: input.label.trim().to_string(),
            quantity,
            planned_unit_price,
            actual_unit_price: input.actual_unit_price,
            tax_ids,
        };

        let rates = line
            .tax_ids
            .iter()
            .filter_map(|tax_id| self.taxes.get(tax_id).map(|tax| tax.rate));
        if BudgetAggregator::checked_line(&line, rates).is_none() {
            return Err(BudgetError::AmountOverflow {
                quantity,
                unit_price: planned_unit_price.max(line.effective_actual_unit_price()),
            });
        }

        Ok(line)
    }
}

fn non_negative(field: &'static str, value: Decimal) -> Result<(), BudgetError> {
    if value < Decimal::ZERO {
        return Err(BudgetError::NegativeAmount { field, value });
    }
    Ok(())
}
