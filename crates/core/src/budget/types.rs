//! Expense ledger and budget report types.

use cible_shared::types::{ExpenseLineId, TaxId, ThemeId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A tax applicable to expense lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tax {
    /// Tax ID.
    pub id: TaxId,
    /// Display label (e.g., "VAT").
    pub label: String,
    /// Rate as a percentage (18 means 18%).
    pub rate: Decimal,
}

/// Fixed expense category enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpenseCategory {
    /// Goods and services acquisitions.
    Acquisition,
    /// Administrative costs.
    Administrative,
}

impl std::fmt::Display for ExpenseCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Acquisition => write!(f, "acquisition"),
            Self::Administrative => write!(f, "administrative"),
        }
    }
}

/// A validated expense line owned by a theme's budget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseLine {
    /// Line ID.
    pub id: ExpenseLineId,
    /// Owning theme.
    pub theme_id: ThemeId,
    /// Expense category.
    pub category: ExpenseCategory,
    /// Free-form description.
    pub label: String,
    /// Quantity (>= 0).
    pub quantity: Decimal,
    /// Planned unit price, tax-exclusive (>= 0).
    pub planned_unit_price: Decimal,
    /// Realized unit price, tax-exclusive; `None` until realized.
    pub actual_unit_price: Option<Decimal>,
    /// Applicable taxes, sorted and without duplicates.
    pub tax_ids: Vec<TaxId>,
}

impl ExpenseLine {
    /// Realized unit price, falling back to the planned one.
    #[must_use]
    pub fn effective_actual_unit_price(&self) -> Decimal {
        self.actual_unit_price.unwrap_or(self.planned_unit_price)
    }

    /// Whether an actual price has been recorded.
    #[must_use]
    pub const fn is_realized(&self) -> bool {
        self.actual_unit_price.is_some()
    }
}

/// Input for creating or replacing an expense line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateExpenseLineInput {
    /// Owning theme.
    pub theme_id: ThemeId,
    /// Expense category.
    pub category: ExpenseCategory,
    /// Free-form description.
    #[serde(default)]
    pub label: String,
    /// Quantity; defaults to 1.
    #[serde(default)]
    pub quantity: Option<Decimal>,
    /// Planned unit price (required).
    #[serde(default)]
    pub planned_unit_price: Option<Decimal>,
    /// Realized unit price.
    #[serde(default)]
    pub actual_unit_price: Option<Decimal>,
    /// Applicable taxes.
    #[serde(default)]
    pub tax_ids: Vec<TaxId>,
}

impl CreateExpenseLineInput {
    /// Creates an input with quantity 1, no actual price and no tax.
    #[must_use]
    pub fn new(theme_id: ThemeId, category: ExpenseCategory, planned_unit_price: Decimal) -> Self {
        Self {
            theme_id,
            category,
            label: String::new(),
            quantity: None,
            planned_unit_price: Some(planned_unit_price),
            actual_unit_price: None,
            tax_ids: Vec::new(),
        }
    }

    /// Sets the label.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Sets the quantity.
    #[must_use]
    pub const fn with_quantity(mut self, quantity: Decimal) -> Self {
        self.quantity = Some(quantity);
        self
    }

    /// Sets the realized unit price.
    #[must_use]
    pub const fn with_actual(mut self, actual_unit_price: Decimal) -> Self {
        self.actual_unit_price = Some(actual_unit_price);
        self
    }

    /// Adds an applicable tax.
    #[must_use]
    pub fn with_tax(mut self, tax_id: TaxId) -> Self {
        self.tax_ids.push(tax_id);
        self
    }
}

/// Unrounded per-line figures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LineAmounts {
    /// Sum of applicable tax rates, in percent.
    pub total_tax_rate: Decimal,
    /// Planned tax-exclusive amount.
    pub planned_ht: Decimal,
    /// Planned tax-inclusive amount.
    pub planned_ttc: Decimal,
    /// Actual tax-exclusive amount.
    pub actual_ht: Decimal,
    /// Actual tax-inclusive amount.
    pub actual_ttc: Decimal,
}

/// Monetary totals over a group of lines, rounded to 2 decimal places.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BudgetTotals {
    /// Planned tax-exclusive total.
    pub planned_ht: Decimal,
    /// Planned tax-inclusive total.
    pub planned_ttc: Decimal,
    /// Actual tax-exclusive total.
    pub actual_ht: Decimal,
    /// Actual tax-inclusive total.
    pub actual_ttc: Decimal,
}

/// Planned vs actual comparison for a theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VarianceReport {
    /// Planned tax-inclusive total.
    pub planned_ttc: Decimal,
    /// Actual tax-inclusive total.
    pub actual_ttc: Decimal,
    /// `|actual_ttc - planned_ttc|`.
    pub absolute_variance: Decimal,
    /// `actual_ttc - planned_ttc` (positive means overspent).
    pub variance: Decimal,
    /// Actual / planned * 100 (0 when nothing is planned).
    pub utilization_percent: Decimal,
}

/// Per-category group of a theme's lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CategoryTotals {
    /// Number of lines in the category.
    pub count: usize,
    /// Planned tax-inclusive total.
    pub total_ttc: Decimal,
    /// Actual tax-inclusive total.
    pub actual_ttc: Decimal,
}

/// Per-line export row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineReport {
    /// Line ID.
    pub line_id: ExpenseLineId,
    /// Expense category.
    pub category: ExpenseCategory,
    /// Line label.
    pub label: String,
    /// Quantity.
    pub quantity: Decimal,
    /// Sum of applicable tax rates, in percent.
    pub total_tax_rate: Decimal,
    /// Planned tax-exclusive amount.
    pub planned_ht: Decimal,
    /// Planned tax-inclusive amount.
    pub planned_ttc: Decimal,
    /// Actual tax-exclusive amount.
    pub actual_ht: Decimal,
    /// Actual tax-inclusive amount.
    pub actual_ttc: Decimal,
    /// Whether the actual figures come from a recorded price.
    pub is_realized: bool,
}
