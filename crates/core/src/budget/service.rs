//! Budget aggregation over the expense ledger.
//!
//! Per-line figures:
//!
//! ```text
//! planned_ht  = planned_unit_price * quantity
//! actual_ht   = (actual_unit_price or planned_unit_price) * quantity
//! planned_ttc = planned_ht * (1 + sum(tax rates) / 100)
//! actual_ttc  = actual_ht  * (1 + sum(tax rates) / 100)
//! ```
//!
//! Sums are accumulated at full precision and rounded once, when a report is
//! produced.

use std::collections::{BTreeMap, HashSet};

use cible_shared::types::{FormationId, ProgramId, ThemeId, percent_factor, round_money};
use rust_decimal::Decimal;
use tracing::{debug, warn};

use super::ledger::ExpenseLedger;
use super::types::{
    BudgetTotals, CategoryTotals, ExpenseCategory, ExpenseLine, LineAmounts, LineReport,
    VarianceReport,
};

/// Read-only aggregation over one ledger.
#[derive(Debug, Clone, Copy)]
pub struct BudgetAggregator<'l> {
    ledger: &'l ExpenseLedger,
}

impl<'l> BudgetAggregator<'l> {
    /// Creates an aggregator over `ledger`.
    #[must_use]
    pub const fn new(ledger: &'l ExpenseLedger) -> Self {
        Self { ledger }
    }

    /// Computes the unrounded figures of one line from its applicable tax rates.
    ///
    /// Figures that do not fit a `Decimal` saturate at `Decimal::MAX`; the
    /// ledger refuses such lines, see [`checked_line`](Self::checked_line).
    #[must_use]
    pub fn compute_line<I>(line: &ExpenseLine, tax_rates: I) -> LineAmounts
    where
        I: IntoIterator<Item = Decimal>,
    {
        let total_tax_rate = tax_rates
            .into_iter()
            .fold(Decimal::ZERO, Decimal::saturating_add);
        let factor = percent_factor(total_tax_rate);

        let planned_ht = line.planned_unit_price.saturating_mul(line.quantity);
        let actual_ht = line.effective_actual_unit_price().saturating_mul(line.quantity);

        LineAmounts {
            total_tax_rate,
            planned_ht,
            planned_ttc: planned_ht.saturating_mul(factor),
            actual_ht,
            actual_ttc: actual_ht.saturating_mul(factor),
        }
    }

    /// Same as [`compute_line`](Self::compute_line), or `None` when a figure overflows.
    #[must_use]
    pub fn checked_line<I>(line: &ExpenseLine, tax_rates: I) -> Option<LineAmounts>
    where
        I: IntoIterator<Item = Decimal>,
    {
        let total_tax_rate = tax_rates
            .into_iter()
            .try_fold(Decimal::ZERO, Decimal::checked_add)?;
        let factor = percent_factor(total_tax_rate);

        let planned_ht = line.planned_unit_price.checked_mul(line.quantity)?;
        let actual_ht = line.effective_actual_unit_price().checked_mul(line.quantity)?;

        Some(LineAmounts {
            total_tax_rate,
            planned_ht,
            planned_ttc: planned_ht.checked_mul(factor)?,
            actual_ht,
            actual_ttc: actual_ht.checked_mul(factor)?,
        })
    }

    /// Unrounded figures of a ledger line, using the ledger's tax rates.
    #[must_use]
    pub fn line_amounts(&self, line: &ExpenseLine) -> LineAmounts {
        let rates = line.tax_ids.iter().map(|tax_id| {
            self.ledger.tax(*tax_id).map_or_else(
                || {
                    warn!(%tax_id, line_id = %line.id, "Ignoring unknown tax on expense line");
                    Decimal::ZERO
                },
                |tax| tax.rate,
            )
        });
        Self::compute_line(line, rates)
    }

    /// Totals of one theme. Unknown themes total zero.
    #[must_use]
    pub fn aggregate_by_theme(&self, theme_id: ThemeId) -> BudgetTotals {
        self.accumulate(std::iter::once(theme_id)).finish()
    }

    /// Totals over every theme of a formation.
    ///
    /// Theme membership is resolved by the caller; repeated ids count once.
    #[must_use]
    pub fn aggregate_by_formation(
        &self,
        formation_id: FormationId,
        theme_ids: &[ThemeId],
    ) -> BudgetTotals {
        let totals = self.accumulate(unique(theme_ids)).finish();
        debug!(%formation_id, themes = theme_ids.len(), "Aggregated formation budget");
        totals
    }

    /// Totals over every theme of a program.
    ///
    /// Theme membership is resolved by the caller; repeated ids count once.
    #[must_use]
    pub fn aggregate_by_program(&self, program_id: ProgramId, theme_ids: &[ThemeId]) -> BudgetTotals {
        let totals = self.accumulate(unique(theme_ids)).finish();
        debug!(%program_id, themes = theme_ids.len(), "Aggregated program budget");
        totals
    }

    /// Planned vs actual tax-inclusive totals of a theme.
    #[must_use]
    pub fn variance_report(&self, theme_id: ThemeId) -> VarianceReport {
        let sums = self.accumulate(std::iter::once(theme_id));
        let variance = sums.actual_ttc - sums.planned_ttc;

        // A ratio too large for a Decimal saturates.
        let utilization_percent = if sums.planned_ttc.is_zero() {
            Decimal::ZERO
        } else {
            sums.actual_ttc
                .checked_div(sums.planned_ttc)
                .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
                .map_or(Decimal::MAX, round_money)
        };

        VarianceReport {
            planned_ttc: round_money(sums.planned_ttc),
            actual_ttc: round_money(sums.actual_ttc),
            absolute_variance: round_money(variance.abs()),
            variance: round_money(variance),
            utilization_percent,
        }
    }

    /// Line count and tax-inclusive totals per category. Empty categories are omitted.
    #[must_use]
    pub fn by_category(&self, theme_id: ThemeId) -> BTreeMap<ExpenseCategory, CategoryTotals> {
        let mut groups: BTreeMap<ExpenseCategory, (usize, Sums)> = BTreeMap::new();

        for line in self.ledger.lines_for_theme(theme_id) {
            let (count, sums) = groups.entry(line.category).or_default();
            *count += 1;
            sums.add(&self.line_amounts(line));
        }

        groups
            .into_iter()
            .map(|(category, (count, sums))| {
                (
                    category,
                    CategoryTotals {
                        count,
                        total_ttc: round_money(sums.planned_ttc),
                        actual_ttc: round_money(sums.actual_ttc),
                    },
                )
            })
            .collect()
    }

    /// Rounded per-line rows of a theme, in ledger order.
    #[must_use]
    pub fn line_breakdown(&self, theme_id: ThemeId) -> Vec<LineReport> {
        self.ledger
            .lines_for_theme(theme_id)
            .map(|line| {
                let amounts = self.line_amounts(line);
                LineReport {
                    line_id: line.id,
                    category: line.category,
                    label: line.label.clone(),
                    quantity: line.quantity,
                    total_tax_rate: amounts.total_tax_rate,
                    planned_ht: round_money(amounts.planned_ht),
                    planned_ttc: round_money(amounts.planned_ttc),
                    actual_ht: round_money(amounts.actual_ht),
                    actual_ttc: round_money(amounts.actual_ttc),
                    is_realized: line.is_realized(),
                }
            })
            .collect()
    }

    fn accumulate<I>(&self, theme_ids: I) -> Sums
    where
        I: IntoIterator<Item = ThemeId>,
    {
        let mut sums = Sums::default();
        for theme_id in theme_ids {
            for line in self.ledger.lines_for_theme(theme_id) {
                sums.add(&self.line_amounts(line));
            }
        }
        sums
    }
}

/// Full-precision running totals, saturating at `Decimal::MAX`.
#[derive(Debug, Clone, Copy, Default)]
struct Sums {
    planned_ht: Decimal,
    planned_ttc: Decimal,
    actual_ht: Decimal,
    actual_ttc: Decimal,
}

impl Sums {
    fn add(&mut self, amounts: &LineAmounts) {
        self.planned_ht = self.planned_ht.saturating_add(amounts.planned_ht);
        self.planned_ttc = self.planned_ttc.saturating_add(amounts.planned_ttc);
        self.actual_ht = self.actual_ht.saturating_add(amounts.actual_ht);
        self.actual_ttc = self.actual_ttc.saturating_add(amounts.actual_ttc);
    }

    fn finish(self) -> BudgetTotals {
        BudgetTotals {
            planned_ht: round_money(self.planned_ht),
            planned_ttc: round_money(self.planned_ttc),
            actual_ht: round_money(self.actual_ht),
            actual_ttc: round_money(self.actual_ttc),
        }
    }
}

fn unique(theme_ids: &[ThemeId]) -> impl Iterator<Item = ThemeId> + '_ {
    let mut seen = HashSet::with_capacity(theme_ids.len());
    theme_ids.iter().copied().filter(move |id| seen.insert(*id))
}
