//! Budget error types.

use cible_shared::AppError;
use cible_shared::types::{ExpenseLineId, TaxId, ThemeId};
use rust_decimal::Decimal;
use thiserror::Error;

/// Expense ledger errors.
///
/// Aggregation never fails; these are raised when lines or taxes enter the ledger.
#[derive(Debug, Error)]
pub enum BudgetError {
    /// A required field is missing.
    #[error("Missing required field: {field}")]
    MissingField {
        /// Field name.
        field: &'static str,
    },

    /// Amount cannot be negative.
    #[error("{field} cannot be negative: {value}")]
    NegativeAmount {
        /// Field name.
        field: &'static str,
        /// Rejected value.
        value: Decimal,
    },

    /// Line amounts do not fit the money type.
    #[error("Expense line amounts overflow: {quantity} x {unit_price}")]
    AmountOverflow {
        /// Line quantity.
        quantity: Decimal,
        /// Largest unit price of the line.
        unit_price: Decimal,
    },

    /// Tax rate cannot be negative.
    #[error("Tax rate cannot be negative: {rate}")]
    NegativeTaxRate {
        /// Rejected rate.
        rate: Decimal,
    },

    /// Tax ID already registered.
    #[error("Tax already exists: {0}")]
    DuplicateTax(TaxId),

    /// Theme not registered.
    #[error("Theme not found: {0}")]
    ThemeNotFound(ThemeId),

    /// Tax not found.
    #[error("Tax not found: {0}")]
    TaxNotFound(TaxId),

    /// Expense line not found.
    #[error("Expense line not found: {0}")]
    LineNotFound(ExpenseLineId),

    /// Tax still referenced by expense lines.
    #[error("Tax {tax} is used by {lines} expense line(s)")]
    TaxInUse {
        /// Tax being removed.
        tax: TaxId,
        /// Number of referencing lines.
        lines: usize,
    },
}

impl BudgetError {
    /// Returns true for missing-reference errors.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::ThemeNotFound(_) | Self::TaxNotFound(_) | Self::LineNotFound(_)
        )
    }
}

impl From<BudgetError> for AppError {
    fn from(err: BudgetError) -> Self {
        match err {
            BudgetError::ThemeNotFound(_)
            | BudgetError::TaxNotFound(_)
            | BudgetError::LineNotFound(_) => Self::NotFound(err.to_string()),
            BudgetError::DuplicateTax(_) | BudgetError::TaxInUse { .. } => {
                Self::Conflict(err.to_string())
            }
            BudgetError::MissingField { .. }
            | BudgetError::NegativeAmount { .. }
            | BudgetError::AmountOverflow { .. }
            | BudgetError::NegativeTaxRate { .. } => Self::Validation(err.to_string()),
        }
    }
}
