//! Reference graph error types.

use cible_shared::AppError;
use thiserror::Error;

use super::types::EntityKind;

/// Errors raised while building a reference graph or importing rows into one.
#[derive(Debug, Error)]
pub enum GraphError {
    /// Two records of the same kind share an ID.
    #[error("Duplicate {kind} id: {id}")]
    DuplicateId {
        /// Entity kind.
        kind: EntityKind,
        /// Offending ID.
        id: String,
    },

    /// An import row left a required code empty.
    #[error("Row {row}: {field} is blank")]
    BlankField {
        /// 1-based row number.
        row: usize,
        /// Field name.
        field: &'static str,
    },

    /// An import row attaches an existing sub-unit code to a different org unit.
    #[error("Row {row}: sub-unit {sub_unit} already belongs to org unit {existing}, not {requested}")]
    SubUnitOwnershipConflict {
        /// 1-based row number.
        row: usize,
        /// Normalized sub-unit code.
        sub_unit: String,
        /// Org unit code the sub-unit was first attached to.
        existing: String,
        /// Org unit code requested by this row.
        requested: String,
    },

    /// An import row repeats an employee registration number.
    #[error("Row {row}: duplicate registration number {registration_number}")]
    DuplicateRegistration {
        /// 1-based row number.
        row: usize,
        /// Registration number.
        registration_number: String,
    },
}

impl GraphError {
    /// Returns true for missing-reference errors.
    ///
    /// Dangling references are tolerated while building a graph, so no
    /// variant is a not-found error today.
    #[must_use]
    #[allow(clippy::unused_self)]
    pub const fn is_not_found(&self) -> bool {
        false
    }

    /// 1-based import row the error refers to, if any.
    #[must_use]
    pub const fn row(&self) -> Option<usize> {
        match self {
            Self::BlankField { row, .. }
            | Self::SubUnitOwnershipConflict { row, .. }
            | Self::DuplicateRegistration { row, .. } => Some(*row),
            Self::DuplicateId { .. } => None,
        }
    }
}

impl From<GraphError> for AppError {
    fn from(err: GraphError) -> Self {
        match err {
            GraphError::DuplicateId { .. } | GraphError::DuplicateRegistration { .. } => {
                Self::Conflict(err.to_string())
            }
            GraphError::BlankField { .. } | GraphError::SubUnitOwnershipConflict { .. } => {
                Self::Validation(err.to_string())
            }
        }
    }
}
