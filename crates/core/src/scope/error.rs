//! Scope tree construction errors.

use cible_shared::AppError;
use cible_shared::types::{JobFamilyId, OrgUnitId, PositionId, SubUnitId};
use thiserror::Error;

use crate::graph::EntityKind;

/// Errors raised while building a scope tree from client input.
///
/// Resolution itself never fails; these only occur at write time.
#[derive(Debug, Error)]
pub enum ScopeError {
    /// An id field does not hold a valid identifier.
    #[error("Invalid {field} id: {value:?}")]
    InvalidId {
        /// Payload field.
        field: &'static str,
        /// Raw value received.
        value: String,
    },

    /// A referenced entity does not exist.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Entity kind.
        kind: EntityKind,
        /// Missing ID.
        id: String,
    },

    /// A position is listed under a family it does not belong to.
    #[error("Position {position} does not belong to job family {family}")]
    PositionNotInFamily {
        /// Offending position.
        position: PositionId,
        /// Parent family node.
        family: JobFamilyId,
    },

    /// A sub-unit is listed under an org unit it does not belong to.
    #[error("Sub-unit {sub_unit} does not belong to org unit {org_unit}")]
    SubUnitNotInOrgUnit {
        /// Offending sub-unit.
        sub_unit: SubUnitId,
        /// Parent org unit node.
        org_unit: OrgUnitId,
    },
}

impl ScopeError {
    /// Returns true for missing-reference errors.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<ScopeError> for AppError {
    fn from(err: ScopeError) -> Self {
        if err.is_not_found() {
            Self::NotFound(err.to_string())
        } else {
            Self::Validation(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_maps_to_404() {
        let err = ScopeError::NotFound {
            kind: EntityKind::Position,
            id: "abc".to_string(),
        };
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "position not found: abc");
        assert_eq!(AppError::from(err).status_code(), 404);
    }

    #[test]
    fn test_ownership_violation_maps_to_400() {
        let err = ScopeError::SubUnitNotInOrgUnit {
            sub_unit: SubUnitId::new(),
            org_unit: OrgUnitId::new(),
        };
        assert!(!err.is_not_found());
        assert_eq!(AppError::from(err).error_code(), "VALIDATION_ERROR");
    }
}
