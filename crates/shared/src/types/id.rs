//! Typed IDs for type-safe entity references.
//!
//! Using typed IDs prevents accidentally passing a `PositionId` where a `JobFamilyId` is expected.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Macro to generate typed ID wrappers.
macro_rules! typed_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Creates a new random ID using UUID v7 (time-ordered).
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Creates an ID from an existing UUID.
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the inner UUID.
            #[must_use]
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s.trim())?))
            }
        }
    };
}

typed_id!(JobFamilyId, "Unique identifier for a job family.");
typed_id!(PositionId, "Unique identifier for a position (job role).");
typed_id!(
    OrgUnitId,
    "Unique identifier for an organizational unit (e.g. a directorate)."
);
typed_id!(
    SubUnitId,
    "Unique identifier for a sub-unit of an organizational unit."
);
typed_id!(EmployeeId, "Unique identifier for an employee.");
typed_id!(ThemeId, "Unique identifier for a training theme.");
typed_id!(VenueId, "Unique identifier for a training venue.");
typed_id!(FormationId, "Unique identifier for a formation.");
typed_id!(ProgramId, "Unique identifier for a training program.");
typed_id!(TaxId, "Unique identifier for a tax.");
typed_id!(ExpenseLineId, "Unique identifier for a theme expense line.");

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_typed_id_from_uuid() {
        let uuid = Uuid::new_v4();
        let id = EmployeeId::from_uuid(uuid);
        assert_eq!(id.into_inner(), uuid);
    }

    #[test]
    fn test_typed_id_display() {
        let uuid = Uuid::new_v4();
        let id = PositionId::from_uuid(uuid);
        assert_eq!(format!("{id}"), uuid.to_string());
    }

    #[test]
    fn test_typed_id_from_str_trims_whitespace() {
        let uuid = Uuid::new_v4();
        let id = JobFamilyId::from_str(&format!("  {uuid} ")).unwrap();
        assert_eq!(id.into_inner(), uuid);
    }

    #[test]
    fn test_typed_id_from_str_error() {
        assert!(SubUnitId::from_str("not-a-uuid").is_err());
        assert!(SubUnitId::from_str("").is_err());
    }

    #[test]
    fn test_typed_id_serde_transparent() {
        let uuid = Uuid::new_v4();
        let id = TaxId::from_uuid(uuid);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{uuid}\""));

        let back: TaxId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_typed_id_ordering_follows_uuid() {
        let low = EmployeeId::from_uuid(Uuid::from_u128(1));
        let high = EmployeeId::from_uuid(Uuid::from_u128(2));
        assert!(low < high);
    }
}
