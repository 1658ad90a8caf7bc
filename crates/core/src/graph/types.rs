//! Reference graph record types.

use cible_shared::types::{EmployeeId, JobFamilyId, OrgUnitId, PositionId, SubUnitId};
use serde::{Deserialize, Serialize};

/// Kind of reference entity, used to label errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// Job family.
    JobFamily,
    /// Position.
    Position,
    /// Organizational unit.
    OrgUnit,
    /// Sub-unit.
    SubUnit,
    /// Employee.
    Employee,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::JobFamily => write!(f, "job family"),
            Self::Position => write!(f, "position"),
            Self::OrgUnit => write!(f, "organizational unit"),
            Self::SubUnit => write!(f, "sub-unit"),
            Self::Employee => write!(f, "employee"),
        }
    }
}

/// Top-level occupational grouping (e.g. "Finance").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobFamily {
    /// Job family ID.
    pub id: JobFamilyId,
    /// Business code.
    pub code: String,
    /// Display label.
    pub label: String,
}

/// A job role, attached to one or more job families.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    /// Position ID.
    pub id: PositionId,
    /// Business code.
    pub code: String,
    /// Display label.
    pub label: String,
    /// Job families this position belongs to.
    #[serde(default)]
    pub family_ids: Vec<JobFamilyId>,
}

/// First level of the organizational hierarchy (e.g. a directorate).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrgUnit {
    /// Organizational unit ID.
    pub id: OrgUnitId,
    /// Business code.
    pub code: String,
    /// Display label.
    pub label: String,
}

/// Second level of the organizational hierarchy (e.g. a department).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubUnit {
    /// Sub-unit ID.
    pub id: SubUnitId,
    /// Business code.
    pub code: String,
    /// Display label.
    pub label: String,
    /// Owning organizational unit.
    pub org_unit_id: OrgUnitId,
}

/// An employee record as seen by the engines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    /// Employee ID.
    pub id: EmployeeId,
    /// HR registration number.
    pub registration_number: String,
    /// First name.
    pub first_name: String,
    /// Last name.
    pub last_name: String,
    /// Held position.
    pub position_id: PositionId,
    /// Organizational unit.
    pub org_unit_id: OrgUnitId,
    /// Sub-unit.
    pub sub_unit_id: SubUnitId,
    /// Whether the employee is active.
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

/// Plain record vectors a reference graph is built from.
///
/// This is the shape fetched from storage (or read from a fixture) once per request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphSnapshot {
    /// Caller-supplied snapshot revision.
    #[serde(default)]
    pub revision: u64,
    /// Job families.
    #[serde(default)]
    pub job_families: Vec<JobFamily>,
    /// Positions.
    #[serde(default)]
    pub positions: Vec<Position>,
    /// Organizational units.
    #[serde(default)]
    pub org_units: Vec<OrgUnit>,
    /// Sub-units.
    #[serde(default)]
    pub sub_units: Vec<SubUnit>,
    /// Employees.
    #[serde(default)]
    pub employees: Vec<Employee>,
}
