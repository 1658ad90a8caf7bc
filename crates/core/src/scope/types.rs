//! Scope tree data types.

use std::hash::{DefaultHasher, Hash, Hasher};

use cible_shared::types::{
    EmployeeId, JobFamilyId, OrgUnitId, PositionId, SubUnitId, ThemeId, VenueId,
};
use serde::{Deserialize, Serialize};

use crate::graph::Employee;

/// Restriction structure expressing which employees a training targets.
///
/// An empty child list at any level means "all of this subtree". A tree with
/// no family entries matches no one. Trees built through
/// [`ScopeTreeBuilder`](super::ScopeTreeBuilder) satisfy the ownership
/// invariants; the resolver skips non-conforming nodes of any other tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScopeTree {
    /// Family branches; the result is their union.
    #[serde(default)]
    pub families: Vec<FamilyScope>,
}

impl ScopeTree {
    /// Creates a tree from its family branches.
    #[must_use]
    pub const fn new(families: Vec<FamilyScope>) -> Self {
        Self { families }
    }

    /// Returns true if the tree has no branch (and therefore matches no one).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.families.is_empty()
    }

    /// Number of family branches.
    #[must_use]
    pub fn branch_count(&self) -> usize {
        self.families.len()
    }

    /// Stable hash of the tree content, used as a cache key component.
    #[must_use]
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }
}

/// A job family branch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FamilyScope {
    /// Job family at the root of the branch.
    pub job_family_id: JobFamilyId,
    /// Position restrictions; empty means the whole family.
    #[serde(default)]
    pub positions: Vec<PositionScope>,
}

impl FamilyScope {
    /// Whole-family branch.
    #[must_use]
    pub const fn whole(job_family_id: JobFamilyId) -> Self {
        Self {
            job_family_id,
            positions: Vec::new(),
        }
    }
}

/// A position restriction within a family branch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PositionScope {
    /// Targeted position.
    pub position_id: PositionId,
    /// Org unit restrictions; empty means the whole position.
    #[serde(default)]
    pub units: Vec<UnitScope>,
}

impl PositionScope {
    /// Whole-position restriction.
    #[must_use]
    pub const fn whole(position_id: PositionId) -> Self {
        Self {
            position_id,
            units: Vec::new(),
        }
    }
}

/// An org unit restriction within a position.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnitScope {
    /// Targeted org unit.
    pub org_unit_id: OrgUnitId,
    /// Sub-unit restrictions; empty means the whole unit.
    #[serde(default)]
    pub sub_units: Vec<SubUnitScope>,
}

impl UnitScope {
    /// Whole-unit restriction.
    #[must_use]
    pub const fn whole(org_unit_id: OrgUnitId) -> Self {
        Self {
            org_unit_id,
            sub_units: Vec::new(),
        }
    }
}

/// A sub-unit restriction within an org unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubUnitScope {
    /// Targeted sub-unit.
    pub sub_unit_id: SubUnitId,
}

/// Entity a scope tree is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum ScopeOwner {
    /// Public targeted by a training theme.
    Theme(ThemeId),
    /// Participants expected at a training venue.
    Venue(VenueId),
}

impl std::fmt::Display for ScopeOwner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Theme(id) => write!(f, "theme:{id}"),
            Self::Venue(id) => write!(f, "venue:{id}"),
        }
    }
}

/// A scope tree together with its owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnedScope {
    /// Owning theme or venue.
    pub owner: ScopeOwner,
    /// The owner's scope tree.
    pub tree: ScopeTree,
}

impl OwnedScope {
    /// Attaches a tree to an owner.
    #[must_use]
    pub const fn new(owner: ScopeOwner, tree: ScopeTree) -> Self {
        Self { owner, tree }
    }

    /// Replaces the whole tree on edit, returning the previous one.
    pub fn replace_tree(&mut self, tree: ScopeTree) -> ScopeTree {
        std::mem::replace(&mut self.tree, tree)
    }
}

/// Per-branch match count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilyCount {
    /// Branch job family.
    pub job_family_id: JobFamilyId,
    /// Number of employees matched by the branch alone.
    pub count: usize,
}

/// Narrowing criteria applied on top of a resolved audience.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmployeeFilter {
    /// Keep only this org unit.
    #[serde(default)]
    pub org_unit_id: Option<OrgUnitId>,
    /// Keep only this sub-unit.
    #[serde(default)]
    pub sub_unit_id: Option<SubUnitId>,
    /// Keep only this position.
    #[serde(default)]
    pub position_id: Option<PositionId>,
    /// Case-insensitive search over names and registration number.
    #[serde(default)]
    pub search: Option<String>,
}

impl EmployeeFilter {
    /// Creates a new empty filter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts to an org unit.
    #[must_use]
    pub const fn with_org_unit(mut self, org_unit_id: OrgUnitId) -> Self {
        self.org_unit_id = Some(org_unit_id);
        self
    }

    /// Restricts to a sub-unit.
    #[must_use]
    pub const fn with_sub_unit(mut self, sub_unit_id: SubUnitId) -> Self {
        self.sub_unit_id = Some(sub_unit_id);
        self
    }

    /// Restricts to a position.
    #[must_use]
    pub const fn with_position(mut self, position_id: PositionId) -> Self {
        self.position_id = Some(position_id);
        self
    }

    /// Adds a free-text search.
    #[must_use]
    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    /// Returns true if the filter keeps everything.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.org_unit_id.is_none()
            && self.sub_unit_id.is_none()
            && self.position_id.is_none()
            && self.search.as_deref().is_none_or(|s| s.trim().is_empty())
    }

    /// Whether an employee passes every criterion.
    #[must_use]
    pub fn matches(&self, employee: &Employee) -> bool {
        if self.org_unit_id.is_some_and(|id| id != employee.org_unit_id) {
            return false;
        }
        if self.sub_unit_id.is_some_and(|id| id != employee.sub_unit_id) {
            return false;
        }
        if self.position_id.is_some_and(|id| id != employee.position_id) {
            return false;
        }
        match self.search.as_deref().map(str::trim) {
            Some(needle) if !needle.is_empty() => {
                let needle = needle.to_lowercase();
                [
                    &employee.first_name,
                    &employee.last_name,
                    &employee.registration_number,
                ]
                .iter()
                .any(|field| field.to_lowercase().contains(&needle))
            }
            _ => true,
        }
    }
}

/// Employee row returned by filtered audience listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeSummary {
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
    pub is_active: bool,
}

impl From<&Employee> for EmployeeSummary {
    fn from(employee: &Employee) -> Self {
        Self {
            id: employee.id,
            registration_number: employee.registration_number.clone(),
            first_name: employee.first_name.clone(),
            last_name: employee.last_name.clone(),
            position_id: employee.position_id,
            org_unit_id: employee.org_unit_id,
            sub_unit_id: employee.sub_unit_id,
            is_active: employee.is_active,
        }
    }
}

/// Scope tree payload as sent by clients, with ids still in string form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScopeTreeInput {
    /// Family branches.
    #[serde(default)]
    pub families: Vec<FamilyScopeInput>,
}

/// Family branch payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FamilyScopeInput {
    /// Job family ID.
    pub job_family: String,
    /// Position restrictions.
    #[serde(default)]
    pub positions: Vec<PositionScopeInput>,
}

/// Position restriction payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PositionScopeInput {
    /// Position ID.
    pub position: String,
    /// Org unit restrictions.
    #[serde(default)]
    pub units: Vec<UnitScopeInput>,
}

/// Org unit restriction payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UnitScopeInput {
    /// Org unit ID.
    pub org_unit: String,
    /// Sub-unit restrictions.
    #[serde(default)]
    pub sub_units: Vec<SubUnitScopeInput>,
}

/// Sub-unit restriction payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubUnitScopeInput {
    /// Sub-unit ID.
    pub sub_unit: String,
}
