//! Write-time validation of scope trees.

use std::str::FromStr;

use cible_shared::types::{JobFamilyId, OrgUnitId, PositionId, SubUnitId};

use super::error::ScopeError;
use super::types::{
    FamilyScope, FamilyScopeInput, PositionScope, PositionScopeInput, ScopeTree, ScopeTreeInput,
    SubUnitScope, UnitScope, UnitScopeInput,
};
use crate::graph::{EntityKind, ReferenceGraph};

/// Builds validated scope trees against a reference graph snapshot.
///
/// Every id must parse and exist, every position must belong to its parent
/// family and every sub-unit to its parent org unit. The first offending node
/// aborts the build.
pub struct ScopeTreeBuilder<'g> {
    graph: &'g ReferenceGraph,
}

impl<'g> ScopeTreeBuilder<'g> {
    /// Creates a builder validating against `graph`.
    #[must_use]
    pub const fn new(graph: &'g ReferenceGraph) -> Self {
        Self { graph }
    }

    /// Validates a client payload into a scope tree.
    ///
    /// # Errors
    ///
    /// Returns `ScopeError::InvalidId` for malformed ids, `ScopeError::NotFound`
    /// for unknown references, and the ownership variants for nodes placed
    /// under the wrong parent.
    pub fn build(&self, input: &ScopeTreeInput) -> Result<ScopeTree, ScopeError> {
        let families = input
            .families
            .iter()
            .map(|family| self.build_family(family))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ScopeTree::new(families))
    }

    /// Re-checks an already typed tree, e.g. one loaded from storage before an edit.
    ///
    /// # Errors
    ///
    /// Same as [`build`](Self::build), minus id parsing.
    pub fn validate(&self, tree: &ScopeTree) -> Result<(), ScopeError> {
        for family in &tree.families {
            self.require_family(family.job_family_id)?;
            for position in &family.positions {
                self.require_position(position.position_id, family.job_family_id)?;
                for unit in &position.units {
                    self.require_org_unit(unit.org_unit_id)?;
                    for sub_unit in &unit.sub_units {
                        self.require_sub_unit(sub_unit.sub_unit_id, unit.org_unit_id)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn build_family(&self, input: &FamilyScopeInput) -> Result<FamilyScope, ScopeError> {
        let job_family_id: JobFamilyId = parse_id("job_family", &input.job_family)?;
        self.require_family(job_family_id)?;

        let positions = input
            .positions
            .iter()
            .map(|position| self.build_position(position, job_family_id))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(FamilyScope {
            job_family_id,
            positions,
        })
    }

    fn build_position(
        &self,
        input: &PositionScopeInput,
        family: JobFamilyId,
    ) -> Result<PositionScope, ScopeError> {
        let position_id: PositionId = parse_id("position", &input.position)?;
        self.require_position(position_id, family)?;

        let units = input
            .units
            .iter()
            .map(|unit| self.build_unit(unit))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(PositionScope { position_id, units })
    }

    fn build_unit(&self, input: &UnitScopeInput) -> Result<UnitScope, ScopeError> {
        let org_unit_id: OrgUnitId = parse_id("org_unit", &input.org_unit)?;
        self.require_org_unit(org_unit_id)?;

        let mut sub_units = Vec::with_capacity(input.sub_units.len());
        for sub_unit in &input.sub_units {
            let sub_unit_id: SubUnitId = parse_id("sub_unit", &sub_unit.sub_unit)?;
            self.require_sub_unit(sub_unit_id, org_unit_id)?;
            sub_units.push(SubUnitScope { sub_unit_id });
        }

        Ok(UnitScope {
            org_unit_id,
            sub_units,
        })
    }

    fn require_family(&self, id: JobFamilyId) -> Result<(), ScopeError> {
        if self.graph.family(id).is_none() {
            return Err(not_found(EntityKind::JobFamily, id));
        }
        Ok(())
    }

    fn require_position(&self, id: PositionId, family: JobFamilyId) -> Result<(), ScopeError> {
        if self.graph.position(id).is_none() {
            return Err(not_found(EntityKind::Position, id));
        }
        if !self.graph.position_in_family(id, family) {
            return Err(ScopeError::PositionNotInFamily {
                position: id,
                family,
            });
        }
        Ok(())
    }

    fn require_org_unit(&self, id: OrgUnitId) -> Result<(), ScopeError> {
        if self.graph.org_unit(id).is_none() {
            return Err(not_found(EntityKind::OrgUnit, id));
        }
        Ok(())
    }

    fn require_sub_unit(&self, id: SubUnitId, org_unit: OrgUnitId) -> Result<(), ScopeError> {
        if self.graph.sub_unit(id).is_none() {
            return Err(not_found(EntityKind::SubUnit, id));
        }
        if !self.graph.sub_unit_in_org_unit(id, org_unit) {
            return Err(ScopeError::SubUnitNotInOrgUnit {
                sub_unit: id,
                org_unit,
            });
        }
        Ok(())
    }
}

fn parse_id<T: FromStr>(field: &'static str, value: &str) -> Result<T, ScopeError> {
    value.parse().map_err(|_| ScopeError::InvalidId {
        field,
        value: value.to_string(),
    })
}

fn not_found(kind: EntityKind, id: impl std::fmt::Display) -> ScopeError {
    ScopeError::NotFound {
        kind,
        id: id.to_string(),
    }
}
