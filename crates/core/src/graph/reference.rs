//! In-memory arena of reference entities indexed by id.
//!
//! The graph is loaded once per request from a [`GraphSnapshot`] and is
//! immutable afterwards, so any number of resolutions may read it concurrently.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use cible_shared::types::{EmployeeId, JobFamilyId, OrgUnitId, PositionId, SubUnitId};

use super::error::GraphError;
use super::types::{EntityKind, Employee, GraphSnapshot, JobFamily, OrgUnit, Position, SubUnit};

/// Snapshot of the reference graph with precomputed adjacency.
#[derive(Debug, Clone, Default)]
pub struct ReferenceGraph {
    revision: u64,
    families: HashMap<JobFamilyId, JobFamily>,
    positions: HashMap<PositionId, Position>,
    org_units: HashMap<OrgUnitId, OrgUnit>,
    sub_units: HashMap<SubUnitId, SubUnit>,
    employees: HashMap<EmployeeId, Employee>,
    /// Snapshot order of employees, kept for deterministic iteration.
    employee_order: Vec<EmployeeId>,
    positions_by_family: HashMap<JobFamilyId, HashSet<PositionId>>,
    employees_by_position: HashMap<PositionId, Vec<EmployeeId>>,
}

impl ReferenceGraph {
    /// Builds a graph from plain records.
    ///
    /// Dangling references between records are accepted; the resolver treats
    /// them as non-matches.
    ///
    /// # Errors
    ///
    /// Returns `GraphError::DuplicateId` if two records of one kind share an ID.
    pub fn from_snapshot(snapshot: GraphSnapshot) -> Result<Self, GraphError> {
        let GraphSnapshot {
            revision,
            job_families,
            positions,
            org_units,
            sub_units,
            employees,
        } = snapshot;

        let families = index_unique(job_families, EntityKind::JobFamily, |f| f.id)?;
        let positions = index_unique(positions, EntityKind::Position, |p| p.id)?;
        let org_units = index_unique(org_units, EntityKind::OrgUnit, |o| o.id)?;
        let sub_units = index_unique(sub_units, EntityKind::SubUnit, |s| s.id)?;

        let employee_order: Vec<EmployeeId> = employees.iter().map(|e| e.id).collect();
        let mut employees_by_position: HashMap<PositionId, Vec<EmployeeId>> = HashMap::new();
        for employee in &employees {
            employees_by_position
                .entry(employee.position_id)
                .or_default()
                .push(employee.id);
        }
        let employees = index_unique(employees, EntityKind::Employee, |e| e.id)?;

        let mut positions_by_family: HashMap<JobFamilyId, HashSet<PositionId>> = families
            .keys()
            .map(|id| (*id, HashSet::new()))
            .collect();
        for position in positions.values() {
            for family_id in &position.family_ids {
                if let Some(members) = positions_by_family.get_mut(family_id) {
                    members.insert(position.id);
                }
            }
        }

        Ok(Self {
            revision,
            families,
            positions,
            org_units,
            sub_units,
            employees,
            employee_order,
            positions_by_family,
            employees_by_position,
        })
    }

    /// Snapshot revision supplied by the caller.
    #[must_use]
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    /// Looks up a job family.
    #[must_use]
    pub fn family(&self, id: JobFamilyId) -> Option<&JobFamily> {
        self.families.get(&id)
    }

    /// Looks up a position.
    #[must_use]
    pub fn position(&self, id: PositionId) -> Option<&Position> {
        self.positions.get(&id)
    }

    /// Looks up an organizational unit.
    #[must_use]
    pub fn org_unit(&self, id: OrgUnitId) -> Option<&OrgUnit> {
        self.org_units.get(&id)
    }

    /// Looks up a sub-unit.
    #[must_use]
    pub fn sub_unit(&self, id: SubUnitId) -> Option<&SubUnit> {
        self.sub_units.get(&id)
    }

    /// Looks up an employee.
    #[must_use]
    pub fn employee(&self, id: EmployeeId) -> Option<&Employee> {
        self.employees.get(&id)
    }

    /// Iterates employees in snapshot order.
    pub fn employees(&self) -> impl Iterator<Item = &Employee> + '_ {
        self.employee_order
            .iter()
            .filter_map(|id| self.employees.get(id))
    }

    /// Number of employees in the snapshot.
    #[must_use]
    pub fn employee_count(&self) -> usize {
        self.employees.len()
    }

    /// Positions attached to a family. Empty for an unknown family.
    pub fn positions_of_family(&self, family: JobFamilyId) -> impl Iterator<Item = PositionId> + '_ {
        self.positions_by_family
            .get(&family)
            .into_iter()
            .flat_map(|members| members.iter().copied())
    }

    /// Employees holding a position, in snapshot order.
    #[must_use]
    pub fn employees_with_position(&self, position: PositionId) -> &[EmployeeId] {
        self.employees_by_position
            .get(&position)
            .map_or(&[][..], Vec::as_slice)
    }

    /// Whether `position` exists and is attached to the existing `family`.
    #[must_use]
    pub fn position_in_family(&self, position: PositionId, family: JobFamilyId) -> bool {
        self.positions_by_family
            .get(&family)
            .is_some_and(|members| members.contains(&position))
    }

    /// Whether `sub_unit` exists and belongs to the existing `org_unit`.
    #[must_use]
    pub fn sub_unit_in_org_unit(&self, sub_unit: SubUnitId, org_unit: OrgUnitId) -> bool {
        self.org_units.contains_key(&org_unit)
            && self
                .sub_units
                .get(&sub_unit)
                .is_some_and(|s| s.org_unit_id == org_unit)
    }

    /// Whether every reference carried by the employee resolves consistently.
    ///
    /// Only resolvable employees can be matched by a scope.
    #[must_use]
    pub fn is_resolvable(&self, employee: &Employee) -> bool {
        self.positions.contains_key(&employee.position_id)
            && self.sub_unit_in_org_unit(employee.sub_unit_id, employee.org_unit_id)
    }
}

impl TryFrom<GraphSnapshot> for ReferenceGraph {
    type Error = GraphError;

    fn try_from(snapshot: GraphSnapshot) -> Result<Self, Self::Error> {
        Self::from_snapshot(snapshot)
    }
}

fn index_unique<K, V, F>(
    records: Vec<V>,
    kind: EntityKind,
    key: F,
) -> Result<HashMap<K, V>, GraphError>
where
    K: Eq + Hash + Copy + std::fmt::Display,
    F: Fn(&V) -> K,
{
    let mut index = HashMap::with_capacity(records.len());
    for record in records {
        let id = key(&record);
        if index.insert(id, record).is_some() {
            return Err(GraphError::DuplicateId {
                kind,
                id: id.to_string(),
            });
        }
    }
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn family(code: &str) -> JobFamily {
        JobFamily {
            id: JobFamilyId::new(),
            code: code.to_string(),
            label: code.to_string(),
        }
    }

    fn position(code: &str, families: &[JobFamilyId]) -> Position {
        Position {
            id: PositionId::new(),
            code: code.to_string(),
            label: code.to_string(),
            family_ids: families.to_vec(),
        }
    }

    fn org_unit(code: &str) -> OrgUnit {
        OrgUnit {
            id: OrgUnitId::new(),
            code: code.to_string(),
            label: code.to_string(),
        }
    }

    fn sub_unit(code: &str, org_unit_id: OrgUnitId) -> SubUnit {
        SubUnit {
            id: SubUnitId::new(),
            code: code.to_string(),
            label: code.to_string(),
            org_unit_id,
        }
    }

    fn employee(position_id: PositionId, org_unit_id: OrgUnitId, sub_unit_id: SubUnitId) -> Employee {
        Employee {
            id: EmployeeId::new(),
            registration_number: "M-001".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            position_id,
            org_unit_id,
            sub_unit_id,
            is_active: true,
        }
    }

    #[test]
    fn test_position_family_adjacency() {
        let finance = family("FIN");
        let audit = family("AUD");
        let shared = position("CTRL", &[finance.id, audit.id]);
        let only_finance = position("ACC", &[finance.id]);

        let graph = ReferenceGraph::from_snapshot(GraphSnapshot {
            job_families: vec![finance.clone(), audit.clone()],
            positions: vec![shared.clone(), only_finance.clone()],
            ..GraphSnapshot::default()
        })
        .unwrap();

        let mut finance_positions: Vec<_> = graph.positions_of_family(finance.id).collect();
        finance_positions.sort();
        let mut expected = vec![shared.id, only_finance.id];
        expected.sort();
        assert_eq!(finance_positions, expected);

        assert!(graph.position_in_family(shared.id, audit.id));
        assert!(!graph.position_in_family(only_finance.id, audit.id));
        assert_eq!(graph.positions_of_family(JobFamilyId::new()).count(), 0);
    }

    #[test]
    fn test_dangling_family_reference_is_ignored() {
        let ghost = JobFamilyId::new();
        let orphan = position("ORPH", &[ghost]);

        let graph = ReferenceGraph::from_snapshot(GraphSnapshot {
            positions: vec![orphan.clone()],
            ..GraphSnapshot::default()
        })
        .unwrap();

        assert!(!graph.position_in_family(orphan.id, ghost));
        assert!(graph.position(orphan.id).is_some());
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let unit = org_unit("DG");
        let result = ReferenceGraph::from_snapshot(GraphSnapshot {
            org_units: vec![unit.clone(), unit],
            ..GraphSnapshot::default()
        });

        assert!(matches!(
            result,
            Err(GraphError::DuplicateId {
                kind: EntityKind::OrgUnit,
                ..
            })
        ));
    }

    #[test]
    fn test_resolvable_employee_requires_consistent_references() {
        let fam = family("FIN");
        let pos = position("ACC", &[fam.id]);
        let unit_a = org_unit("A");
        let unit_b = org_unit("B");
        let sub_a = sub_unit("A1", unit_a.id);

        let consistent = employee(pos.id, unit_a.id, sub_a.id);
        let wrong_unit = employee(pos.id, unit_b.id, sub_a.id);
        let missing_position = employee(PositionId::new(), unit_a.id, sub_a.id);
        let missing_sub_unit = employee(pos.id, unit_a.id, SubUnitId::new());

        let graph = ReferenceGraph::from_snapshot(GraphSnapshot {
            revision: 7,
            job_families: vec![fam],
            positions: vec![pos.clone()],
            org_units: vec![unit_a, unit_b],
            sub_units: vec![sub_a],
            employees: vec![
                consistent.clone(),
                wrong_unit.clone(),
                missing_position.clone(),
                missing_sub_unit.clone(),
            ],
        })
        .unwrap();

        assert_eq!(graph.revision(), 7);
        assert!(graph.is_resolvable(&consistent));
        assert!(!graph.is_resolvable(&wrong_unit));
        assert!(!graph.is_resolvable(&missing_position));
        assert!(!graph.is_resolvable(&missing_sub_unit));
        assert_eq!(
            graph.employees_with_position(pos.id),
            &[consistent.id, wrong_unit.id, missing_sub_unit.id]
        );
    }

    #[test]
    fn test_employees_iterate_in_snapshot_order() {
        let unit = org_unit("A");
        let sub = sub_unit("A1", unit.id);
        let pos = position("P", &[]);
        let first = employee(pos.id, unit.id, sub.id);
        let second = employee(pos.id, unit.id, sub.id);

        let graph = ReferenceGraph::from_snapshot(GraphSnapshot {
            employees: vec![second.clone(), first.clone()],
            ..GraphSnapshot::default()
        })
        .unwrap();

        let order: Vec<_> = graph.employees().map(|e| e.id).collect();
        assert_eq!(order, vec![second.id, first.id]);
        assert_eq!(graph.employee_count(), 2);
    }
}
