//! Job-scoped deduplication arena for bulk employee imports.
//!
//! An [`ImportSession`] is created for one import job and passed explicitly
//! through it. Reference entities are interned by normalized business code so
//! that a family, position or unit repeated across rows is created once.

use std::collections::{HashMap, HashSet};

use cible_shared::types::{EmployeeId, JobFamilyId, OrgUnitId, PositionId, SubUnitId};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::error::GraphError;
use super::reference::ReferenceGraph;
use super::types::{Employee, GraphSnapshot, JobFamily, OrgUnit, Position, SubUnit};

/// One flat spreadsheet row of an employee import.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportRow {
    /// HR registration number.
    pub registration_number: String,
    /// First name.
    pub first_name: String,
    /// Last name.
    pub last_name: String,
    /// Job family code.
    pub family_code: String,
    /// Job family label.
    pub family_label: String,
    /// Position code.
    pub position_code: String,
    /// Position label.
    pub position_label: String,
    /// Organizational unit code.
    pub org_unit_code: String,
    /// Organizational unit label.
    pub org_unit_label: String,
    /// Sub-unit code.
    pub sub_unit_code: String,
    /// Sub-unit label.
    pub sub_unit_label: String,
    /// Whether the employee is active.
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

/// Counters reported at the end of an import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportStats {
    /// Rows accepted.
    pub rows: usize,
    /// Job families created.
    pub families: usize,
    /// Positions created.
    pub positions: usize,
    /// Organizational units created.
    pub org_units: usize,
    /// Sub-units created.
    pub sub_units: usize,
}

/// Interning table preserving first-seen order.
#[derive(Debug)]
struct Interned<T> {
    by_code: HashMap<String, usize>,
    items: Vec<T>,
}

impl<T> Default for Interned<T> {
    fn default() -> Self {
        Self {
            by_code: HashMap::new(),
            items: Vec::new(),
        }
    }
}

impl<T> Interned<T> {
    fn get_mut(&mut self, code: &str) -> Option<&mut T> {
        self.by_code.get(code).map(|&idx| &mut self.items[idx])
    }

    fn get(&self, code: &str) -> Option<&T> {
        self.by_code.get(code).map(|&idx| &self.items[idx])
    }

    fn insert(&mut self, code: String, item: T) -> &mut T {
        let idx = self.items.len();
        self.items.push(item);
        self.by_code.insert(code, idx);
        &mut self.items[idx]
    }
}

/// Deduplication arena for one import job.
#[derive(Debug, Default)]
pub struct ImportSession {
    families: Interned<JobFamily>,
    positions: Interned<Position>,
    org_units: Interned<OrgUnit>,
    sub_units: Interned<SubUnit>,
    employees: Vec<Employee>,
    registrations: HashSet<String>,
    rows: usize,
    attempted: usize,
}

impl ImportSession {
    /// Starts an empty session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Imports one row, reusing already interned reference entities.
    ///
    /// A rejected row leaves the imported data unchanged but still takes up a
    /// row number, so callers may skip it and keep going.
    ///
    /// # Errors
    ///
    /// Returns a `GraphError` carrying the 1-based row number when a required
    /// field is blank, the registration number repeats, or the sub-unit code is
    /// already attached to another org unit.
    pub fn import_row(&mut self, row: &ImportRow) -> Result<EmployeeId, GraphError> {
        self.attempted += 1;
        let row_no = self.attempted;

        let registration = required(row_no, "registration_number", &row.registration_number)?;
        let family_code = required(row_no, "family_code", &row.family_code)?;
        let position_code = required(row_no, "position_code", &row.position_code)?;
        let org_unit_code = required(row_no, "org_unit_code", &row.org_unit_code)?;
        let sub_unit_code = required(row_no, "sub_unit_code", &row.sub_unit_code)?;

        if self.registrations.contains(&registration) {
            return Err(GraphError::DuplicateRegistration {
                row: row_no,
                registration_number: registration,
            });
        }

        // Checked before anything is interned so a rejected row leaves no trace.
        if let Some(existing) = self.sub_units.get(&sub_unit_code) {
            let owner_code = self.org_unit_code_of(existing.org_unit_id);
            if owner_code.as_deref() != Some(org_unit_code.as_str()) {
                return Err(GraphError::SubUnitOwnershipConflict {
                    row: row_no,
                    sub_unit: sub_unit_code,
                    existing: owner_code.unwrap_or_default(),
                    requested: org_unit_code,
                });
            }
        }

        let family_id = self.intern_family(family_code, &row.family_label);
        let position_id = self.intern_position(position_code, &row.position_label, family_id);
        let org_unit_id = self.intern_org_unit(org_unit_code, &row.org_unit_label);
        let sub_unit_id = self.intern_sub_unit(sub_unit_code, &row.sub_unit_label, org_unit_id);

        let employee = Employee {
            id: EmployeeId::new(),
            registration_number: registration.clone(),
            first_name: row.first_name.trim().to_string(),
            last_name: row.last_name.trim().to_string(),
            position_id,
            org_unit_id,
            sub_unit_id,
            is_active: row.is_active,
        };
        let id = employee.id;

        self.registrations.insert(registration);
        self.employees.push(employee);
        self.rows += 1;
        Ok(id)
    }

    /// Imports every row, stopping at the first rejected one.
    ///
    /// # Errors
    ///
    /// Returns the first row-level `GraphError`.
    pub fn import_rows<'a, I>(&mut self, rows: I) -> Result<Vec<EmployeeId>, GraphError>
    where
        I: IntoIterator<Item = &'a ImportRow>,
    {
        rows.into_iter().map(|row| self.import_row(row)).collect()
    }

    /// Counters for the rows accepted so far.
    #[must_use]
    pub fn stats(&self) -> ImportStats {
        ImportStats {
            rows: self.rows,
            families: self.families.items.len(),
            positions: self.positions.items.len(),
            org_units: self.org_units.items.len(),
            sub_units: self.sub_units.items.len(),
        }
    }

    /// Looks up the id interned for a job family code.
    #[must_use]
    pub fn family_id(&self, code: &str) -> Option<JobFamilyId> {
        self.families.get(&normalize_code(code)).map(|f| f.id)
    }

    /// Looks up the id interned for a position code.
    #[must_use]
    pub fn position_id(&self, code: &str) -> Option<PositionId> {
        self.positions.get(&normalize_code(code)).map(|p| p.id)
    }

    /// Looks up the id interned for an org unit code.
    #[must_use]
    pub fn org_unit_id(&self, code: &str) -> Option<OrgUnitId> {
        self.org_units.get(&normalize_code(code)).map(|o| o.id)
    }

    /// Looks up the id interned for a sub-unit code.
    #[must_use]
    pub fn sub_unit_id(&self, code: &str) -> Option<SubUnitId> {
        self.sub_units.get(&normalize_code(code)).map(|s| s.id)
    }

    /// Consumes the session into a reference graph snapshot.
    ///
    /// # Errors
    ///
    /// Propagates `GraphError` from graph construction.
    pub fn finish(self, revision: u64) -> Result<ReferenceGraph, GraphError> {
        let stats = self.stats();
        info!(
            rows = stats.rows,
            families = stats.families,
            positions = stats.positions,
            org_units = stats.org_units,
            sub_units = stats.sub_units,
            revision,
            "Import session finished"
        );

        ReferenceGraph::from_snapshot(GraphSnapshot {
            revision,
            job_families: self.families.items,
            positions: self.positions.items,
            org_units: self.org_units.items,
            sub_units: self.sub_units.items,
            employees: self.employees,
        })
    }

    fn org_unit_code_of(&self, id: OrgUnitId) -> Option<String> {
        self.org_units
            .items
            .iter()
            .find(|unit| unit.id == id)
            .map(|unit| unit.code.clone())
    }

    fn intern_family(&mut self, code: String, label: &str) -> JobFamilyId {
        if let Some(family) = self.families.get_mut(&code) {
            return family.id;
        }
        let family = JobFamily {
            id: JobFamilyId::new(),
            code: code.clone(),
            label: label_or_code(label, &code),
        };
        self.families.insert(code, family).id
    }

    fn intern_position(&mut self, code: String, label: &str, family_id: JobFamilyId) -> PositionId {
        if let Some(position) = self.positions.get_mut(&code) {
            if !position.family_ids.contains(&family_id) {
                position.family_ids.push(family_id);
            }
            return position.id;
        }
        let position = Position {
            id: PositionId::new(),
            code: code.clone(),
            label: label_or_code(label, &code),
            family_ids: vec![family_id],
        };
        self.positions.insert(code, position).id
    }

    fn intern_org_unit(&mut self, code: String, label: &str) -> OrgUnitId {
        if let Some(unit) = self.org_units.get_mut(&code) {
            return unit.id;
        }
        let unit = OrgUnit {
            id: OrgUnitId::new(),
            code: code.clone(),
            label: label_or_code(label, &code),
        };
        self.org_units.insert(code, unit).id
    }

    fn intern_sub_unit(&mut self, code: String, label: &str, org_unit_id: OrgUnitId) -> SubUnitId {
        if let Some(sub_unit) = self.sub_units.get_mut(&code) {
            return sub_unit.id;
        }
        let sub_unit = SubUnit {
            id: SubUnitId::new(),
            code: code.clone(),
            label: label_or_code(label, &code),
            org_unit_id,
        };
        self.sub_units.insert(code, sub_unit).id
    }
}

/// Normalizes a business code: trimmed, inner whitespace collapsed, uppercase.
#[must_use]
pub fn normalize_code(code: &str) -> String {
    code.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}

fn required(row: usize, field: &'static str, value: &str) -> Result<String, GraphError> {
    let normalized = normalize_code(value);
    if normalized.is_empty() {
        return Err(GraphError::BlankField { row, field });
    }
    Ok(normalized)
}

fn label_or_code(label: &str, code: &str) -> String {
    let label = label.trim();
    if label.is_empty() {
        code.to_string()
    } else {
        label.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(registration: &str, family: &str, position: &str, unit: &str, sub_unit: &str) -> ImportRow {
        ImportRow {
            registration_number: registration.to_string(),
            first_name: "Awa".to_string(),
            last_name: "Diallo".to_string(),
            family_code: family.to_string(),
            family_label: String::new(),
            position_code: position.to_string(),
            position_label: String::new(),
            org_unit_code: unit.to_string(),
            org_unit_label: String::new(),
            sub_unit_code: sub_unit.to_string(),
            sub_unit_label: String::new(),
            is_active: true,
        }
    }

    #[test]
    fn test_normalize_code() {
        assert_eq!(normalize_code("  fin  ops "), "FIN OPS");
        assert_eq!(normalize_code("\t"), "");
    }

    #[test]
    fn test_repeated_codes_are_interned_once() {
        let mut session = ImportSession::new();
        session
            .import_row(&row("M1", "fin", "acc", "dg", "dg-1"))
            .unwrap();
        session
            .import_row(&row("M2", " FIN", "ACC ", "DG", "dg-1"))
            .unwrap();

        let stats = session.stats();
        assert_eq!(stats.rows, 2);
        assert_eq!(stats.families, 1);
        assert_eq!(stats.positions, 1);
        assert_eq!(stats.org_units, 1);
        assert_eq!(stats.sub_units, 1);
    }

    #[test]
    fn test_position_links_every_family_it_appears_under() {
        let mut session = ImportSession::new();
        session
            .import_row(&row("M1", "FIN", "CTRL", "DG", "DG-1"))
            .unwrap();
        session
            .import_row(&row("M2", "AUD", "CTRL", "DG", "DG-1"))
            .unwrap();

        let fin = session.family_id("fin").unwrap();
        let aud = session.family_id("aud").unwrap();
        let ctrl = session.position_id("ctrl").unwrap();

        let graph = session.finish(1).unwrap();
        assert!(graph.position_in_family(ctrl, fin));
        assert!(graph.position_in_family(ctrl, aud));
        assert_eq!(graph.employee_count(), 2);
    }

    #[test]
    fn test_blank_field_reports_row_number() {
        let mut session = ImportSession::new();
        session
            .import_row(&row("M1", "FIN", "ACC", "DG", "DG-1"))
            .unwrap();

        let err = session
            .import_row(&row("M2", "FIN", "  ", "DG", "DG-1"))
            .unwrap_err();
        assert!(matches!(
            err,
            GraphError::BlankField {
                row: 2,
                field: "position_code"
            }
        ));
        assert_eq!(session.stats().rows, 1);
    }

    #[test]
    fn test_rows_after_a_rejected_row_keep_their_number() {
        let mut session = ImportSession::new();
        session
            .import_row(&row("M1", "FIN", "ACC", "DG", "DG-1"))
            .unwrap();
        assert!(session.import_row(&row("", "FIN", "ACC", "DG", "DG-1")).is_err());
        session
            .import_row(&row("M3", "FIN", "ACC", "DG", "DG-1"))
            .unwrap();

        let err = session
            .import_row(&row("M4", "", "ACC", "DG", "DG-1"))
            .unwrap_err();
        assert_eq!(err.row(), Some(4));
        assert_eq!(session.stats().rows, 2);
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut session = ImportSession::new();
        session
            .import_row(&row("M1", "FIN", "ACC", "DG", "DG-1"))
            .unwrap();

        let err = session
            .import_row(&row(" m1 ", "FIN", "ACC", "DG", "DG-1"))
            .unwrap_err();
        assert!(matches!(err, GraphError::DuplicateRegistration { row: 2, .. }));
    }

    #[test]
    fn test_sub_unit_cannot_move_between_org_units() {
        let mut session = ImportSession::new();
        session
            .import_row(&row("M1", "FIN", "ACC", "DG", "S-1"))
            .unwrap();

        let err = session
            .import_row(&row("M2", "FIN", "ACC", "DRH", "S-1"))
            .unwrap_err();
        match err {
            GraphError::SubUnitOwnershipConflict {
                row,
                sub_unit,
                existing,
                requested,
            } => {
                assert_eq!(row, 2);
                assert_eq!(sub_unit, "S-1");
                assert_eq!(existing, "DG");
                assert_eq!(requested, "DRH");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        // The rejected row did not intern DRH.
        assert!(session.org_unit_id("DRH").is_none());
    }

    #[test]
    fn test_sessions_do_not_share_state() {
        let mut first = ImportSession::new();
        first
            .import_row(&row("M1", "FIN", "ACC", "DG", "DG-1"))
            .unwrap();

        let second = ImportSession::new();
        assert!(second.family_id("FIN").is_none());
        assert_eq!(second.stats(), ImportStats::default());
    }
}
