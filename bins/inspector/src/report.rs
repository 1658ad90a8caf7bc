//! Report assembled from one fixture run.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use cible_core::budget::{
    BudgetAggregator, BudgetTotals, CategoryTotals, ExpenseCategory, ExpenseLedger, LineReport,
    VarianceReport,
};
use cible_core::scope::{
    AudienceCache, EmployeeFilter, EmployeeSummary, FamilyCount, OwnedScope, ScopeOwner,
    ScopeResolver,
};
use cible_shared::types::{
    EmployeeId, FormationId, PageRequest, PageResponse, ProgramId, ThemeId, VenueId,
};
use serde::Serialize;
use tracing::debug;

use crate::fixture::{Fixture, ThemeFixture};

/// Full inspector output.
#[derive(Debug, Serialize)]
pub struct Report {
    /// Generation time.
    pub generated_at: DateTime<Utc>,
    /// Reference graph revision.
    pub revision: u64,
    /// Employees in the snapshot.
    pub employee_count: usize,
    /// Per-theme audience and budget.
    pub themes: Vec<ThemeReport>,
    /// Per-venue participants.
    pub venues: Vec<VenueReport>,
    /// Budget totals per formation.
    pub formations: Vec<GroupReport<FormationId>>,
    /// Budget totals per program.
    pub programs: Vec<GroupReport<ProgramId>>,
    /// Themes and venues targeting each employee, for targeted employees only.
    pub trainings: Vec<EmployeeTrainings>,
}

/// One theme.
#[derive(Debug, Serialize)]
pub struct ThemeReport {
    /// Theme ID.
    pub id: ThemeId,
    /// Label.
    pub label: String,
    /// Number of targeted employees.
    pub audience: usize,
    /// Per-branch counts, not deduplicated across branches.
    pub by_family: Vec<FamilyCount>,
    /// Budget totals.
    pub budget: BudgetTotals,
    /// Planned vs actual.
    pub variance: VarianceReport,
    /// Category groups.
    pub by_category: BTreeMap<ExpenseCategory, CategoryTotals>,
    /// Line rows.
    pub lines: Vec<LineReport>,
}

/// One venue.
#[derive(Debug, Serialize)]
pub struct VenueReport {
    /// Venue ID.
    pub id: VenueId,
    /// Label.
    pub label: String,
    /// First page of expected participants.
    pub participants: PageResponse<EmployeeSummary>,
}

/// Budget of a group of themes.
#[derive(Debug, Serialize)]
pub struct GroupReport<Id> {
    /// Group ID.
    pub id: Id,
    /// Member themes.
    pub themes: Vec<ThemeId>,
    /// Totals over the member themes.
    pub totals: BudgetTotals,
}

/// Owners targeting one employee.
#[derive(Debug, Serialize)]
pub struct EmployeeTrainings {
    /// Employee ID.
    pub employee_id: EmployeeId,
    /// HR registration number.
    pub registration_number: String,
    /// Targeting themes and venues.
    pub owners: Vec<ScopeOwner>,
}

/// Everything a report is computed from.
pub struct Inspection<'a> {
    /// Loaded fixture.
    pub fixture: &'a Fixture,
    /// Resolver over the fixture graph.
    pub resolver: ScopeResolver<'a>,
    /// Validated ledger.
    pub ledger: &'a ExpenseLedger,
    /// Validated theme and venue scopes.
    pub scopes: &'a [OwnedScope],
    /// Audience cache shared across reports.
    pub cache: &'a AudienceCache,
    /// Page of participants listed per venue.
    pub page: PageRequest,
}

impl Inspection<'_> {
    /// Runs every resolver and aggregator query.
    pub fn report(&self) -> Report {
        let by_owner: HashMap<ScopeOwner, &OwnedScope> =
            self.scopes.iter().map(|scope| (scope.owner, scope)).collect();
        let aggregator = BudgetAggregator::new(self.ledger);
        let graph = self.resolver.graph();

        let themes = self
            .fixture
            .themes
            .iter()
            .filter_map(|theme| {
                let scope = by_owner.get(&ScopeOwner::Theme(theme.id))?;
                let audience = self.cache.resolve_cached(&self.resolver, scope);
                debug!(theme_id = %theme.id, cached = audience.cached, "Theme audience resolved");

                Some(ThemeReport {
                    id: theme.id,
                    label: theme.label.clone(),
                    audience: audience.employees.len(),
                    by_family: self.resolver.count_by_family(&scope.tree),
                    budget: aggregator.aggregate_by_theme(theme.id),
                    variance: aggregator.variance_report(theme.id),
                    by_category: aggregator.by_category(theme.id),
                    lines: aggregator.line_breakdown(theme.id),
                })
            })
            .collect();

        let venues = self
            .fixture
            .venues
            .iter()
            .filter_map(|venue| {
                let scope = by_owner.get(&ScopeOwner::Venue(venue.id))?;
                Some(VenueReport {
                    id: venue.id,
                    label: venue.label.clone(),
                    participants: self.resolver.resolve_filtered(
                        &scope.tree,
                        &EmployeeFilter::new(),
                        self.page,
                    ),
                })
            })
            .collect();

        let formations = self
            .group(|theme| theme.formation_id)
            .into_iter()
            .map(|(id, themes)| GroupReport {
                id,
                totals: aggregator.aggregate_by_formation(id, &themes),
                themes,
            })
            .collect();

        let programs = self
            .group(|theme| theme.program_id)
            .into_iter()
            .map(|(id, themes)| GroupReport {
                id,
                totals: aggregator.aggregate_by_program(id, &themes),
                themes,
            })
            .collect();

        let trainings = graph
            .employees()
            .filter_map(|employee| {
                let owners = self.resolver.owners_targeting(employee.id, self.scopes);
                (!owners.is_empty()).then(|| EmployeeTrainings {
                    employee_id: employee.id,
                    registration_number: employee.registration_number.clone(),
                    owners,
                })
            })
            .collect();

        Report {
            generated_at: Utc::now(),
            revision: graph.revision(),
            employee_count: graph.employee_count(),
            themes,
            venues,
            formations,
            programs,
            trainings,
        }
    }

    fn group<Id, F>(&self, key: F) -> BTreeMap<Id, Vec<ThemeId>>
    where
        Id: Ord,
        F: Fn(&ThemeFixture) -> Option<Id>,
    {
        let mut groups: BTreeMap<Id, Vec<ThemeId>> = BTreeMap::new();
        for theme in &self.fixture.themes {
            if let Some(id) = key(theme) {
                groups.entry(id).or_default().push(theme.id);
            }
        }
        groups
    }
}
