//! JSON fixture consumed by the inspector.

use std::path::Path;

use anyhow::{Context, bail};
use cible_core::budget::{CreateExpenseLineInput, ExpenseCategory, ExpenseLedger, Tax};
use cible_core::graph::{GraphSnapshot, ImportRow, ImportSession, ReferenceGraph};
use cible_core::scope::{OwnedScope, ScopeOwner, ScopeTreeBuilder, ScopeTreeInput};
use cible_shared::types::{FormationId, ProgramId, TaxId, ThemeId, VenueId};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::info;

/// Reference data, scopes and budgets to inspect.
///
/// The graph comes either from `graph` (a ready snapshot) or from flat
/// `import` rows, never both.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Fixture {
    /// Reference graph snapshot.
    #[serde(default)]
    pub graph: GraphSnapshot,
    /// Flat employee rows to import instead of a snapshot.
    #[serde(default)]
    pub import: Vec<ImportRow>,
    /// Taxes available to expense lines.
    #[serde(default)]
    pub taxes: Vec<Tax>,
    /// Training themes with their audience scope and budget.
    #[serde(default)]
    pub themes: Vec<ThemeFixture>,
    /// Venues with their participant scope.
    #[serde(default)]
    pub venues: Vec<VenueFixture>,
}

/// A training theme.
#[derive(Debug, Clone, Deserialize)]
pub struct ThemeFixture {
    /// Theme ID.
    pub id: ThemeId,
    /// Display label.
    #[serde(default)]
    pub label: String,
    /// Owning formation.
    #[serde(default)]
    pub formation_id: Option<FormationId>,
    /// Owning program.
    #[serde(default)]
    pub program_id: Option<ProgramId>,
    /// Targeted public.
    #[serde(default)]
    pub scope: ScopeTreeInput,
    /// Budget lines.
    #[serde(default)]
    pub lines: Vec<LineFixture>,
}

/// A training venue.
#[derive(Debug, Clone, Deserialize)]
pub struct VenueFixture {
    /// Venue ID.
    pub id: VenueId,
    /// Display label.
    #[serde(default)]
    pub label: String,
    /// Expected participants.
    #[serde(default)]
    pub scope: ScopeTreeInput,
}

/// An expense line attached to its enclosing theme.
#[derive(Debug, Clone, Deserialize)]
pub struct LineFixture {
    /// Expense category.
    pub category: ExpenseCategory,
    /// Description.
    #[serde(default)]
    pub label: String,
    /// Quantity; defaults to 1.
    #[serde(default)]
    pub quantity: Option<Decimal>,
    /// Planned unit price.
    #[serde(default)]
    pub planned_unit_price: Option<Decimal>,
    /// Realized unit price.
    #[serde(default)]
    pub actual_unit_price: Option<Decimal>,
    /// Applicable taxes.
    #[serde(default)]
    pub tax_ids: Vec<TaxId>,
}

impl LineFixture {
    fn to_input(&self, theme_id: ThemeId) -> CreateExpenseLineInput {
        CreateExpenseLineInput {
            theme_id,
            category: self.category,
            label: self.label.clone(),
            quantity: self.quantity,
            planned_unit_price: self.planned_unit_price,
            actual_unit_price: self.actual_unit_price,
            tax_ids: self.tax_ids.clone(),
        }
    }
}

impl Fixture {
    /// Reads and parses a fixture file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read fixture {}", path.display()))?;
        Self::parse(&raw).with_context(|| format!("Invalid fixture {}", path.display()))
    }

    /// Parses fixture JSON.
    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Builds the reference graph from the snapshot or the import rows.
    pub fn reference_graph(&self) -> anyhow::Result<ReferenceGraph> {
        if self.import.is_empty() {
            return Ok(ReferenceGraph::from_snapshot(self.graph.clone())?);
        }
        if !self.graph.employees.is_empty() || !self.graph.job_families.is_empty() {
            bail!("Fixture must provide either a graph snapshot or import rows, not both");
        }

        let mut session = ImportSession::new();
        session.import_rows(&self.import)?;
        Ok(session.finish(self.graph.revision)?)
    }

    /// Validates every tax, theme and line into a ledger.
    pub fn ledger(&self) -> anyhow::Result<ExpenseLedger> {
        let mut ledger = ExpenseLedger::new();
        for tax in &self.taxes {
            ledger
                .add_tax(tax.clone())
                .with_context(|| format!("Rejected tax {}", tax.id))?;
        }

        for theme in &self.themes {
            ledger.register_theme(theme.id);
            for (idx, line) in theme.lines.iter().enumerate() {
                ledger
                    .add_line(line.to_input(theme.id))
                    .with_context(|| format!("Rejected line {} of theme {}", idx + 1, theme.id))?;
            }
        }

        info!(
            taxes = self.taxes.len(),
            themes = self.themes.len(),
            lines = ledger.line_count(),
            "Expense ledger loaded"
        );
        Ok(ledger)
    }

    /// Validates every theme and venue scope against `graph`.
    pub fn scopes(&self, graph: &ReferenceGraph) -> anyhow::Result<Vec<OwnedScope>> {
        let builder = ScopeTreeBuilder::new(graph);

        let themes = self
            .themes
            .iter()
            .map(|theme| (ScopeOwner::Theme(theme.id), &theme.scope));
        let venues = self
            .venues
            .iter()
            .map(|venue| (ScopeOwner::Venue(venue.id), &venue.scope));

        themes
            .chain(venues)
            .map(|(owner, input)| {
                let tree = builder
                    .build(input)
                    .with_context(|| format!("Invalid scope for {owner}"))?;
                Ok(OwnedScope::new(owner, tree))
            })
            .collect()
    }
}
