//! Scope resolution over a reference graph snapshot.
//!
//! The resolver is a pure, total function of its inputs: dangling or
//! non-conforming nodes contribute no matches instead of failing. The same
//! wildcard rule applies at every level, and both theme audiences and venue
//! participants go through this one implementation.

use std::collections::HashSet;

use cible_shared::config::EngineConfig;
use cible_shared::types::{EmployeeId, PageRequest, PageResponse, PositionId};
use rayon::prelude::*;
use tracing::{debug, warn};

use super::types::{
    EmployeeFilter, EmployeeSummary, FamilyCount, FamilyScope, OwnedScope, ScopeOwner, ScopeTree,
};
use crate::graph::{Employee, ReferenceGraph};

/// Resolution settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolverOptions {
    /// Ignore inactive employees in every query.
    pub active_only: bool,
    /// Fan branches out with rayon from this many branches on; 0 disables.
    pub parallel_branch_threshold: usize,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            active_only: false,
            parallel_branch_threshold: 4,
        }
    }
}

impl From<&EngineConfig> for ResolverOptions {
    fn from(config: &EngineConfig) -> Self {
        Self {
            active_only: config.active_only,
            parallel_branch_threshold: config.parallel_branch_threshold,
        }
    }
}

/// Answers audience queries for scope trees against one graph snapshot.
#[derive(Debug, Clone, Copy)]
pub struct ScopeResolver<'g> {
    graph: &'g ReferenceGraph,
    options: ResolverOptions,
}

impl<'g> ScopeResolver<'g> {
    /// Creates a resolver with default options.
    #[must_use]
    pub fn new(graph: &'g ReferenceGraph) -> Self {
        Self::with_options(graph, ResolverOptions::default())
    }

    /// Creates a resolver with explicit options.
    #[must_use]
    pub const fn with_options(graph: &'g ReferenceGraph, options: ResolverOptions) -> Self {
        Self { graph, options }
    }

    /// The snapshot this resolver reads.
    #[must_use]
    pub const fn graph(&self) -> &'g ReferenceGraph {
        self.graph
    }

    /// Options in effect.
    #[must_use]
    pub const fn options(&self) -> ResolverOptions {
        self.options
    }

    /// Every employee matched by any branch of the tree, deduplicated.
    #[must_use]
    pub fn resolve_all(&self, tree: &ScopeTree) -> HashSet<EmployeeId> {
        let threshold = self.options.parallel_branch_threshold;
        let parallel = threshold > 0 && tree.branch_count() >= threshold;

        let matched = if parallel {
            tree.families
                .par_iter()
                .map(|branch| self.resolve_branch(branch))
                .reduce(HashSet::new, merge)
        } else {
            tree.families
                .iter()
                .map(|branch| self.resolve_branch(branch))
                .fold(HashSet::new(), merge)
        };

        debug!(
            branches = tree.branch_count(),
            parallel,
            matched = matched.len(),
            "Resolved scope tree"
        );
        matched
    }

    /// Whether one employee is matched by the tree.
    ///
    /// Walks the branches without materializing any match set and stops at the
    /// first matching branch. Unknown or unresolvable employees are never targeted.
    #[must_use]
    pub fn is_targeted(&self, tree: &ScopeTree, employee_id: EmployeeId) -> bool {
        let Some(employee) = self.graph.employee(employee_id) else {
            return false;
        };
        if !self.participates(employee) {
            return false;
        }

        tree.families
            .iter()
            .any(|branch| self.branch_matches(branch, employee))
    }

    /// Match count of each branch taken alone, in tree order.
    ///
    /// Branches are not deduplicated against each other: an employee matched by
    /// two branches is counted in both.
    #[must_use]
    pub fn count_by_family(&self, tree: &ScopeTree) -> Vec<FamilyCount> {
        tree.families
            .iter()
            .map(|branch| FamilyCount {
                job_family_id: branch.job_family_id,
                count: self.resolve_branch(branch).len(),
            })
            .collect()
    }

    /// Resolved audience narrowed by `filter`, sorted by name and paginated.
    #[must_use]
    pub fn resolve_filtered(
        &self,
        tree: &ScopeTree,
        filter: &EmployeeFilter,
        page: PageRequest,
    ) -> PageResponse<EmployeeSummary> {
        let matched = self.resolve_all(tree);
        let keep_all = filter.is_empty();

        let mut rows: Vec<&Employee> = matched
            .iter()
            .filter_map(|id| self.graph.employee(*id))
            .filter(|employee| keep_all || filter.matches(employee))
            .collect();
        rows.sort_by_cached_key(|e| (e.last_name.to_lowercase(), e.first_name.to_lowercase(), e.id));

        let rows = rows.into_iter().map(EmployeeSummary::from).collect();
        PageResponse::from_sorted(rows, page)
    }

    /// Owners (themes or venues) whose scope targets the employee, in input order.
    pub fn owners_targeting<'s, I>(&self, employee_id: EmployeeId, scopes: I) -> Vec<ScopeOwner>
    where
        I: IntoIterator<Item = &'s OwnedScope>,
    {
        scopes
            .into_iter()
            .filter(|scope| self.is_targeted(&scope.tree, employee_id))
            .map(|scope| scope.owner)
            .collect()
    }

    /// Match set of a single branch.
    fn resolve_branch(&self, branch: &FamilyScope) -> HashSet<EmployeeId> {
        let family = branch.job_family_id;
        let mut matched = HashSet::new();

        if branch.positions.is_empty() {
            for position in self.graph.positions_of_family(family) {
                self.collect(position, &mut matched, |_| true);
            }
            return matched;
        }

        for position_scope in &branch.positions {
            let position = position_scope.position_id;
            if !self.graph.position_in_family(position, family) {
                warn!(%position, %family, "Skipping position outside its family branch");
                continue;
            }

            if position_scope.units.is_empty() {
                self.collect(position, &mut matched, |_| true);
                continue;
            }

            for unit_scope in &position_scope.units {
                let org_unit = unit_scope.org_unit_id;
                if self.graph.org_unit(org_unit).is_none() {
                    warn!(%org_unit, "Skipping unknown org unit in scope");
                    continue;
                }

                if unit_scope.sub_units.is_empty() {
                    self.collect(position, &mut matched, |e| e.org_unit_id == org_unit);
                    continue;
                }

                for sub_unit_scope in &unit_scope.sub_units {
                    let sub_unit = sub_unit_scope.sub_unit_id;
                    if !self.graph.sub_unit_in_org_unit(sub_unit, org_unit) {
                        warn!(%sub_unit, %org_unit, "Skipping sub-unit outside its org unit");
                        continue;
                    }
                    self.collect(position, &mut matched, |e| e.sub_unit_id == sub_unit);
                }
            }
        }

        matched
    }

    /// Single-employee mirror of [`resolve_branch`](Self::resolve_branch).
    fn branch_matches(&self, branch: &FamilyScope, employee: &Employee) -> bool {
        if !self
            .graph
            .position_in_family(employee.position_id, branch.job_family_id)
        {
            return false;
        }
        if branch.positions.is_empty() {
            return true;
        }

        branch
            .positions
            .iter()
            .filter(|p| p.position_id == employee.position_id)
            .any(|position_scope| {
                if position_scope.units.is_empty() {
                    return true;
                }
                position_scope
                    .units
                    .iter()
                    .filter(|u| u.org_unit_id == employee.org_unit_id)
                    .any(|unit_scope| {
                        unit_scope.sub_units.is_empty()
                            || unit_scope.sub_units.iter().any(|s| {
                                s.sub_unit_id == employee.sub_unit_id
                                    && self
                                        .graph
                                        .sub_unit_in_org_unit(s.sub_unit_id, unit_scope.org_unit_id)
                            })
                    })
            })
    }

    fn collect<F>(&self, position: PositionId, matched: &mut HashSet<EmployeeId>, keep: F)
    where
        F: Fn(&Employee) -> bool,
    {
        matched.extend(
            self.graph
                .employees_with_position(position)
                .iter()
                .filter_map(|id| self.graph.employee(*id))
                .filter(|&e| self.participates(e) && keep(e))
                .map(|e| e.id),
        );
    }

    fn participates(&self, employee: &Employee) -> bool {
        (!self.options.active_only || employee.is_active) && self.graph.is_resolvable(employee)
    }
}

fn merge(mut acc: HashSet<EmployeeId>, other: HashSet<EmployeeId>) -> HashSet<EmployeeId> {
    if acc.len() < other.len() {
        return merge(other, acc);
    }
    acc.extend(other);
    acc
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{GraphSnapshot, JobFamily, OrgUnit, Position, SubUnit};
    use crate::scope::types::{PositionScope, SubUnitScope, UnitScope};
    use cible_shared::types::{JobFamilyId, OrgUnitId, SubUnitId, ThemeId, VenueId};

    /// F has P1 and P2, G has P2 (shared) and P3.
    /// Units A (sub-units A1, A2) and B (sub-unit B1).
    struct World {
        graph: ReferenceGraph,
        f: JobFamilyId,
        g: JobFamilyId,
        p1: PositionId,
        p2: PositionId,
        p3: PositionId,
        a: OrgUnitId,
        b: OrgUnitId,
        a1: SubUnitId,
        a2: SubUnitId,
        e1: EmployeeId,
        e2: EmployeeId,
        e3: EmployeeId,
        e4: EmployeeId,
        inactive: EmployeeId,
    }

    fn record_family(id: JobFamilyId, code: &str) -> JobFamily {
        JobFamily {
            id,
            code: code.into(),
            label: code.into(),
        }
    }

    fn record_position(id: PositionId, code: &str, family_ids: Vec<JobFamilyId>) -> Position {
        Position {
            id,
            code: code.into(),
            label: code.into(),
            family_ids,
        }
    }

    fn record_employee(
        last_name: &str,
        position_id: PositionId,
        org_unit_id: OrgUnitId,
        sub_unit_id: SubUnitId,
        is_active: bool,
    ) -> Employee {
        Employee {
            id: EmployeeId::new(),
            registration_number: format!("M-{last_name}"),
            first_name: "Test".into(),
            last_name: last_name.into(),
            position_id,
            org_unit_id,
            sub_unit_id,
            is_active,
        }
    }

    fn world() -> World {
        let (f, g) = (JobFamilyId::new(), JobFamilyId::new());
        let (p1, p2, p3) = (PositionId::new(), PositionId::new(), PositionId::new());
        let (a, b) = (OrgUnitId::new(), OrgUnitId::new());
        let (a1, a2, b1) = (SubUnitId::new(), SubUnitId::new(), SubUnitId::new());

        let e1 = record_employee("Ba", p1, a, a1, true);
        let e2 = record_employee("Cisse", p2, b, b1, true);
        let e3 = record_employee("Diop", p1, a, a2, true);
        let e4 = record_employee("Fall", p3, b, b1, true);
        let inactive = record_employee("Gueye", p1, a, a1, false);

        let sub = |id, code: &str, org_unit_id| SubUnit {
            id,
            code: code.into(),
            label: code.into(),
            org_unit_id,
        };
        let unit = |id, code: &str| OrgUnit {
            id,
            code: code.into(),
            label: code.into(),
        };

        let graph = ReferenceGraph::from_snapshot(GraphSnapshot {
            revision: 3,
            job_families: vec![record_family(f, "F"), record_family(g, "G")],
            positions: vec![
                record_position(p1, "P1", vec![f]),
                record_position(p2, "P2", vec![f, g]),
                record_position(p3, "P3", vec![g]),
            ],
            org_units: vec![unit(a, "A"), unit(b, "B")],
            sub_units: vec![sub(a1, "A1", a), sub(a2, "A2", a), sub(b1, "B1", b)],
            employees: vec![
                e1.clone(),
                e2.clone(),
                e3.clone(),
                e4.clone(),
                inactive.clone(),
            ],
        })
        .unwrap();

        World {
            graph,
            f,
            g,
            p1,
            p2,
            p3,
            a,
            b,
            a1,
            a2,
            e1: e1.id,
            e2: e2.id,
            e3: e3.id,
            e4: e4.id,
            inactive: inactive.id,
        }
    }

    fn set(ids: &[EmployeeId]) -> HashSet<EmployeeId> {
        ids.iter().copied().collect()
    }

    #[test]
    fn test_whole_family_wildcard() {
        let w = world();
        let resolver = ScopeResolver::new(&w.graph);
        let tree = ScopeTree::new(vec![FamilyScope::whole(w.f)]);

        assert_eq!(
            resolver.resolve_all(&tree),
            set(&[w.e1, w.e2, w.e3, w.inactive])
        );
    }

    #[test]
    fn test_active_only_excludes_inactive() {
        let w = world();
        let resolver = ScopeResolver::with_options(
            &w.graph,
            ResolverOptions {
                active_only: true,
                ..ResolverOptions::default()
            },
        );
        let tree = ScopeTree::new(vec![FamilyScope::whole(w.f)]);

        assert_eq!(resolver.resolve_all(&tree), set(&[w.e1, w.e2, w.e3]));
        assert!(!resolver.is_targeted(&tree, w.inactive));
    }

    #[test]
    fn test_position_then_unit_then_sub_unit_narrowing() {
        let w = world();
        let resolver = ScopeResolver::new(&w.graph);

        let by_position = ScopeTree::new(vec![FamilyScope {
            job_family_id: w.f,
            positions: vec![PositionScope::whole(w.p1)],
        }]);
        assert_eq!(
            resolver.resolve_all(&by_position),
            set(&[w.e1, w.e3, w.inactive])
        );

        let by_unit = ScopeTree::new(vec![FamilyScope {
            job_family_id: w.f,
            positions: vec![PositionScope {
                position_id: w.p2,
                units: vec![UnitScope::whole(w.b)],
            }],
        }]);
        assert_eq!(resolver.resolve_all(&by_unit), set(&[w.e2]));

        let by_sub_unit = ScopeTree::new(vec![FamilyScope {
            job_family_id: w.f,
            positions: vec![PositionScope {
                position_id: w.p1,
                units: vec![UnitScope {
                    org_unit_id: w.a,
                    sub_units: vec![SubUnitScope { sub_unit_id: w.a2 }],
                }],
            }],
        }]);
        assert_eq!(resolver.resolve_all(&by_sub_unit), set(&[w.e3]));
    }

    #[test]
    fn test_empty_tree_matches_no_one() {
        let w = world();
        let resolver = ScopeResolver::new(&w.graph);
        let tree = ScopeTree::default();

        assert!(resolver.resolve_all(&tree).is_empty());
        assert!(!resolver.is_targeted(&tree, w.e1));
        assert!(resolver.count_by_family(&tree).is_empty());
    }

    #[test]
    fn test_non_conforming_nodes_are_skipped() {
        let w = world();
        let resolver = ScopeResolver::new(&w.graph);

        // P3 is not in F; sub-unit A1 is not in B.
        let tree = ScopeTree::new(vec![FamilyScope {
            job_family_id: w.f,
            positions: vec![
                PositionScope::whole(w.p3),
                PositionScope {
                    position_id: w.p1,
                    units: vec![UnitScope {
                        org_unit_id: w.b,
                        sub_units: vec![SubUnitScope { sub_unit_id: w.a1 }],
                    }],
                },
            ],
        }]);

        assert!(resolver.resolve_all(&tree).is_empty());
        assert!(!resolver.is_targeted(&tree, w.e4));
        assert!(!resolver.is_targeted(&tree, w.e1));
    }

    #[test]
    fn test_dangling_references_contribute_nothing() {
        let w = world();
        let resolver = ScopeResolver::new(&w.graph);
        let tree = ScopeTree::new(vec![
            FamilyScope::whole(JobFamilyId::new()),
            FamilyScope {
                job_family_id: w.g,
                positions: vec![PositionScope {
                    position_id: w.p3,
                    units: vec![UnitScope::whole(OrgUnitId::new())],
                }],
            },
        ]);

        assert!(resolver.resolve_all(&tree).is_empty());
        assert!(!resolver.is_targeted(&tree, EmployeeId::new()));
    }

    #[test]
    fn test_count_by_family_does_not_deduplicate_across_branches() {
        let w = world();
        let resolver = ScopeResolver::new(&w.graph);
        let tree = ScopeTree::new(vec![FamilyScope::whole(w.f), FamilyScope::whole(w.g)]);

        let counts = resolver.count_by_family(&tree);
        assert_eq!(
            counts,
            vec![
                FamilyCount {
                    job_family_id: w.f,
                    count: 4
                },
                FamilyCount {
                    job_family_id: w.g,
                    count: 2
                },
            ]
        );

        // e2 holds P2, shared by both families: counted twice above, once here.
        assert_eq!(resolver.resolve_all(&tree).len(), 5);
    }

    #[test]
    fn test_parallel_and_sequential_agree() {
        let w = world();
        let tree = ScopeTree::new(vec![
            FamilyScope::whole(w.f),
            FamilyScope::whole(w.g),
            FamilyScope {
                job_family_id: w.f,
                positions: vec![PositionScope::whole(w.p2)],
            },
        ]);

        let sequential = ScopeResolver::with_options(
            &w.graph,
            ResolverOptions {
                parallel_branch_threshold: 0,
                ..ResolverOptions::default()
            },
        );
        let parallel = ScopeResolver::with_options(
            &w.graph,
            ResolverOptions {
                parallel_branch_threshold: 1,
                ..ResolverOptions::default()
            },
        );

        assert_eq!(sequential.resolve_all(&tree), parallel.resolve_all(&tree));
    }

    #[test]
    fn test_resolve_filtered_sorts_and_paginates() {
        let w = world();
        let resolver = ScopeResolver::new(&w.graph);
        let tree = ScopeTree::new(vec![FamilyScope::whole(w.f), FamilyScope::whole(w.g)]);

        let first = resolver.resolve_filtered(&tree, &EmployeeFilter::new(), PageRequest::new(1, 2));
        let names: Vec<_> = first.data.iter().map(|e| e.last_name.as_str()).collect();
        assert_eq!(names, vec!["Ba", "Cisse"]);
        assert_eq!(first.meta.total, 5);
        assert_eq!(first.meta.total_pages, 3);

        let in_a = resolver.resolve_filtered(
            &tree,
            &EmployeeFilter::new().with_org_unit(w.a).with_search("dio"),
            PageRequest::default(),
        );
        assert_eq!(in_a.data.len(), 1);
        assert_eq!(in_a.data[0].id, w.e3);
    }

    #[test]
    fn test_owners_targeting_serves_themes_and_venues() {
        let w = world();
        let resolver = ScopeResolver::new(&w.graph);
        let theme = ScopeOwner::Theme(ThemeId::new());
        let venue = ScopeOwner::Venue(VenueId::new());
        let other = ScopeOwner::Theme(ThemeId::new());

        let scopes = vec![
            OwnedScope::new(theme, ScopeTree::new(vec![FamilyScope::whole(w.f)])),
            OwnedScope::new(
                venue,
                ScopeTree::new(vec![FamilyScope {
                    job_family_id: w.g,
                    positions: vec![PositionScope::whole(w.p2)],
                }]),
            ),
            OwnedScope::new(other, ScopeTree::new(vec![FamilyScope::whole(w.g)])),
        ];

        assert_eq!(resolver.owners_targeting(w.e2, &scopes), vec![theme, venue, other]);
        assert_eq!(resolver.owners_targeting(w.e1, &scopes), vec![theme]);
        assert!(resolver.owners_targeting(EmployeeId::new(), &scopes).is_empty());
    }

    #[test]
    fn test_blank_filter_keeps_the_whole_audience() {
        let w = world();
        let resolver = ScopeResolver::new(&w.graph);
        let tree = ScopeTree::new(vec![FamilyScope::whole(w.f)]);
        let blank = EmployeeFilter::new().with_search("   ");
        assert!(blank.is_empty());

        let page = resolver.resolve_filtered(&tree, &blank, PageRequest::default());
        assert_eq!(page.meta.total, 4);
    }

    #[test]
    fn test_unresolvable_employees_are_never_targeted() {
        let family = JobFamilyId::new();
        let position = PositionId::new();
        let (a, b) = (OrgUnitId::new(), OrgUnitId::new());
        let (a1, b1) = (SubUnitId::new(), SubUnitId::new());

        let placed = record_employee("Ndiaye", position, a, a1, true);
        let unknown_position = record_employee("Sarr", PositionId::new(), a, a1, true);
        let unknown_sub_unit = record_employee("Thiam", position, a, SubUnitId::new(), true);
        let foreign_sub_unit = record_employee("Kane", position, a, b1, true);
        let unknown_org_unit = record_employee("Mbaye", position, OrgUnitId::new(), a1, true);

        let graph = ReferenceGraph::from_snapshot(GraphSnapshot {
            revision: 1,
            job_families: vec![record_family(family, "F")],
            positions: vec![record_position(position, "P", vec![family])],
            org_units: vec![
                OrgUnit {
                    id: a,
                    code: "A".into(),
                    label: "A".into(),
                },
                OrgUnit {
                    id: b,
                    code: "B".into(),
                    label: "B".into(),
                },
            ],
            sub_units: vec![
                SubUnit {
                    id: a1,
                    code: "A1".into(),
                    label: "A1".into(),
                    org_unit_id: a,
                },
                SubUnit {
                    id: b1,
                    code: "B1".into(),
                    label: "B1".into(),
                    org_unit_id: b,
                },
            ],
            employees: vec![
                placed.clone(),
                unknown_position.clone(),
                unknown_sub_unit.clone(),
                foreign_sub_unit.clone(),
                unknown_org_unit.clone(),
            ],
        })
        .unwrap();
        let resolver = ScopeResolver::new(&graph);

        let trees = [
            ScopeTree::new(vec![FamilyScope::whole(family)]),
            ScopeTree::new(vec![FamilyScope {
                job_family_id: family,
                positions: vec![PositionScope::whole(position)],
            }]),
            ScopeTree::new(vec![FamilyScope {
                job_family_id: family,
                positions: vec![PositionScope {
                    position_id: position,
                    units: vec![UnitScope::whole(a)],
                }],
            }]),
        ];

        for tree in &trees {
            let audience = resolver.resolve_all(tree);
            assert_eq!(audience, set(&[placed.id]));
            assert!(resolver.is_targeted(tree, placed.id));

            for dangling in [
                &unknown_position,
                &unknown_sub_unit,
                &foreign_sub_unit,
                &unknown_org_unit,
            ] {
                assert!(
                    !resolver.is_targeted(tree, dangling.id),
                    "{} should not be targeted",
                    dangling.last_name
                );
                assert!(!audience.contains(&dangling.id));
            }

            assert_eq!(resolver.count_by_family(tree)[0].count, 1);
        }
    }
}
