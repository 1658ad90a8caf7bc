//! Scope trees: which employees a theme or a venue targets.
//!
//! - `types` - the four-level tree, its owners and client payloads
//! - `builder` - write-time validation against the reference graph
//! - `resolver` - audience queries (`resolve_all`, `is_targeted`, counts)
//! - `cache` - per-owner audience cache keyed by graph revision

pub mod builder;
pub mod cache;
pub mod error;
pub mod resolver;
pub mod types;


pub use builder::ScopeTreeBuilder;
pub use cache::{AudienceCache, CachedAudience};
pub use error::ScopeError;
pub use resolver::{ResolverOptions, ScopeResolver};
pub use types::{
    EmployeeFilter, EmployeeSummary, FamilyCount, FamilyScope, FamilyScopeInput, OwnedScope,
    PositionScope, PositionScopeInput, ScopeOwner, ScopeTree, ScopeTreeInput, SubUnitScope,
    SubUnitScopeInput, UnitScope, UnitScopeInput,
};
