//! Reference graph: job families, positions, org units, sub-units and employees.
//!
//! - `types` - plain records and the snapshot they arrive in
//! - `reference` - immutable id-indexed arena with adjacency
//! - `import` - job-scoped deduplication for bulk imports

pub mod error;
pub mod import;
pub mod reference;
pub mod types;

pub use error::GraphError;
pub use import::{ImportRow, ImportSession, ImportStats, normalize_code};
pub use reference::ReferenceGraph;
pub use types::{Employee, EntityKind, GraphSnapshot, JobFamily, OrgUnit, Position, SubUnit};
