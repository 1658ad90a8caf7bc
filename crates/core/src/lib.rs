//! Core engines for training targeting and budgeting.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! Everything operates on in-memory snapshots handed in by the caller.
//!
//! # Modules
//!
//! - `graph` - Reference graph of job families, positions, org units and employees
//! - `scope` - Scope trees and the resolver answering who a theme or venue targets
//! - `budget` - Expense ledger and HT/TTC budget aggregation

pub mod budget;
pub mod graph;
pub mod scope;
