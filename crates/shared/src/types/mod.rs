//! Common types used across the application.

pub mod id;
pub mod money;
pub mod pagination;

pub use id::*;
pub use money::{REPORTING_SCALE, percent_factor, round_money};
pub use pagination::{PageMeta, PageRequest, PageResponse};
