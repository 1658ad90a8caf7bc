//! Theme budgets: expense ledger and HT/TTC aggregation.

pub mod error;
pub mod ledger;
pub mod service;
pub mod types;


pub use error::BudgetError;
pub use ledger::ExpenseLedger;
pub use service::BudgetAggregator;
pub use types::{
    BudgetTotals, CategoryTotals, CreateExpenseLineInput, ExpenseCategory, ExpenseLine,
    LineAmounts, LineReport, Tax, VarianceReport,
};
