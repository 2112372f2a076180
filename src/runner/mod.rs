//! Search driver.
//!
//! [`SearchRunner`] owns the generation loop: it seeds the random source,
//! initializes the strategy, computes progress from the configured budgets
//! and stops on the first rule that fires.

mod config;
mod driver;

pub use config::{ProgressMetric, SearchConfig};
pub use driver::{SearchResult, SearchRunner, StopReason};
