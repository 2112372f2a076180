//! Building blocks shared by every search strategy.
//!
//! # Core Traits
//!
//! - [`Objective`]: scores and repairs genotypes, declares the optimization
//!   direction
//! - [`Initializer`]: produces fresh genotypes and tracks population size
//! - [`Operator`]: perturbs an individual into a new one
//! - [`Schedulable`]: components whose parameters follow search progress
//!
//! # Key Types
//!
//! - [`Individual`]: a candidate solution with cached normalized fitness
//! - [`ParamScheduler`]: maps progress to named parameters
//! - [`NullOperator`], [`Chain`], [`Branch`], [`FnOperator`]: operator glue

mod individual;
mod operator;
mod schedule;
mod types;

pub use individual::{fittest, sort_descending, Individual};
pub use operator::{Branch, Chain, FnOperator, NullOperator, Operator, OperatorContext};
pub use schedule::{ParamScheduler, ParamValue, Params, Schedulable, ScheduleMethod};
pub use types::{Direction, Genotype, Initializer, Objective};
