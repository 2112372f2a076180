//! Parent and survivor selection.
//!
//! - [`ParentSelection`]: which individuals get perturbed
//! - [`SurvivorSelection`]: which individuals form the next generation
//! - [`Reef`] / [`cro_selection`]: coral reef settling and depredation
//!
//! The free functions in this module ([`elitism`], [`one_to_one`], ...) are
//! usable on their own by custom strategies.

mod parent;
mod reef;
mod survivor;

pub use parent::{ParentMethod, ParentSelection};
pub use reef::{cro_selection, Reef, REEF_FLOOR};
pub use survivor::{
    comma_selection, cond_elitism, elitism, one_to_one, plus_selection, prob_one_to_one,
    SurvivorMethod, SurvivorSelection,
};
