//! Coral Reef Optimization with Substrate Layers (CRO-SL family).
//!
//! A reef of fixed capacity holds the population. Each generation every
//! coral is perturbed by the operator of its substrate (slot), the larvae
//! settle by competing for random slots, and the weakest corals are
//! depredated.
//!
//! # Variants
//!
//! | Constructor | Name | Substrate assignment |
//! |---|---|---|
//! | [`CroSl::new`] | CRO-SL | fixed round robin |
//! | [`CroSl::probabilistic`] | PCRO-SL | uniform redraw every generation |
//! | [`CroSl::dynamic`] | DPCRO-SL | redraw from adaptive weights |
//!
//! # Key Types
//!
//! - [`CroConfig`]: reef size and depredation settings
//! - [`DynamicConfig`]: DPCRO-SL adaptation settings
//! - [`OperatorTracker`]: per-operator performance record
//! - [`Reef`]: the settling and depredation mechanics
//!
//! # References
//!
//! - Salcedo-Sanz et al. (2014), "The Coral Reefs Optimization Algorithm: A
//!   Novel Metaheuristic for Efficiently Solving Optimization Problems"
//! - Pérez-Aracil et al. (2023), "New Probabilistic, Dynamic Multi-Method
//!   Ensembles for Optimization Based on the CRO-SL", *Mathematics* 11(7)

mod config;
mod dynamic;
mod strategy;

pub use crate::selection::{cro_selection, Reef, REEF_FLOOR};
pub use config::CroConfig;
pub use dynamic::{
    operator_metric, operator_probability, DynMethod, DynMetric, DynamicConfig, OperatorTracker,
};
pub use strategy::{CroSl, SubstrateMode};
