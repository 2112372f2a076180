//! Domain-agnostic evolutionary search framework.
//!
//! Provides generic search strategies over any genotype type:
//!
//! - **Static / Variable Population**: generational loops with pluggable
//!   parent and survivor selection.
//! - **Genetic Algorithm (GA)**: variable population driven by
//!   probabilistic mutation and crossover.
//! - **Hill Climbing**: independent trajectories that only accept strict
//!   improvements.
//! - **CRO-SL family**: Coral Reef Optimization with Substrate Layers, in
//!   fixed (CRO-SL), probabilistic (PCRO-SL) and dynamic (DPCRO-SL)
//!   substrate assignment.
//!
//! # Architecture
//!
//! The crate knows nothing about what a genotype means. Users supply an
//! [`Objective`](crate::core::Objective), an [`Initializer`](crate::core::Initializer)
//! and one or more [`Operator`](crate::core::Operator)s; strategies implement
//! [`SearchStrategy`](strategy::SearchStrategy) and are driven by
//! [`SearchRunner`](runner::SearchRunner) or stepped by hand.
//!
//! Fitness is normalized internally so that higher is always better.
//!
//! # Features
//!
//! - `serde`: serialization of configurations, individuals and snapshots
//! - `parallel`: offspring evaluation on the rayon thread pool

pub mod core;
pub mod cro;
pub mod error;
pub mod random;
pub mod runner;
pub mod selection;
pub mod strategy;

pub use error::{ConfigError, EvoResult};
