//! # mixfx-rs
//!
//! `mixfx-rs` assembles the numeric inputs needed to fit a mixed-effects
//! regression model from per-covariate variable definitions and a dataset.
//!
//! The library provides:
//! - Variables describing a covariate's fixed effect, bounds, linear constraints,
//!   prior and optional random effect grouped by a categorical column
//! - A block collector that builds each per-variable block once and caches it
//! - A block combiner producing block-diagonal constraint systems
//! - A processing pipeline that fills a [`ParameterSet`] with the stacked design
//!   matrices, bounds, constraints, priors and random-effect padding matrix
//!
//! Fitting the model is left to the optimizer that consumes these objects.

// Public modules
pub mod data;
pub mod error;
pub mod parameter;

// Re-exports for convenience
pub use data::Dataset;
pub use error::{MixFxError, Result};
pub use parameter::{process_all, ParameterSet, Prior, Variable};

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
