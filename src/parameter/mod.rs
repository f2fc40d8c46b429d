//! # Parameter System
//!
//! This module turns a list of per-covariate [`Variable`]s and a dataset into the
//! global objects a mixed-effects optimizer consumes: stacked design matrices,
//! concatenated bound vectors, block-diagonal linear constraint systems, prior
//! lists and the random-effect padding matrix.
//!
//! ## Core Components
//!
//! - [`Prior`]: bounds (and optionally Gaussian moments) for a block of coefficients
//! - [`Variable`]: one covariate's fixed-effect and optional random-effect blocks
//! - [`collect_blocks`]: gathers one block per variable, building and caching on demand
//! - [`combine_constraints`]: block-diagonal combination of constraint systems
//! - [`ParameterSet`]: the ordered variables and their assembled objects
//! - [`process_all`]: the processing pipeline
//!
//! ## Example Usage
//!
//! ```rust
//! use mixfx_rs::data::Dataset;
//! use mixfx_rs::parameter::{process_all, ParameterSet, Prior, Variable};
//!
//! let df = Dataset::new()
//!     .with_numeric("cov1", vec![0.0, 1.0, 2.0, 3.0, 4.0])
//!     .unwrap()
//!     .with_categorical("group", ["1", "2", "2", "1", "3"])
//!     .unwrap();
//!
//! let cov1 = Variable::builder()
//!     .covariate("cov1")
//!     .fe_prior(Prior::bounded(vec![-2.0], vec![3.0]).unwrap())
//!     .random_effect(
//!         "group",
//!         Prior::bounded(vec![0.0], vec![1.0]).unwrap(),
//!         Prior::bounded(vec![-10.0], vec![15.0]).unwrap(),
//!     )
//!     .build()
//!     .unwrap();
//!
//! let mut params = ParameterSet::new(vec![Variable::intercept(), cov1]);
//! process_all(&mut params, &df).unwrap();
//!
//! assert_eq!(params.design_matrix_fe().unwrap().dim(), (5, 2));
//! assert_eq!(params.constraints_re().unwrap().matrix().dim(), (3, 3));
//! assert_eq!(params.re_priors().unwrap().len(), 3);
//! ```

pub mod cache;
pub mod collect;
pub mod constraints;
pub mod link;
pub mod parameter_set;
pub mod prior;
pub mod processors;
pub mod spline;
pub mod variable;

// Re-export key types
pub use cache::BlockCache;
pub use collect::{collect_blocks, Attribute, Selection};
pub use constraints::{combine_constraints, padding_matrix, LinearConstraints};
pub use link::LinkFunction;
pub use parameter_set::{FixedEffectBlocks, ParameterSet, RandomEffectBlocks};
pub use prior::{Prior, PriorBounds, PriorError};
pub use processors::{
    process_all, process_all_with_config, process_for_betas, process_for_gammas, process_for_us,
    PipelineConfig,
};
pub use spline::{SplineError, SplineShape, SplineSpec};
pub use variable::{RandomEffect, Variable, VariableBuilder, VariableKind, INTERCEPT};
