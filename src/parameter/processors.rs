//! Processing pipeline
//!
//! Populates a [`ParameterSet`] from a dataset in three stages:
//!
//! 1. [`process_for_betas`]: fixed effects
//! 2. [`process_for_gammas`]: random-effect variances
//! 3. [`process_for_us`]: per-group random-effect coefficients
//!
//! [`process_all`] always runs the first stage and runs the other two when the
//! set has random-effect variables. Each stage checks the shape invariants of
//! what it assembled and fails with a consistency error if one does not hold.
//! No stage rolls back on failure: reset the set before processing it again.
//!
//! The random-effect design matrix is shared between stages 2 and 3. Whichever
//! runs first after a reset builds it, and the other reuses it.

use crate::data::Dataset;
use crate::error::{MixFxError, Result};
use crate::parameter::collect::{
    collect_blocks, BoundsFe, BoundsRe, BoundsReVar, ConstraintsFe, ConstraintsRe,
    ConstraintsReVar, DesignMatrixFe, DesignMatrixRe, FePrior, NGroups, RePrior, ReVarPrior,
    Selection,
};
use crate::parameter::constraints::{
    combine_constraints, concat_vectors, hstack, padding_matrix, LinearConstraints,
};
use crate::parameter::parameter_set::{FixedEffectBlocks, ParameterSet, RandomEffectBlocks};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Configuration options for [`process_all_with_config`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Reset the parameter set before processing fixed effects. Default: true
    pub reset: bool,

    /// Process random effects when the set has any. Default: true
    pub random_effects: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            reset: true,
            random_effects: true,
        }
    }
}

impl PipelineConfig {
    /// Serialize the configuration to pretty-printed JSON
    pub fn to_json(&self) -> Result<String> {
        let json = serde_json::to_string_pretty(self)?;
        Ok(json)
    }

    /// Load a configuration from JSON
    ///
    /// # Examples
    ///
    /// ```
    /// use mixfx_rs::parameter::PipelineConfig;
    ///
    /// let json = r#"{"reset": false, "random_effects": true}"#;
    /// let config = PipelineConfig::from_json(json).unwrap();
    /// assert!(!config.reset);
    /// ```
    pub fn from_json(json: &str) -> Result<Self> {
        let config = serde_json::from_str(json)?;
        Ok(config)
    }
}

fn ensure(condition: bool, message: impl FnOnce() -> String) -> Result<()> {
    if condition {
        Ok(())
    } else {
        Err(MixFxError::Consistency(message()))
    }
}

fn unzip_bounds(bounds: Vec<(Array1<f64>, Array1<f64>)>) -> (Array1<f64>, Array1<f64>) {
    let (lower, upper): (Vec<_>, Vec<_>) = bounds.into_iter().unzip();
    (concat_vectors(&lower), concat_vectors(&upper))
}

/// Run every stage the parameter set needs, with the default configuration.
pub fn process_all(parameter_set: &mut ParameterSet, dataset: &Dataset) -> Result<()> {
    process_all_with_config(parameter_set, dataset, &PipelineConfig::default())
}

/// Run every stage the parameter set needs.
///
/// # Examples
///
/// ```
/// use mixfx_rs::data::Dataset;
/// use mixfx_rs::parameter::{process_all, ParameterSet, Prior, Variable};
///
/// let df = Dataset::new()
///     .with_numeric("cov1", vec![0.0, 1.0, 2.0, 3.0])
///     .unwrap()
///     .with_categorical("group", ["a", "b", "b", "c"])
///     .unwrap();
///
/// let cov1 = Variable::builder()
///     .covariate("cov1")
///     .random_effect("group", Prior::bounded(vec![0.0], vec![1.0]).unwrap(), Prior::unbounded(1))
///     .build()
///     .unwrap();
/// let mut set = ParameterSet::new(vec![Variable::intercept(), cov1]);
///
/// process_all(&mut set, &df).unwrap();
/// assert_eq!(set.design_matrix_fe().unwrap().dim(), (4, 2));
/// assert_eq!(set.design_matrix_re().unwrap().dim(), (4, 3));
/// assert_eq!(set.re_var_padding().unwrap().dim(), (3, 1));
/// ```
pub fn process_all_with_config(
    parameter_set: &mut ParameterSet,
    dataset: &Dataset,
    config: &PipelineConfig,
) -> Result<()> {
    process_for_betas(parameter_set, dataset, config.reset)?;
    if config.random_effects && parameter_set.num_re_var() > 0 {
        process_for_gammas(parameter_set, dataset, false)?;
        process_for_us(parameter_set, dataset, false)?;
    }
    Ok(())
}

/// Assemble the fixed-effect design matrix, bounds, constraints and priors.
pub fn process_for_betas(
    parameter_set: &mut ParameterSet,
    dataset: &Dataset,
    reset: bool,
) -> Result<()> {
    if reset {
        parameter_set.reset();
    }
    log::debug!(
        "processing fixed effects of {} variables over {} rows",
        parameter_set.len(),
        dataset.n_rows()
    );

    let design_blocks =
        collect_blocks::<DesignMatrixFe>(parameter_set, Some(dataset), Selection::All)?;
    let bounds = collect_blocks::<BoundsFe>(parameter_set, None, Selection::All)?;
    let constraint_blocks = collect_blocks::<ConstraintsFe>(parameter_set, None, Selection::All)?;
    let priors = collect_blocks::<FePrior>(parameter_set, None, Selection::All)?;

    let design_matrix = hstack(&design_blocks, dataset.n_rows())?;
    let (lower_bound, upper_bound) = unzip_bounds(bounds);
    let blocks = FixedEffectBlocks {
        design_matrix,
        lower_bound,
        upper_bound,
        constraints: combine_constraints(&constraint_blocks),
        priors,
    };

    let num_fe = parameter_set.num_fe();
    ensure(blocks.design_matrix.ncols() == num_fe, || {
        format!(
            "fixed-effect design matrix has {} columns, expected num_fe = {}",
            blocks.design_matrix.ncols(),
            num_fe
        )
    })?;
    check_bounds("fixed-effect", &blocks.lower_bound, &blocks.upper_bound, num_fe)?;
    check_constraints("fixed-effect", &blocks.constraints, num_fe)?;

    log::debug!(
        "fixed effects assembled: design {:?}, constraints {:?}",
        blocks.design_matrix.dim(),
        blocks.constraints.matrix().dim()
    );
    parameter_set.fixed_effects = Some(blocks);
    Ok(())
}

/// Assemble the random-effect variance bounds, constraints and priors along
/// with the padding matrix.
pub fn process_for_gammas(
    parameter_set: &mut ParameterSet,
    dataset: &Dataset,
    reset: bool,
) -> Result<()> {
    if reset {
        parameter_set.reset();
    }
    require_random_effects(parameter_set, "process_for_gammas")?;
    log::debug!("processing random-effect variances");

    shared_design_matrix_re(parameter_set, dataset)?;
    let bounds = collect_blocks::<BoundsReVar>(parameter_set, None, Selection::RandomEffects)?;
    let constraint_blocks =
        collect_blocks::<ConstraintsReVar>(parameter_set, None, Selection::RandomEffects)?;
    let priors = collect_blocks::<ReVarPrior>(parameter_set, None, Selection::RandomEffects)?;
    let grouping =
        collect_blocks::<NGroups>(parameter_set, Some(dataset), Selection::RandomEffects)?;

    let (lower_bound, upper_bound) = unzip_bounds(bounds);
    let blocks = RandomEffectBlocks {
        lower_bound,
        upper_bound,
        constraints: combine_constraints(&constraint_blocks),
        priors,
    };
    let padding = padding_matrix(&grouping);

    let num_re_var = parameter_set.num_re_var();
    check_random_design(parameter_set, &padding)?;
    ensure(padding.ncols() == num_re_var, || {
        format!(
            "re_var_padding has {} columns, expected num_re_var = {}",
            padding.ncols(),
            num_re_var
        )
    })?;
    check_bounds("variance", &blocks.lower_bound, &blocks.upper_bound, num_re_var)?;
    check_constraints("variance", &blocks.constraints, num_re_var)?;

    parameter_set.re_variances = Some(blocks);
    parameter_set.re_var_padding = Some(padding);
    Ok(())
}

/// Assemble the per-group random-effect bounds, constraints and priors.
///
/// Every group of a variable gets its own copy of the variable's coefficient
/// prior, in group-code order.
pub fn process_for_us(
    parameter_set: &mut ParameterSet,
    dataset: &Dataset,
    reset: bool,
) -> Result<()> {
    if reset {
        parameter_set.reset();
    }
    require_random_effects(parameter_set, "process_for_us")?;
    log::debug!("processing random-effect coefficients");

    shared_design_matrix_re(parameter_set, dataset)?;
    let bounds = collect_blocks::<BoundsRe>(parameter_set, None, Selection::RandomEffects)?;
    let constraint_blocks =
        collect_blocks::<ConstraintsRe>(parameter_set, None, Selection::RandomEffects)?;
    let re_priors = collect_blocks::<RePrior>(parameter_set, None, Selection::RandomEffects)?;
    let grouping =
        collect_blocks::<NGroups>(parameter_set, Some(dataset), Selection::RandomEffects)?;

    let priors = grouping
        .iter()
        .zip(re_priors)
        .flat_map(|(&n_groups, prior)| std::iter::repeat(prior).take(n_groups))
        .collect();
    let (lower_bound, upper_bound) = unzip_bounds(bounds);
    let blocks = RandomEffectBlocks {
        lower_bound,
        upper_bound,
        constraints: combine_constraints(&constraint_blocks),
        priors,
    };
    let padding = padding_matrix(&grouping);

    let num_re = check_random_design(parameter_set, &padding)?;
    check_bounds("random-effect", &blocks.lower_bound, &blocks.upper_bound, num_re)?;
    ensure(blocks.priors.len() == num_re, || {
        format!(
            "random-effect stage has {} priors, expected num_re = {}",
            blocks.priors.len(),
            num_re
        )
    })?;
    check_constraints("random-effect", &blocks.constraints, num_re)?;

    parameter_set.random_effects = Some(blocks);
    parameter_set.re_var_padding = Some(padding);
    Ok(())
}

fn require_random_effects(parameter_set: &ParameterSet, stage: &str) -> Result<()> {
    if parameter_set.has_random_effects() {
        Ok(())
    } else {
        Err(MixFxError::Configuration(format!(
            "{} requires at least one variable with a random effect",
            stage
        )))
    }
}

/// Build the random-effect design matrix unless an earlier stage already has.
fn shared_design_matrix_re(parameter_set: &mut ParameterSet, dataset: &Dataset) -> Result<()> {
    if let Some(existing) = &parameter_set.design_matrix_re {
        if existing.nrows() != dataset.n_rows() {
            log::warn!(
                "random-effect design matrix has {} rows but the dataset has {}",
                existing.nrows(),
                dataset.n_rows()
            );
            return Err(MixFxError::Compatibility(format!(
                "random-effect design matrix was built for {} rows, the dataset has {}; reset before processing a new dataset",
                existing.nrows(),
                dataset.n_rows()
            )));
        }
        log::debug!("reusing random-effect design matrix {:?}", existing.dim());
        return Ok(());
    }

    let blocks =
        collect_blocks::<DesignMatrixRe>(parameter_set, Some(dataset), Selection::RandomEffects)?;
    let design_matrix = hstack(&blocks, dataset.n_rows())?;
    log::debug!("built random-effect design matrix {:?}", design_matrix.dim());
    parameter_set.design_matrix_re = Some(design_matrix);
    Ok(())
}

/// Check `design_matrix_re.ncols == re_var_padding.nrows == num_re` and return `num_re`.
fn check_random_design(parameter_set: &ParameterSet, padding: &Array2<f64>) -> Result<usize> {
    let num_re = parameter_set.num_re().ok_or_else(|| {
        MixFxError::Consistency("groups of a random-effect variable were never encoded".to_string())
    })?;
    let design_cols = parameter_set.design_matrix_re.as_ref().map_or(0, |m| m.ncols());
    ensure(design_cols == num_re && padding.nrows() == num_re, || {
        format!(
            "random-effect design matrix has {} columns and re_var_padding {} rows, expected num_re = {}",
            design_cols,
            padding.nrows(),
            num_re
        )
    })?;
    Ok(num_re)
}

fn check_bounds(
    facet: &str,
    lower_bound: &Array1<f64>,
    upper_bound: &Array1<f64>,
    expected: usize,
) -> Result<()> {
    ensure(
        lower_bound.len() == expected && upper_bound.len() == expected,
        || {
            format!(
                "{} bounds have lengths {} and {}, expected {}",
                facet,
                lower_bound.len(),
                upper_bound.len(),
                expected
            )
        },
    )
}

fn check_constraints(
    facet: &str,
    constraints: &LinearConstraints,
    expected_cols: usize,
) -> Result<()> {
    ensure(constraints.ncols() == expected_cols, || {
        format!(
            "{} constraint matrix has {} columns, expected {}",
            facet,
            constraints.ncols(),
            expected_cols
        )
    })?;
    ensure(
        constraints.lower_bound().len() == constraints.nrows()
            && constraints.upper_bound().len() == constraints.nrows(),
        || {
            format!(
                "{} constraint bounds have lengths {} and {}, expected {} rows",
                facet,
                constraints.lower_bound().len(),
                constraints.upper_bound().len(),
                constraints.nrows()
            )
        },
    )
}
