//! Block collection
//!
//! The pipeline asks every variable for one block at a time (its design
//! matrix, its bounds, its constraints, ...). [`collect_blocks`] walks the
//! variables in declaration order and, for each, returns the block already
//! cached on the variable or builds it, caches it and returns it. Each kind of
//! block is an [`Attribute`] marker type, so the collector is generic over the
//! block it gathers while staying statically typed.

use crate::data::Dataset;
use crate::error::{MixFxError, Result};
use crate::parameter::constraints::LinearConstraints;
use crate::parameter::parameter_set::ParameterSet;
use crate::parameter::prior::Prior;
use crate::parameter::variable::Variable;
use ndarray::{Array1, Array2};

/// Which variables take part in a collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Selection {
    /// Every variable
    #[default]
    All,

    /// Only variables carrying a random effect
    RandomEffects,
}

impl Selection {
    pub fn includes(&self, variable: &Variable) -> bool {
        match self {
            Self::All => true,
            Self::RandomEffects => variable.has_random_effects(),
        }
    }
}

/// A per-variable block that can be read from the cache or built
pub trait Attribute {
    /// The block type
    type Output: Clone;

    /// Name used in log and error messages
    const NAME: &'static str;

    /// Whether building the block reads the dataset
    const NEEDS_DATA: bool = false;

    /// The block if the variable already holds it
    fn cached(variable: &Variable) -> Option<Self::Output>;

    /// Build the block from scratch
    fn build(variable: &mut Variable, dataset: Option<&Dataset>) -> Result<Self::Output>;

    /// Keep a freshly built block on the variable
    fn store(_variable: &mut Variable, _value: &Self::Output) {}
}

fn require_dataset<'a, A: Attribute>(dataset: Option<&'a Dataset>) -> Result<&'a Dataset> {
    dataset.ok_or_else(|| {
        MixFxError::Configuration(format!("'{}' cannot be built without a dataset", A::NAME))
    })
}

/// Collect one block per selected variable, in declaration order.
///
/// Blocks not yet cached are built, passing `dataset` to builders that need
/// it, and cached on the variable before being returned.
pub fn collect_blocks<A: Attribute>(
    parameter_set: &mut ParameterSet,
    dataset: Option<&Dataset>,
    selection: Selection,
) -> Result<Vec<A::Output>> {
    let mut blocks = Vec::new();
    for (index, variable) in parameter_set.variables_mut().iter_mut().enumerate() {
        if !selection.includes(variable) {
            continue;
        }

        if let Some(block) = A::cached(variable) {
            log::trace!("'{}' of variable {} is cached", A::NAME, index);
            blocks.push(block);
            continue;
        }

        let block = build_one::<A>(variable, dataset).map_err(|e| {
            e.context(format!(
                "building '{}' for variable {} ('{}')",
                A::NAME,
                index,
                variable.covariate_name()
            ))
        })?;
        log::trace!("'{}' of variable {} built", A::NAME, index);
        A::store(variable, &block);
        blocks.push(block);
    }
    Ok(blocks)
}

fn build_one<A: Attribute>(
    variable: &mut Variable,
    dataset: Option<&Dataset>,
) -> Result<A::Output> {
    if A::NEEDS_DATA {
        require_dataset::<A>(dataset)?;
    }
    A::build(variable, dataset)
}

/// Fixed-effect design matrix
pub struct DesignMatrixFe;

impl Attribute for DesignMatrixFe {
    type Output = Array2<f64>;
    const NAME: &'static str = "design_matrix_fe";
    const NEEDS_DATA: bool = true;

    fn cached(variable: &Variable) -> Option<Self::Output> {
        variable.cache().design_matrix_fe.clone()
    }

    fn build(variable: &mut Variable, dataset: Option<&Dataset>) -> Result<Self::Output> {
        variable.build_design_matrix_fe(require_dataset::<Self>(dataset)?)
    }

    fn store(variable: &mut Variable, value: &Self::Output) {
        variable.cache_mut().design_matrix_fe = Some(value.clone());
    }
}

/// Fixed-effect lower and upper bounds
pub struct BoundsFe;

impl Attribute for BoundsFe {
    type Output = (Array1<f64>, Array1<f64>);
    const NAME: &'static str = "bounds_fe";

    fn cached(variable: &Variable) -> Option<Self::Output> {
        variable.cache().bounds_fe.clone()
    }

    fn build(variable: &mut Variable, _dataset: Option<&Dataset>) -> Result<Self::Output> {
        Ok(variable.build_bounds_fe())
    }

    fn store(variable: &mut Variable, value: &Self::Output) {
        variable.cache_mut().bounds_fe = Some(value.clone());
    }
}

/// Fixed-effect constraint system
pub struct ConstraintsFe;

impl Attribute for ConstraintsFe {
    type Output = LinearConstraints;
    const NAME: &'static str = "constraints_fe";

    fn cached(variable: &Variable) -> Option<Self::Output> {
        variable.cache().constraints_fe.clone()
    }

    fn build(variable: &mut Variable, _dataset: Option<&Dataset>) -> Result<Self::Output> {
        variable.build_constraint_matrix_fe()
    }

    fn store(variable: &mut Variable, value: &Self::Output) {
        variable.cache_mut().constraints_fe = Some(value.clone());
    }
}

/// Fixed-effect prior
pub struct FePrior;

impl Attribute for FePrior {
    type Output = Prior;
    const NAME: &'static str = "fe_prior";

    fn cached(variable: &Variable) -> Option<Self::Output> {
        Some(variable.fe_prior().clone())
    }

    fn build(variable: &mut Variable, _dataset: Option<&Dataset>) -> Result<Self::Output> {
        Ok(variable.fe_prior().clone())
    }
}

/// One-hot random-effect design matrix
pub struct DesignMatrixRe;

impl Attribute for DesignMatrixRe {
    type Output = Array2<f64>;
    const NAME: &'static str = "design_matrix_re";
    const NEEDS_DATA: bool = true;

    fn cached(variable: &Variable) -> Option<Self::Output> {
        variable.cache().design_matrix_re.clone()
    }

    fn build(variable: &mut Variable, dataset: Option<&Dataset>) -> Result<Self::Output> {
        variable.build_design_matrix_re(require_dataset::<Self>(dataset)?)
    }

    fn store(variable: &mut Variable, value: &Self::Output) {
        variable.cache_mut().design_matrix_re = Some(value.clone());
    }
}

/// Random-effect variance bounds
pub struct BoundsReVar;

impl Attribute for BoundsReVar {
    type Output = (Array1<f64>, Array1<f64>);
    const NAME: &'static str = "bounds_re_var";

    fn cached(variable: &Variable) -> Option<Self::Output> {
        variable.cache().bounds_re_var.clone()
    }

    fn build(variable: &mut Variable, _dataset: Option<&Dataset>) -> Result<Self::Output> {
        variable.build_bounds_re_var()
    }

    fn store(variable: &mut Variable, value: &Self::Output) {
        variable.cache_mut().bounds_re_var = Some(value.clone());
    }
}

/// Random-effect variance constraint system
pub struct ConstraintsReVar;

impl Attribute for ConstraintsReVar {
    type Output = LinearConstraints;
    const NAME: &'static str = "constraints_re_var";

    fn cached(variable: &Variable) -> Option<Self::Output> {
        variable.cache().constraints_re_var.clone()
    }

    fn build(variable: &mut Variable, _dataset: Option<&Dataset>) -> Result<Self::Output> {
        variable.build_constraint_matrix_re_var()
    }

    fn store(variable: &mut Variable, value: &Self::Output) {
        variable.cache_mut().constraints_re_var = Some(value.clone());
    }
}

/// Random-effect variance prior
pub struct ReVarPrior;

impl Attribute for ReVarPrior {
    type Output = Prior;
    const NAME: &'static str = "re_var_prior";

    fn cached(variable: &Variable) -> Option<Self::Output> {
        variable.random_effect().map(|re| re.re_var_prior().clone())
    }

    fn build(variable: &mut Variable, _dataset: Option<&Dataset>) -> Result<Self::Output> {
        Err(MixFxError::Configuration(format!(
            "'{}' has no random effect",
            variable.covariate_name()
        )))
    }
}

/// Per-group random-effect bounds
pub struct BoundsRe;

impl Attribute for BoundsRe {
    type Output = (Array1<f64>, Array1<f64>);
    const NAME: &'static str = "bounds_re";

    fn cached(variable: &Variable) -> Option<Self::Output> {
        variable.cache().bounds_re.clone()
    }

    fn build(variable: &mut Variable, _dataset: Option<&Dataset>) -> Result<Self::Output> {
        variable.build_bounds_re()
    }

    fn store(variable: &mut Variable, value: &Self::Output) {
        variable.cache_mut().bounds_re = Some(value.clone());
    }
}

/// Per-group random-effect constraint system
pub struct ConstraintsRe;

impl Attribute for ConstraintsRe {
    type Output = LinearConstraints;
    const NAME: &'static str = "constraints_re";

    fn cached(variable: &Variable) -> Option<Self::Output> {
        variable.cache().constraints_re.clone()
    }

    fn build(variable: &mut Variable, _dataset: Option<&Dataset>) -> Result<Self::Output> {
        variable.build_constraint_matrix_re()
    }

    fn store(variable: &mut Variable, value: &Self::Output) {
        variable.cache_mut().constraints_re = Some(value.clone());
    }
}

/// Prior shared by every per-group coefficient of a variable
pub struct RePrior;

impl Attribute for RePrior {
    type Output = Prior;
    const NAME: &'static str = "re_prior";

    fn cached(variable: &Variable) -> Option<Self::Output> {
        variable.random_effect().map(|re| re.re_prior().clone())
    }

    fn build(variable: &mut Variable, _dataset: Option<&Dataset>) -> Result<Self::Output> {
        Err(MixFxError::Configuration(format!(
            "'{}' has no random effect",
            variable.covariate_name()
        )))
    }
}

/// Number of groups, encoding them from the dataset on first use
pub struct NGroups;

impl Attribute for NGroups {
    type Output = usize;
    const NAME: &'static str = "n_groups";
    const NEEDS_DATA: bool = true;

    fn cached(variable: &Variable) -> Option<Self::Output> {
        variable.n_groups()
    }

    fn build(variable: &mut Variable, dataset: Option<&Dataset>) -> Result<Self::Output> {
        variable.encode_groups(require_dataset::<Self>(dataset)?)?;
        variable.n_groups().ok_or_else(|| {
            MixFxError::Configuration(format!(
                "'{}' has no random effect",
                variable.covariate_name()
            ))
        })
    }
}
