//! Variables: one covariate's contribution to the model
//!
//! A [`Variable`] knows how to build its slice of every global object the
//! optimizer needs: its fixed-effect design-matrix columns, bounds, linear
//! constraints and prior and, when it carries a [`RandomEffect`], the same set
//! of blocks for the group-level variance and the per-group coefficients.
//!
//! Builders are pure with respect to the blocks they return; memoisation of
//! those blocks is the job of the block collector, which stores them in the
//! variable's [`BlockCache`]. The one piece of state a builder writes itself
//! is the group encoding, which fixes `n_groups` for the life of the variable.

use crate::data::Dataset;
use crate::error::{MixFxError, Result};
use crate::parameter::cache::BlockCache;
use crate::parameter::constraints::LinearConstraints;
use crate::parameter::link::LinkFunction;
use crate::parameter::prior::Prior;
use crate::parameter::spline::SplineSpec;
use ndarray::{Array1, Array2};
use std::collections::HashMap;

/// Covariate name reported by the intercept
pub const INTERCEPT: &str = "intercept";

/// Where a variable's fixed-effect columns come from
#[derive(Debug, Clone, PartialEq)]
pub enum VariableKind {
    /// A single column of linked covariate values
    Covariate { name: String },

    /// A constant column of ones with no backing dataset column
    Intercept,

    /// A B-spline expansion of a linked covariate
    Spline { name: String, spec: SplineSpec },
}

/// Random-effect facet of a variable, grouped by a categorical column
#[derive(Debug, Clone, PartialEq)]
pub struct RandomEffect {
    col_group: String,
    re_var_prior: Prior,
    re_prior: Prior,
    levels: Option<Vec<String>>,
}

impl RandomEffect {
    /// Create a random effect with one variance parameter.
    ///
    /// `re_var_prior` governs the variance and `re_prior` every per-group
    /// coefficient; both must cover exactly one parameter.
    pub fn new(col_group: &str, re_var_prior: Prior, re_prior: Prior) -> Result<Self> {
        for (what, prior) in [("re_var_prior", &re_var_prior), ("re_prior", &re_prior)] {
            if prior.len() != 1 {
                return Err(MixFxError::Configuration(format!(
                    "{} for group column '{}' must cover 1 parameter, got {}",
                    what,
                    col_group,
                    prior.len()
                )));
            }
        }
        Ok(Self {
            col_group: col_group.to_string(),
            re_var_prior,
            re_prior,
            levels: None,
        })
    }

    pub fn col_group(&self) -> &str {
        &self.col_group
    }

    pub fn re_var_prior(&self) -> &Prior {
        &self.re_var_prior
    }

    pub fn re_prior(&self) -> &Prior {
        &self.re_prior
    }

    /// Distinct group labels in first-occurrence order, once encoded
    pub fn levels(&self) -> Option<&[String]> {
        self.levels.as_deref()
    }

    /// Number of distinct groups, once encoded
    pub fn n_groups(&self) -> Option<usize> {
        self.levels.as_ref().map(Vec::len)
    }

    /// Number of variance parameters
    pub fn num_re_var(&self) -> usize {
        self.re_var_prior.len()
    }

    /// Number of per-group coefficients, once encoded
    pub fn num_re(&self) -> Option<usize> {
        self.n_groups().map(|n| n * self.num_re_var())
    }
}

/// One covariate's contribution to a mixed-effects model
#[derive(Debug, Clone)]
pub struct Variable {
    kind: VariableKind,
    link: LinkFunction,
    fe_prior: Prior,
    random_effect: Option<RandomEffect>,
    cache: BlockCache,
}

impl Variable {
    /// Start building a variable
    ///
    /// # Examples
    ///
    /// ```
    /// use mixfx_rs::parameter::{Prior, Variable};
    ///
    /// let var = Variable::builder()
    ///     .covariate("cov1")
    ///     .fe_prior(Prior::bounded(vec![-2.0], vec![3.0]).unwrap())
    ///     .random_effect(
    ///         "group",
    ///         Prior::gaussian(vec![-1.0], vec![1.0], vec![1.0], vec![2.0]).unwrap(),
    ///         Prior::bounded(vec![-10.0], vec![15.0]).unwrap(),
    ///     )
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(var.num_fe(), 1);
    /// assert_eq!(var.num_re_var(), 1);
    /// assert!(var.n_groups().is_none());
    /// ```
    pub fn builder() -> VariableBuilder {
        VariableBuilder::default()
    }

    /// A plain covariate with the identity link
    pub fn covariate(name: &str, fe_prior: Prior) -> Result<Self> {
        Self::builder().covariate(name).fe_prior(fe_prior).build()
    }

    /// The intercept with an unbounded prior
    pub fn intercept() -> Self {
        Self {
            kind: VariableKind::Intercept,
            link: LinkFunction::identity(),
            fe_prior: Prior::unbounded(1),
            random_effect: None,
            cache: BlockCache::default(),
        }
    }

    /// Name of the backing column, or `"intercept"`
    pub fn covariate_name(&self) -> &str {
        match &self.kind {
            VariableKind::Covariate { name } | VariableKind::Spline { name, .. } => name,
            VariableKind::Intercept => INTERCEPT,
        }
    }

    pub fn kind(&self) -> &VariableKind {
        &self.kind
    }

    pub fn link(&self) -> &LinkFunction {
        &self.link
    }

    pub fn fe_prior(&self) -> &Prior {
        &self.fe_prior
    }

    pub fn random_effect(&self) -> Option<&RandomEffect> {
        self.random_effect.as_ref()
    }

    pub fn has_random_effects(&self) -> bool {
        self.random_effect.is_some()
    }

    pub fn cache(&self) -> &BlockCache {
        &self.cache
    }

    pub(crate) fn cache_mut(&mut self) -> &mut BlockCache {
        &mut self.cache
    }

    /// Drop cached dataset-dependent blocks. The group encoding is kept so
    /// that a later, incompatible dataset is detected.
    pub fn clear_data_blocks(&mut self) {
        self.cache.clear_data();
    }

    /// Number of fixed-effect coefficients
    pub fn num_fe(&self) -> usize {
        match &self.kind {
            VariableKind::Covariate { .. } | VariableKind::Intercept => 1,
            VariableKind::Spline { spec, .. } => spec.num_fe(),
        }
    }

    /// Number of random-effect variance parameters, zero without random effects
    pub fn num_re_var(&self) -> usize {
        self.random_effect.as_ref().map_or(0, RandomEffect::num_re_var)
    }

    pub fn n_groups(&self) -> Option<usize> {
        self.random_effect.as_ref().and_then(RandomEffect::n_groups)
    }

    /// Number of random-effect coefficients: zero without random effects,
    /// `None` while the groups have not been encoded.
    pub fn num_re(&self) -> Option<usize> {
        match &self.random_effect {
            Some(re) => re.num_re(),
            None => Some(0),
        }
    }

    fn require_random_effect(&self, operation: &str) -> Result<&RandomEffect> {
        self.random_effect.as_ref().ok_or_else(|| {
            MixFxError::Configuration(format!(
                "{} requested for '{}', which has no random effect",
                operation,
                self.covariate_name()
            ))
        })
    }

    fn require_n_groups(&self, operation: &str) -> Result<(&RandomEffect, usize)> {
        let re = self.require_random_effect(operation)?;
        let n_groups = re.n_groups().ok_or_else(|| {
            MixFxError::Configuration(format!(
                "{} requested for '{}' before its groups in '{}' were encoded",
                operation,
                self.covariate_name(),
                re.col_group()
            ))
        })?;
        Ok((re, n_groups))
    }

    /// Fixed-effect design matrix, shape `(n_rows, num_fe)`
    pub fn build_design_matrix_fe(&self, dataset: &Dataset) -> Result<Array2<f64>> {
        let n_rows = dataset.n_rows();
        let matrix = match &self.kind {
            VariableKind::Intercept => Array2::ones((n_rows, 1)),
            VariableKind::Covariate { name } => {
                let values = self.link.apply(dataset.numeric(name)?);
                values.insert_axis(ndarray::Axis(1))
            }
            VariableKind::Spline { name, spec } => {
                let values = self.link.apply(dataset.numeric(name)?);
                spec.design_matrix(values.view())?
            }
        };

        if matrix.dim() != (n_rows, self.num_fe()) {
            return Err(MixFxError::Consistency(format!(
                "design matrix for '{}' has shape {:?}, expected ({}, {})",
                self.covariate_name(),
                matrix.dim(),
                n_rows,
                self.num_fe()
            )));
        }
        Ok(matrix)
    }

    /// Map the grouping column to dense codes `0..n_groups` in order of first
    /// occurrence.
    ///
    /// The first call fixes the group levels. Encoding a dataset whose levels
    /// differ from those fails, since every cached random-effect block is
    /// laid out against the levels seen first.
    pub fn encode_groups(&mut self, dataset: &Dataset) -> Result<Vec<usize>> {
        let name = self.covariate_name().to_string();
        let re = self
            .random_effect
            .as_mut()
            .ok_or_else(|| {
                MixFxError::Configuration(format!(
                    "group encoding requested for '{}', which has no random effect",
                    name
                ))
            })?;

        let labels = dataset.categorical(&re.col_group)?;
        let mut index: HashMap<&str, usize> = HashMap::new();
        let mut levels: Vec<String> = Vec::new();
        let codes = labels
            .iter()
            .map(|label| {
                *index.entry(label.as_str()).or_insert_with(|| {
                    levels.push(label.clone());
                    levels.len() - 1
                })
            })
            .collect();

        if levels.is_empty() {
            return Err(MixFxError::Compatibility(format!(
                "group column '{}' of '{}' has no rows, at least one group is required",
                re.col_group, name
            )));
        }

        if let Some(existing) = &re.levels {
            if *existing != levels {
                return Err(MixFxError::Compatibility(format!(
                    "groups of '{}' in column '{}' were encoded as {:?}, the dataset now has {:?}",
                    name, re.col_group, existing, levels
                )));
            }
            return Ok(codes);
        }

        log::trace!(
            "encoded {} groups for '{}' from column '{}'",
            levels.len(),
            name,
            re.col_group
        );
        re.levels = Some(levels);
        Ok(codes)
    }

    /// One-hot random-effect design matrix, shape `(n_rows, n_groups)`
    pub fn build_design_matrix_re(&mut self, dataset: &Dataset) -> Result<Array2<f64>> {
        self.require_random_effect("random-effect design matrix")?;
        let codes = self.encode_groups(dataset)?;
        let n_groups = self.n_groups().unwrap_or(0);

        let mut matrix = Array2::zeros((codes.len(), n_groups));
        for (row, &code) in codes.iter().enumerate() {
            matrix[[row, code]] = 1.0;
        }
        Ok(matrix)
    }

    /// Fixed-effect bounds, each of length `num_fe`
    pub fn build_bounds_fe(&self) -> (Array1<f64>, Array1<f64>) {
        (
            self.fe_prior.lower_bound().clone(),
            self.fe_prior.upper_bound().clone(),
        )
    }

    /// Variance bounds, each of length `num_re_var`
    pub fn build_bounds_re_var(&self) -> Result<(Array1<f64>, Array1<f64>)> {
        let re = self.require_random_effect("variance bounds")?;
        Ok((
            re.re_var_prior.lower_bound().clone(),
            re.re_var_prior.upper_bound().clone(),
        ))
    }

    /// Per-group coefficient bounds: the coefficient prior repeated once per group
    pub fn build_bounds_re(&self) -> Result<(Array1<f64>, Array1<f64>)> {
        let (re, n_groups) = self.require_n_groups("random-effect bounds")?;
        let bounds = re.re_prior.bounds().tile(n_groups);
        Ok((bounds.lower().clone(), bounds.upper().clone()))
    }

    /// Fixed-effect constraints: each coefficient within its prior support,
    /// plus shape rows for restricted splines
    pub fn build_constraint_matrix_fe(&self) -> Result<LinearConstraints> {
        let identity = LinearConstraints::identity(self.fe_prior.bounds());
        match &self.kind {
            VariableKind::Spline { spec, .. } => match spec.shape_constraints()? {
                Some((matrix, lower, upper)) => {
                    identity.stack(LinearConstraints::new(matrix, lower, upper)?)
                }
                None => Ok(identity),
            },
            _ => Ok(identity),
        }
    }

    pub fn build_constraint_matrix_re_var(&self) -> Result<LinearConstraints> {
        let re = self.require_random_effect("variance constraints")?;
        Ok(LinearConstraints::identity(re.re_var_prior.bounds()))
    }

    pub fn build_constraint_matrix_re(&self) -> Result<LinearConstraints> {
        let (re, n_groups) = self.require_n_groups("random-effect constraints")?;
        Ok(LinearConstraints::identity(&re.re_prior.bounds().tile(n_groups)))
    }
}

/// Builder for [`Variable`]
#[derive(Debug, Default)]
pub struct VariableBuilder {
    covariate: Option<String>,
    intercept: bool,
    spline: Option<SplineSpec>,
    link: Option<LinkFunction>,
    fe_prior: Option<Prior>,
    random_effect: Option<(String, Prior, Prior)>,
}

impl VariableBuilder {
    pub fn covariate(mut self, name: &str) -> Self {
        self.covariate = Some(name.to_string());
        self
    }

    /// Make this the intercept; it must not name a covariate
    pub fn intercept(mut self) -> Self {
        self.intercept = true;
        self
    }

    /// Expand the covariate with a B-spline basis
    pub fn spline(mut self, spec: SplineSpec) -> Self {
        self.spline = Some(spec);
        self
    }

    pub fn link(mut self, link: LinkFunction) -> Self {
        self.link = Some(link);
        self
    }

    pub fn fe_prior(mut self, prior: Prior) -> Self {
        self.fe_prior = Some(prior);
        self
    }

    /// Add a random effect grouped by `col_group`
    pub fn random_effect(mut self, col_group: &str, re_var_prior: Prior, re_prior: Prior) -> Self {
        self.random_effect = Some((col_group.to_string(), re_var_prior, re_prior));
        self
    }

    pub fn build(self) -> Result<Variable> {
        let kind = match (self.intercept, self.covariate, self.spline) {
            (true, Some(name), _) => {
                return Err(MixFxError::Configuration(format!(
                    "the intercept has no backing column, got covariate '{}'",
                    name
                )))
            }
            (true, None, Some(_)) => {
                return Err(MixFxError::Configuration(
                    "the intercept cannot be expanded as a spline".to_string(),
                ))
            }
            (true, None, None) => VariableKind::Intercept,
            (false, None, _) => {
                return Err(MixFxError::Configuration(
                    "a covariate name is required".to_string(),
                ))
            }
            (false, Some(name), None) => VariableKind::Covariate { name },
            (false, Some(name), Some(spec)) => {
                spec.validate()?;
                VariableKind::Spline { name, spec }
            }
        };

        let num_fe = match &kind {
            VariableKind::Spline { spec, .. } => spec.num_fe(),
            _ => 1,
        };
        let fe_prior = self.fe_prior.unwrap_or_else(|| Prior::unbounded(num_fe));
        if fe_prior.len() != num_fe {
            return Err(MixFxError::Configuration(format!(
                "fe_prior covers {} coefficients, but the variable has {}",
                fe_prior.len(),
                num_fe
            )));
        }

        let random_effect = self
            .random_effect
            .map(|(col_group, re_var_prior, re_prior)| {
                RandomEffect::new(&col_group, re_var_prior, re_prior)
            })
            .transpose()?;

        Ok(Variable {
            kind,
            link: self.link.unwrap_or_default(),
            fe_prior,
            random_effect,
            cache: BlockCache::default(),
        })
    }
}
