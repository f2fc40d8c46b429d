//! Parameter set implementation
//!
//! A [`ParameterSet`] owns an ordered list of variables and, once processed,
//! the global objects assembled from their blocks. Variable order fixes the
//! column order of every combined matrix.

use crate::parameter::constraints::LinearConstraints;
use crate::parameter::prior::Prior;
use crate::parameter::variable::Variable;
use ndarray::{Array1, Array2};

/// Assembled fixed-effect (beta) objects
#[derive(Debug, Clone, PartialEq)]
pub struct FixedEffectBlocks {
    /// Shape `(n_rows, num_fe)`
    pub design_matrix: Array2<f64>,
    pub lower_bound: Array1<f64>,
    pub upper_bound: Array1<f64>,
    /// Block-diagonal over `num_fe` columns
    pub constraints: LinearConstraints,
    /// One prior per variable
    pub priors: Vec<Prior>,
}

/// Assembled random-effect objects, for either the variances (gamma) or the
/// per-group coefficients (u)
#[derive(Debug, Clone, PartialEq)]
pub struct RandomEffectBlocks {
    pub lower_bound: Array1<f64>,
    pub upper_bound: Array1<f64>,
    pub constraints: LinearConstraints,
    /// One prior per variance parameter, or one per group coefficient
    pub priors: Vec<Prior>,
}

/// An ordered collection of variables and the objects assembled from them
#[derive(Debug, Clone, Default)]
pub struct ParameterSet {
    variables: Vec<Variable>,
    pub(crate) fixed_effects: Option<FixedEffectBlocks>,
    pub(crate) re_variances: Option<RandomEffectBlocks>,
    pub(crate) random_effects: Option<RandomEffectBlocks>,
    pub(crate) design_matrix_re: Option<Array2<f64>>,
    pub(crate) re_var_padding: Option<Array2<f64>>,
}

impl ParameterSet {
    /// Create a parameter set from variables in declaration order
    ///
    /// # Examples
    ///
    /// ```
    /// use mixfx_rs::parameter::{ParameterSet, Prior, Variable};
    ///
    /// let set = ParameterSet::new(vec![
    ///     Variable::intercept(),
    ///     Variable::covariate("age", Prior::unbounded(1)).unwrap(),
    /// ]);
    /// assert_eq!(set.len(), 2);
    /// assert_eq!(set.num_fe(), 2);
    /// assert_eq!(set.num_re_var(), 0);
    /// assert!(set.fixed_effects().is_none());
    /// ```
    pub fn new(variables: Vec<Variable>) -> Self {
        Self {
            variables,
            ..Self::default()
        }
    }

    /// Append a variable. Combined state is cleared since it no longer covers
    /// every variable.
    pub fn push(&mut self, variable: Variable) {
        self.variables.push(variable);
        self.reset();
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub(crate) fn variables_mut(&mut self) -> &mut [Variable] {
        &mut self.variables
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Total number of fixed-effect coefficients
    pub fn num_fe(&self) -> usize {
        self.variables.iter().map(Variable::num_fe).sum()
    }

    /// Total number of random-effect variance parameters
    pub fn num_re_var(&self) -> usize {
        self.variables.iter().map(Variable::num_re_var).sum()
    }

    /// Total number of random-effect coefficients, `None` while any
    /// random-effect variable has not encoded its groups
    pub fn num_re(&self) -> Option<usize> {
        self.variables.iter().map(Variable::num_re).sum()
    }

    pub fn has_random_effects(&self) -> bool {
        self.variables.iter().any(Variable::has_random_effects)
    }

    /// Clear all combined state and every variable's dataset-dependent blocks.
    pub fn reset(&mut self) {
        self.fixed_effects = None;
        self.re_variances = None;
        self.random_effects = None;
        self.design_matrix_re = None;
        self.re_var_padding = None;
        for variable in &mut self.variables {
            variable.clear_data_blocks();
        }
    }

    pub fn is_processed_for_betas(&self) -> bool {
        self.fixed_effects.is_some()
    }

    pub fn is_processed_for_gammas(&self) -> bool {
        self.re_variances.is_some()
    }

    pub fn is_processed_for_us(&self) -> bool {
        self.random_effects.is_some()
    }

    pub fn fixed_effects(&self) -> Option<&FixedEffectBlocks> {
        self.fixed_effects.as_ref()
    }

    /// Variance (gamma) blocks
    pub fn re_variances(&self) -> Option<&RandomEffectBlocks> {
        self.re_variances.as_ref()
    }

    /// Per-group coefficient (u) blocks
    pub fn random_effects(&self) -> Option<&RandomEffectBlocks> {
        self.random_effects.as_ref()
    }

    pub fn design_matrix_fe(&self) -> Option<&Array2<f64>> {
        self.fixed_effects.as_ref().map(|fe| &fe.design_matrix)
    }

    /// One-hot random-effect design matrix, shape `(n_rows, num_re)`
    pub fn design_matrix_re(&self) -> Option<&Array2<f64>> {
        self.design_matrix_re.as_ref()
    }

    /// Shape `(num_re, num_re_var)`
    pub fn re_var_padding(&self) -> Option<&Array2<f64>> {
        self.re_var_padding.as_ref()
    }

    pub fn lb_fe(&self) -> Option<&Array1<f64>> {
        self.fixed_effects.as_ref().map(|b| &b.lower_bound)
    }

    pub fn ub_fe(&self) -> Option<&Array1<f64>> {
        self.fixed_effects.as_ref().map(|b| &b.upper_bound)
    }

    pub fn constraints_fe(&self) -> Option<&LinearConstraints> {
        self.fixed_effects.as_ref().map(|b| &b.constraints)
    }

    pub fn fe_priors(&self) -> Option<&[Prior]> {
        self.fixed_effects.as_ref().map(|b| b.priors.as_slice())
    }

    pub fn lb_re_var(&self) -> Option<&Array1<f64>> {
        self.re_variances.as_ref().map(|b| &b.lower_bound)
    }

    pub fn ub_re_var(&self) -> Option<&Array1<f64>> {
        self.re_variances.as_ref().map(|b| &b.upper_bound)
    }

    pub fn constraints_re_var(&self) -> Option<&LinearConstraints> {
        self.re_variances.as_ref().map(|b| &b.constraints)
    }

    pub fn re_var_priors(&self) -> Option<&[Prior]> {
        self.re_variances.as_ref().map(|b| b.priors.as_slice())
    }

    pub fn lb_re(&self) -> Option<&Array1<f64>> {
        self.random_effects.as_ref().map(|b| &b.lower_bound)
    }

    pub fn ub_re(&self) -> Option<&Array1<f64>> {
        self.random_effects.as_ref().map(|b| &b.upper_bound)
    }

    pub fn constraints_re(&self) -> Option<&LinearConstraints> {
        self.random_effects.as_ref().map(|b| &b.constraints)
    }

    pub fn re_priors(&self) -> Option<&[Prior]> {
        self.random_effects.as_ref().map(|b| b.priors.as_slice())
    }
}

impl FromIterator<Variable> for ParameterSet {
    fn from_iter<I: IntoIterator<Item = Variable>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
