//! Per-variable storage of assembled blocks.

use crate::parameter::constraints::LinearConstraints;
use ndarray::{Array1, Array2};

/// Blocks a variable has already produced.
///
/// Design matrices depend on the dataset and are dropped by
/// [`BlockCache::clear_data`]; bounds and constraints depend only on the
/// variable's configuration and stay cached for the life of the variable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlockCache {
    pub(crate) design_matrix_fe: Option<Array2<f64>>,
    pub(crate) bounds_fe: Option<(Array1<f64>, Array1<f64>)>,
    pub(crate) constraints_fe: Option<LinearConstraints>,

    pub(crate) design_matrix_re: Option<Array2<f64>>,
    pub(crate) bounds_re_var: Option<(Array1<f64>, Array1<f64>)>,
    pub(crate) constraints_re_var: Option<LinearConstraints>,
    pub(crate) bounds_re: Option<(Array1<f64>, Array1<f64>)>,
    pub(crate) constraints_re: Option<LinearConstraints>,
}

impl BlockCache {
    pub fn design_matrix_fe(&self) -> Option<&Array2<f64>> {
        self.design_matrix_fe.as_ref()
    }

    pub fn design_matrix_re(&self) -> Option<&Array2<f64>> {
        self.design_matrix_re.as_ref()
    }

    pub fn constraints_fe(&self) -> Option<&LinearConstraints> {
        self.constraints_fe.as_ref()
    }

    pub fn constraints_re_var(&self) -> Option<&LinearConstraints> {
        self.constraints_re_var.as_ref()
    }

    pub fn constraints_re(&self) -> Option<&LinearConstraints> {
        self.constraints_re.as_ref()
    }

    /// Whether nothing has been cached yet
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Drop every dataset-dependent block.
    pub fn clear_data(&mut self) {
        self.design_matrix_fe = None;
        self.design_matrix_re = None;
    }
}
