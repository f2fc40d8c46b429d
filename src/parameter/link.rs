//! Link functions applied to raw covariate values before they enter a design matrix.

use ndarray::{Array1, ArrayView1};
use std::fmt;
use std::sync::Arc;

/// An element-wise transform of covariate values.
///
/// The transform is an opaque callable; the assembly engine only ever maps it
/// over a column.
#[derive(Clone)]
pub struct LinkFunction {
    name: String,
    func: Arc<dyn Fn(f64) -> f64 + Send + Sync>,
}

impl LinkFunction {
    /// Wrap an arbitrary function under a descriptive name
    ///
    /// # Examples
    ///
    /// ```
    /// use mixfx_rs::parameter::LinkFunction;
    ///
    /// let square = LinkFunction::new("square", |x| x * x);
    /// assert_eq!(square.name(), "square");
    /// assert_eq!(square.eval(3.0), 9.0);
    /// ```
    pub fn new<F>(name: &str, func: F) -> Self
    where
        F: Fn(f64) -> f64 + Send + Sync + 'static,
    {
        Self {
            name: name.to_string(),
            func: Arc::new(func),
        }
    }

    pub fn identity() -> Self {
        Self::new("identity", |x| x)
    }

    pub fn exp() -> Self {
        Self::new("exp", f64::exp)
    }

    pub fn log() -> Self {
        Self::new("log", f64::ln)
    }

    /// Logistic function 1 / (1 + e^-x)
    pub fn expit() -> Self {
        Self::new("expit", |x| 1.0 / (1.0 + (-x).exp()))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn eval(&self, x: f64) -> f64 {
        (self.func)(x)
    }

    /// Apply the link to every value of a column
    pub fn apply(&self, values: ArrayView1<f64>) -> Array1<f64> {
        values.mapv(|x| (self.func)(x))
    }
}

impl Default for LinkFunction {
    fn default() -> Self {
        Self::identity()
    }
}

impl fmt::Debug for LinkFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("LinkFunction").field(&self.name).finish()
    }
}
