//! B-spline covariates
//!
//! A spline variable expands one covariate into several basis columns, so it
//! owns more than one fixed-effect coefficient. Shape restrictions
//! (monotonicity, convexity) are expressed as difference rows appended to the
//! identity constraint, which gives a non-square linear constraint system.

use ndarray::{s, Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};
use std::f64::{INFINITY, NEG_INFINITY};
use thiserror::Error;

/// Errors for spline configuration and evaluation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SplineError {
    #[error("Spline degree must be at least 1, but was {0}")]
    InvalidDegree(usize),

    #[error("Data range is invalid: start ({0}) must be less than end ({1})")]
    InvalidRange(f64, f64),

    #[error("Difference order ({order}) must be positive and less than the number of coefficients ({num_coefficients})")]
    InvalidDifferenceOrder {
        order: usize,
        num_coefficients: usize,
    },

    #[error("Cannot place knots without data")]
    EmptyData,

    #[error("A degree-{degree} basis needs at least {required} knots, got {knots}")]
    TooFewKnots {
        degree: usize,
        required: usize,
        knots: usize,
    },
}

/// Shape restriction imposed on the spline coefficients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplineShape {
    #[default]
    None,
    Increasing,
    Decreasing,
    Convex,
    Concave,
}

impl SplineShape {
    /// Difference order and whether the differences are bounded below by zero
    fn difference(&self) -> Option<(usize, bool)> {
        match self {
            Self::None => None,
            Self::Increasing => Some((1, true)),
            Self::Decreasing => Some((1, false)),
            Self::Convex => Some((2, true)),
            Self::Concave => Some((2, false)),
        }
    }
}

/// Configuration of a B-spline expansion with uniformly placed knots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplineSpec {
    /// Number of knots strictly inside the data range
    pub num_internal_knots: usize,

    /// Polynomial degree, 3 for cubic
    pub degree: usize,

    /// Shape restriction on the coefficients
    #[serde(default)]
    pub shape: SplineShape,

    /// Keep the first basis column. The full basis sums to one on every row
    /// and is collinear with an intercept, so it is dropped by default.
    #[serde(default)]
    pub include_intercept: bool,
}

impl SplineSpec {
    pub fn new(num_internal_knots: usize, degree: usize) -> Result<Self, SplineError> {
        if degree < 1 {
            return Err(SplineError::InvalidDegree(degree));
        }
        Ok(Self {
            num_internal_knots,
            degree,
            shape: SplineShape::None,
            include_intercept: false,
        })
    }

    pub fn with_shape(mut self, shape: SplineShape) -> Self {
        self.shape = shape;
        self
    }

    pub fn with_intercept(mut self, include_intercept: bool) -> Self {
        self.include_intercept = include_intercept;
        self
    }

    /// Number of functions in the full basis
    pub fn num_basis(&self) -> usize {
        self.num_internal_knots + self.degree + 1
    }

    /// Number of design-matrix columns, and so of coefficients
    pub fn num_fe(&self) -> usize {
        if self.include_intercept {
            self.num_basis()
        } else {
            self.num_basis() - 1
        }
    }

    /// Check that the shape restriction fits the number of coefficients.
    pub fn validate(&self) -> Result<(), SplineError> {
        if self.degree < 1 {
            return Err(SplineError::InvalidDegree(self.degree));
        }
        if let Some((order, _)) = self.shape.difference() {
            if order >= self.num_fe() {
                return Err(SplineError::InvalidDifferenceOrder {
                    order,
                    num_coefficients: self.num_fe(),
                });
            }
        }
        Ok(())
    }

    /// Clamped knot vector over the range of `values`
    pub fn knots(&self, values: ArrayView1<f64>) -> Result<Array1<f64>, SplineError> {
        if values.is_empty() {
            return Err(SplineError::EmptyData);
        }
        let min = values.fold(INFINITY, |acc, &v| acc.min(v));
        let max = values.fold(NEG_INFINITY, |acc, &v| acc.max(v));
        if !(min < max) {
            return Err(SplineError::InvalidRange(min, max));
        }

        let h = (max - min) / (self.num_internal_knots as f64 + 1.0);
        let knots = std::iter::repeat(min)
            .take(self.degree + 1)
            .chain((1..=self.num_internal_knots).map(|i| min + i as f64 * h))
            .chain(std::iter::repeat(max).take(self.degree + 1))
            .collect();
        Ok(knots)
    }

    /// Design matrix with `num_fe()` columns
    pub fn design_matrix(&self, values: ArrayView1<f64>) -> Result<Array2<f64>, SplineError> {
        let knots = self.knots(values)?;
        let basis = bspline_basis(values, knots.view(), self.degree)?;
        if self.include_intercept {
            Ok(basis)
        } else {
            Ok(basis.slice(s![.., 1..]).to_owned())
        }
    }

    /// Difference rows enforcing the shape, with their lower and upper bounds
    #[allow(clippy::type_complexity)]
    pub fn shape_constraints(
        &self,
    ) -> Result<Option<(Array2<f64>, Array1<f64>, Array1<f64>)>, SplineError> {
        let Some((order, nonnegative)) = self.shape.difference() else {
            return Ok(None);
        };
        let matrix = difference_matrix(self.num_fe(), order)?;
        let rows = matrix.nrows();
        let (lower, upper) = if nonnegative {
            (Array1::zeros(rows), Array1::from_elem(rows, INFINITY))
        } else {
            (Array1::from_elem(rows, NEG_INFINITY), Array1::zeros(rows))
        };
        Ok(Some((matrix, lower, upper)))
    }
}

/// Evaluate every B-spline basis function at each value.
///
/// `knots` must be clamped (degree + 1 repeated boundary knots). Values outside
/// the boundary knots are clamped onto them. At least `2 * (degree + 1)` knots
/// are required.
pub fn bspline_basis(
    values: ArrayView1<f64>,
    knots: ArrayView1<f64>,
    degree: usize,
) -> Result<Array2<f64>, SplineError> {
    let required = 2 * (degree + 1);
    if knots.len() < required {
        return Err(SplineError::TooFewKnots {
            degree,
            required,
            knots: knots.len(),
        });
    }
    let num_basis = knots.len() - degree - 1;
    let lo = knots[degree];
    let hi = knots[num_basis];
    let mut basis = Array2::zeros((values.len(), num_basis));

    let mut left = vec![0.0; degree + 1];
    let mut right = vec![0.0; degree + 1];
    let mut n = vec![0.0; degree + 1];

    for (row, &raw) in values.iter().enumerate() {
        let x = raw.clamp(lo, hi);
        let span = find_span(x, knots, degree, num_basis);

        // Cox-de Boor, triangular scheme over the non-zero functions
        n[0] = 1.0;
        for j in 1..=degree {
            left[j] = x - knots[span + 1 - j];
            right[j] = knots[span + j] - x;
            let mut saved = 0.0;
            for r in 0..j {
                let temp = n[r] / (right[r + 1] + left[j - r]);
                n[r] = saved + right[r + 1] * temp;
                saved = left[j - r] * temp;
            }
            n[j] = saved;
        }

        for (k, &value) in n.iter().enumerate() {
            basis[[row, span - degree + k]] = value;
        }
    }

    Ok(basis)
}

/// Index `i` of the knot interval `[knots[i], knots[i+1])` containing `x`
fn find_span(x: f64, knots: ArrayView1<f64>, degree: usize, num_basis: usize) -> usize {
    if x >= knots[num_basis] {
        return num_basis - 1;
    }
    (degree..num_basis)
        .rev()
        .find(|&i| knots[i] <= x)
        .unwrap_or(degree)
}

/// Matrix of `order`-th differences, shape `(n - order) x n`.
pub fn difference_matrix(n: usize, order: usize) -> Result<Array2<f64>, SplineError> {
    if order == 0 || order >= n {
        return Err(SplineError::InvalidDifferenceOrder {
            order,
            num_coefficients: n,
        });
    }

    let mut d = Array2::<f64>::eye(n);
    for _ in 0..order {
        d = &d.slice(s![1.., ..]) - &d.slice(s![..-1, ..]);
    }
    Ok(d)
}
