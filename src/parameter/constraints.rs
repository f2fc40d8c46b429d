//! Linear constraint systems and block combination
//!
//! Each variable contributes a small system `lb <= C x <= ub` over its own
//! coefficients. Because variables own disjoint coefficient ranges, the global
//! system is the block-diagonal combination of the per-variable systems with
//! the bound vectors concatenated in the same order.

use crate::error::{MixFxError, Result};
use crate::parameter::prior::PriorBounds;
use ndarray::{concatenate, s, Array1, Array2, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

/// A linear constraint system `lower_bound <= matrix * x <= upper_bound`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ConstraintsRepr")]
pub struct LinearConstraints {
    matrix: Array2<f64>,
    lower_bound: Array1<f64>,
    upper_bound: Array1<f64>,
}

#[derive(Deserialize)]
struct ConstraintsRepr {
    matrix: Array2<f64>,
    lower_bound: Array1<f64>,
    upper_bound: Array1<f64>,
}

impl TryFrom<ConstraintsRepr> for LinearConstraints {
    type Error = MixFxError;

    fn try_from(repr: ConstraintsRepr) -> Result<Self> {
        Self::new(repr.matrix, repr.lower_bound, repr.upper_bound)
    }
}

impl LinearConstraints {
    /// Create a constraint system, checking that both bound vectors have one
    /// entry per matrix row.
    pub fn new(
        matrix: Array2<f64>,
        lower_bound: Array1<f64>,
        upper_bound: Array1<f64>,
    ) -> Result<Self> {
        if lower_bound.len() != matrix.nrows() || upper_bound.len() != matrix.nrows() {
            return Err(MixFxError::Consistency(format!(
                "constraint bounds must have one entry per row: matrix has {} rows, lower bound {} entries, upper bound {} entries",
                matrix.nrows(),
                lower_bound.len(),
                upper_bound.len()
            )));
        }
        Ok(Self {
            matrix,
            lower_bound,
            upper_bound,
        })
    }

    /// Constrain each coefficient to its own prior support.
    ///
    /// # Examples
    ///
    /// ```
    /// use mixfx_rs::parameter::{LinearConstraints, Prior};
    ///
    /// let prior = Prior::bounded(vec![-2.0], vec![3.0]).unwrap();
    /// let constraints = LinearConstraints::identity(prior.bounds());
    /// assert_eq!(constraints.matrix()[[0, 0]], 1.0);
    /// assert_eq!(constraints.lower_bound()[0], -2.0);
    /// assert_eq!(constraints.upper_bound()[0], 3.0);
    /// ```
    pub fn identity(bounds: &PriorBounds) -> Self {
        Self {
            matrix: Array2::eye(bounds.len()),
            lower_bound: bounds.lower().clone(),
            upper_bound: bounds.upper().clone(),
        }
    }

    /// A system with no rows over `ncols` coefficients
    pub fn empty(ncols: usize) -> Self {
        Self {
            matrix: Array2::zeros((0, ncols)),
            lower_bound: Array1::zeros(0),
            upper_bound: Array1::zeros(0),
        }
    }

    pub fn matrix(&self) -> &Array2<f64> {
        &self.matrix
    }

    pub fn lower_bound(&self) -> &Array1<f64> {
        &self.lower_bound
    }

    pub fn upper_bound(&self) -> &Array1<f64> {
        &self.upper_bound
    }

    /// Number of constraint rows
    pub fn nrows(&self) -> usize {
        self.matrix.nrows()
    }

    /// Number of coefficients constrained
    pub fn ncols(&self) -> usize {
        self.matrix.ncols()
    }

    /// Append the rows of another system over the same coefficients.
    pub fn stack(self, other: LinearConstraints) -> Result<Self> {
        if self.ncols() != other.ncols() {
            return Err(MixFxError::Consistency(format!(
                "cannot stack constraints over {} coefficients onto constraints over {}",
                other.ncols(),
                self.ncols()
            )));
        }
        let matrix = concatenate(Axis(0), &[self.matrix.view(), other.matrix.view()])
            .map_err(|e| MixFxError::Consistency(e.to_string()))?;
        Ok(Self {
            matrix,
            lower_bound: concat_vectors(&[self.lower_bound, other.lower_bound]),
            upper_bound: concat_vectors(&[self.upper_bound, other.upper_bound]),
        })
    }

    pub fn into_parts(self) -> (Array2<f64>, Array1<f64>, Array1<f64>) {
        (self.matrix, self.lower_bound, self.upper_bound)
    }
}

/// Combine per-variable constraint systems into one block-diagonal system.
///
/// Row and column counts of the result are the sums over the blocks, entries
/// outside the blocks are zero, and bounds are concatenated in block order.
/// No blocks gives an empty `0 x 0` system.
pub fn combine_constraints(blocks: &[LinearConstraints]) -> LinearConstraints {
    let nrows: usize = blocks.iter().map(LinearConstraints::nrows).sum();
    let ncols: usize = blocks.iter().map(LinearConstraints::ncols).sum();

    let mut matrix = Array2::zeros((nrows, ncols));
    let (mut row, mut col) = (0, 0);
    for block in blocks {
        let (r, c) = block.matrix.dim();
        matrix
            .slice_mut(s![row..row + r, col..col + c])
            .assign(&block.matrix);
        row += r;
        col += c;
    }

    let lower: Vec<ArrayView1<f64>> = blocks.iter().map(|b| b.lower_bound.view()).collect();
    let upper: Vec<ArrayView1<f64>> = blocks.iter().map(|b| b.upper_bound.view()).collect();

    LinearConstraints {
        matrix,
        lower_bound: concat_views(&lower),
        upper_bound: concat_views(&upper),
    }
}

/// Horizontally stack design-matrix blocks that share `nrows` rows.
///
/// An empty block list gives an `nrows x 0` matrix.
pub fn hstack(blocks: &[Array2<f64>], nrows: usize) -> Result<Array2<f64>> {
    if let Some((i, block)) = blocks.iter().enumerate().find(|(_, b)| b.nrows() != nrows) {
        return Err(MixFxError::Consistency(format!(
            "design matrix block {} has {} rows, expected {}",
            i,
            block.nrows(),
            nrows
        )));
    }
    if blocks.is_empty() {
        return Ok(Array2::zeros((nrows, 0)));
    }
    let views: Vec<ArrayView2<f64>> = blocks.iter().map(Array2::view).collect();
    concatenate(Axis(1), &views).map_err(|e| MixFxError::Consistency(e.to_string()))
}

/// Concatenate vectors end to end.
pub fn concat_vectors(blocks: &[Array1<f64>]) -> Array1<f64> {
    let views: Vec<ArrayView1<f64>> = blocks.iter().map(Array1::view).collect();
    concat_views(&views)
}

fn concat_views(views: &[ArrayView1<f64>]) -> Array1<f64> {
    views.iter().flat_map(|v| v.iter().copied()).collect()
}

/// Map each variance parameter to the random-effect coefficients it governs.
///
/// Row block `i` has `group_counts[i]` rows, each with a single one in column
/// `i`, giving shape `(sum(group_counts), group_counts.len())`.
pub fn padding_matrix(group_counts: &[usize]) -> Array2<f64> {
    let nrows: usize = group_counts.iter().sum();
    let mut padding = Array2::zeros((nrows, group_counts.len()));
    let mut row = 0;
    for (col, &count) in group_counts.iter().enumerate() {
        padding.slice_mut(s![row..row + count, col]).fill(1.0);
        row += count;
    }
    padding
}
