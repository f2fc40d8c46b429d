//! Prior specifications
//!
//! A prior carries lower/upper bound vectors for a block of coefficients and,
//! for Gaussian priors, a mean and standard deviation per coefficient. Only the
//! shape of a prior matters for assembly; evaluating densities is left to the
//! model-fitting code that consumes the assembled blocks.

use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::f64::{INFINITY, NEG_INFINITY};
use thiserror::Error;

/// Errors that can occur when constructing priors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PriorError {
    #[error("Prior must describe at least one coefficient")]
    Empty,

    #[error("Length of {what} ({actual}) does not match the lower bound length ({expected})")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid bounds at index {index}: lower ({lower}) must not exceed upper ({upper})")]
    InvalidBounds { index: usize, lower: f64, upper: f64 },

    #[error("Standard deviation at index {index} must be positive, got {value}")]
    NonPositiveStd { index: usize, value: f64 },
}

/// Element-wise lower and upper bounds of a coefficient block
#[derive(Debug, Clone, PartialEq)]
pub struct PriorBounds {
    lower: Array1<f64>,
    upper: Array1<f64>,
}

impl Serialize for PriorBounds {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;

        // JSON has no infinities: an open side is written as null
        let lower: Vec<Option<f64>> = self
            .lower
            .iter()
            .map(|&v| (v != NEG_INFINITY).then_some(v))
            .collect();
        let upper: Vec<Option<f64>> = self
            .upper
            .iter()
            .map(|&v| (v != INFINITY).then_some(v))
            .collect();

        let mut state = serializer.serialize_struct("PriorBounds", 2)?;
        state.serialize_field("lower_bound", &lower)?;
        state.serialize_field("upper_bound", &upper)?;
        state.end()
    }
}

impl<'de> Deserialize<'de> for PriorBounds {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct BoundsHelper {
            lower_bound: Vec<Option<f64>>,
            upper_bound: Vec<Option<f64>>,
        }

        let helper = BoundsHelper::deserialize(deserializer)?;
        let lower = helper
            .lower_bound
            .into_iter()
            .map(|v| v.unwrap_or(NEG_INFINITY))
            .collect();
        let upper = helper
            .upper_bound
            .into_iter()
            .map(|v| v.unwrap_or(INFINITY))
            .collect();

        PriorBounds::new(lower, upper).map_err(serde::de::Error::custom)
    }
}

impl PriorBounds {
    /// Create bounds from lower and upper vectors of equal, non-zero length
    /// with `lower[i] <= upper[i]`.
    pub fn new(lower: Vec<f64>, upper: Vec<f64>) -> Result<Self, PriorError> {
        if lower.is_empty() {
            return Err(PriorError::Empty);
        }
        if lower.len() != upper.len() {
            return Err(PriorError::LengthMismatch {
                what: "upper_bound",
                expected: lower.len(),
                actual: upper.len(),
            });
        }
        if let Some((index, (&lo, &up))) = lower
            .iter()
            .zip(upper.iter())
            .enumerate()
            .find(|(_, (lo, up))| lo > up)
        {
            return Err(PriorError::InvalidBounds {
                index,
                lower: lo,
                upper: up,
            });
        }

        Ok(Self {
            lower: Array1::from_vec(lower),
            upper: Array1::from_vec(upper),
        })
    }

    /// Bounds from negative to positive infinity for `len` coefficients.
    pub fn unbounded(len: usize) -> Self {
        Self {
            lower: Array1::from_elem(len, NEG_INFINITY),
            upper: Array1::from_elem(len, INFINITY),
        }
    }

    pub fn len(&self) -> usize {
        self.lower.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lower.is_empty()
    }

    pub fn lower(&self) -> &Array1<f64> {
        &self.lower
    }

    pub fn upper(&self) -> &Array1<f64> {
        &self.upper
    }

    /// Concatenate `times` copies of these bounds.
    pub fn tile(&self, times: usize) -> Self {
        let tile = |v: &Array1<f64>| -> Array1<f64> {
            v.iter().copied().cycle().take(v.len() * times).collect()
        };
        Self {
            lower: tile(&self.lower),
            upper: tile(&self.upper),
        }
    }
}

/// Prior over a block of coefficients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", try_from = "PriorRepr")]
pub enum Prior {
    /// Support bounds only
    Bounded { bounds: PriorBounds },

    /// Support bounds together with a Gaussian mean and standard deviation
    Gaussian {
        bounds: PriorBounds,
        mean: Array1<f64>,
        std: Array1<f64>,
    },
}

/// Serialized form of [`Prior`], checked by the constructors on the way in
#[derive(Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum PriorRepr {
    Bounded {
        bounds: PriorBounds,
    },
    Gaussian {
        bounds: PriorBounds,
        mean: Array1<f64>,
        std: Array1<f64>,
    },
}

impl TryFrom<PriorRepr> for Prior {
    type Error = PriorError;

    fn try_from(repr: PriorRepr) -> Result<Self, Self::Error> {
        match repr {
            PriorRepr::Bounded { bounds } => Ok(Self::Bounded { bounds }),
            PriorRepr::Gaussian { bounds, mean, std } => {
                Self::with_moments(bounds, mean.to_vec(), std.to_vec())
            }
        }
    }
}

impl Prior {
    /// Create a bounds-only prior
    ///
    /// # Examples
    ///
    /// ```
    /// use mixfx_rs::parameter::Prior;
    ///
    /// let prior = Prior::bounded(vec![-2.0], vec![3.0]).unwrap();
    /// assert_eq!(prior.len(), 1);
    /// assert_eq!(prior.lower_bound()[0], -2.0);
    /// assert!(prior.mean().is_none());
    /// ```
    pub fn bounded(lower_bound: Vec<f64>, upper_bound: Vec<f64>) -> Result<Self, PriorError> {
        Ok(Self::Bounded {
            bounds: PriorBounds::new(lower_bound, upper_bound)?,
        })
    }

    /// Serialize the prior to pretty-printed JSON; open bounds become `null`
    pub fn to_json(&self) -> crate::error::Result<String> {
        let json = serde_json::to_string_pretty(self)?;
        Ok(json)
    }

    /// Load a prior from JSON, applying the same checks as the constructors
    pub fn from_json(json: &str) -> crate::error::Result<Self> {
        let prior = serde_json::from_str(json)?;
        Ok(prior)
    }

    /// Create a Gaussian prior with support bounds
    pub fn gaussian(
        lower_bound: Vec<f64>,
        upper_bound: Vec<f64>,
        mean: Vec<f64>,
        std: Vec<f64>,
    ) -> Result<Self, PriorError> {
        Self::with_moments(PriorBounds::new(lower_bound, upper_bound)?, mean, std)
    }

    fn with_moments(
        bounds: PriorBounds,
        mean: Vec<f64>,
        std: Vec<f64>,
    ) -> Result<Self, PriorError> {
        for (what, values) in [("mean", &mean), ("std", &std)] {
            if values.len() != bounds.len() {
                return Err(PriorError::LengthMismatch {
                    what,
                    expected: bounds.len(),
                    actual: values.len(),
                });
            }
        }
        if let Some((index, &value)) = std.iter().enumerate().find(|(_, &s)| !(s > 0.0)) {
            return Err(PriorError::NonPositiveStd { index, value });
        }

        Ok(Self::Gaussian {
            bounds,
            mean: Array1::from_vec(mean),
            std: Array1::from_vec(std),
        })
    }

    /// A Gaussian prior with unbounded support
    pub fn gaussian_unbounded(mean: Vec<f64>, std: Vec<f64>) -> Result<Self, PriorError> {
        let n = mean.len();
        Self::gaussian(vec![NEG_INFINITY; n], vec![INFINITY; n], mean, std)
    }

    /// A bounds-only prior with unbounded support for `len` coefficients
    pub fn unbounded(len: usize) -> Self {
        Self::Bounded {
            bounds: PriorBounds::unbounded(len),
        }
    }

    pub fn bounds(&self) -> &PriorBounds {
        match self {
            Self::Bounded { bounds } | Self::Gaussian { bounds, .. } => bounds,
        }
    }

    /// Number of coefficients the prior covers
    pub fn len(&self) -> usize {
        self.bounds().len()
    }

    pub fn is_empty(&self) -> bool {
        self.bounds().is_empty()
    }

    pub fn lower_bound(&self) -> &Array1<f64> {
        self.bounds().lower()
    }

    pub fn upper_bound(&self) -> &Array1<f64> {
        self.bounds().upper()
    }

    pub fn mean(&self) -> Option<&Array1<f64>> {
        match self {
            Self::Gaussian { mean, .. } => Some(mean),
            Self::Bounded { .. } => None,
        }
    }

    pub fn std(&self) -> Option<&Array1<f64>> {
        match self {
            Self::Gaussian { std, .. } => Some(std),
            Self::Bounded { .. } => None,
        }
    }
}
