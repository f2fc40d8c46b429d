//! Column-role declarations for a dataset.
//!
//! A [`DataSpecs`] names the observation column, its standard-error column and
//! any grouping columns. It is checked against a [`Dataset`] before processing
//! so that missing columns are reported up front instead of deep inside the
//! assembly pipeline.

use crate::data::Dataset;
use crate::error::{MixFxError, Result};
use serde::{Deserialize, Serialize};

/// Declares which dataset columns play which role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSpecs {
    /// Observed response column
    pub col_obs: String,

    /// Standard error of the observations
    pub col_obs_se: String,

    /// Grouping columns, possibly empty
    #[serde(default)]
    pub col_groups: Vec<String>,
}

impl DataSpecs {
    /// Create specs without grouping columns.
    pub fn new(col_obs: &str, col_obs_se: &str) -> Self {
        Self {
            col_obs: col_obs.to_string(),
            col_obs_se: col_obs_se.to_string(),
            col_groups: Vec::new(),
        }
    }

    /// Add grouping columns.
    pub fn with_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.col_groups.extend(groups.into_iter().map(Into::into));
        self
    }

    /// Every declared column, in declaration order.
    pub fn columns(&self) -> Vec<&str> {
        let mut cols = vec![self.col_obs.as_str(), self.col_obs_se.as_str()];
        cols.extend(self.col_groups.iter().map(String::as_str));
        cols
    }

    /// Names of the roles this spec fills.
    fn roles(&self) -> Vec<&'static str> {
        let mut roles = vec!["obs", "obs_se"];
        if !self.col_groups.is_empty() {
            roles.push("groups");
        }
        roles
    }

    /// Check that the dataset contains every declared column.
    pub fn validate(&self, dataset: &Dataset) -> Result<()> {
        for col in self.columns() {
            if !dataset.contains(col) {
                return Err(MixFxError::Compatibility(format!(
                    "{} is not in data columns: {:?}",
                    col,
                    dataset.column_names()
                )));
            }
        }
        Ok(())
    }
}

/// Check that a collection of specs declares the same column roles.
pub fn check_compatible_specs(specs: &[DataSpecs]) -> Result<()> {
    let Some(first) = specs.first() else {
        return Ok(());
    };
    let mut expected = first.roles();
    expected.sort_unstable();

    for (i, spec) in specs.iter().enumerate().skip(1) {
        let mut roles = spec.roles();
        roles.sort_unstable();
        if roles != expected {
            return Err(MixFxError::Compatibility(format!(
                "At least one data spec is different. Roles in spec 1 are {:?}. Roles in spec {} are {:?}.",
                expected,
                i + 1,
                roles
            )));
        }
    }
    Ok(())
}
