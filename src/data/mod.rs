//! # Tabular input
//!
//! A minimal column store holding the data the block-assembly engine reads.
//! Columns are either numeric (covariates) or categorical (grouping columns).
//! Checking that a dataset carries every column a model needs is the job of
//! [`DataSpecs`]; the accessors here still fail with a compatibility error
//! rather than hand back malformed data when a column is absent.

pub mod specs;

pub use specs::{check_compatible_specs, DataSpecs};

use crate::error::{MixFxError, Result};
use ndarray::{Array1, ArrayView1};

/// A single named column.
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    /// Real-valued covariate values.
    Numeric(Array1<f64>),

    /// Category labels, e.g. a grouping column.
    Categorical(Vec<String>),
}

impl Column {
    /// Number of values in the column.
    pub fn len(&self) -> usize {
        match self {
            Self::Numeric(values) => values.len(),
            Self::Categorical(values) => values.len(),
        }
    }

    /// Whether the column holds no values.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// An ordered collection of equally tall named columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    columns: Vec<(String, Column)>,
}

impl Dataset {
    /// Create an empty dataset with no columns and no rows.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a numeric column, consuming and returning the dataset.
    ///
    /// # Examples
    ///
    /// ```
    /// use mixfx_rs::data::Dataset;
    ///
    /// let df = Dataset::new()
    ///     .with_numeric("cov1", vec![0.0, 1.0, 2.0])
    ///     .unwrap()
    ///     .with_categorical("group", ["a", "b", "a"])
    ///     .unwrap();
    /// assert_eq!(df.n_rows(), 3);
    /// assert!(df.contains("group"));
    /// ```
    pub fn with_numeric(mut self, name: &str, values: Vec<f64>) -> Result<Self> {
        self.insert(name, Column::Numeric(Array1::from_vec(values)))?;
        Ok(self)
    }

    /// Add a categorical column, consuming and returning the dataset.
    pub fn with_categorical<I, S>(mut self, name: &str, values: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values = values.into_iter().map(Into::into).collect();
        self.insert(name, Column::Categorical(values))?;
        Ok(self)
    }

    /// Insert or replace a column. All columns must share the same height.
    pub fn insert(&mut self, name: &str, column: Column) -> Result<()> {
        let replacing = self.position(name);
        let others_height = self
            .columns
            .iter()
            .enumerate()
            .find(|(i, _)| Some(*i) != replacing)
            .map(|(_, (_, col))| col.len());

        if let Some(height) = others_height {
            if height != column.len() {
                return Err(MixFxError::Compatibility(format!(
                    "column '{}' has {} rows, but the dataset has {} rows",
                    name,
                    column.len(),
                    height
                )));
            }
        }

        match replacing {
            Some(i) => self.columns[i].1 = column,
            None => self.columns.push((name.to_string(), column)),
        }
        Ok(())
    }

    /// Number of rows; zero for a dataset without columns.
    pub fn n_rows(&self) -> usize {
        self.columns.first().map_or(0, |(_, col)| col.len())
    }

    /// Whether a column with the given name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Column names in insertion order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Look up a column by name.
    pub fn column(&self, name: &str) -> Result<&Column> {
        self.position(name)
            .map(|i| &self.columns[i].1)
            .ok_or_else(|| {
                MixFxError::Compatibility(format!(
                    "{} is not in data columns: {:?}",
                    name,
                    self.column_names()
                ))
            })
    }

    /// Borrow a numeric column.
    pub fn numeric(&self, name: &str) -> Result<ArrayView1<'_, f64>> {
        match self.column(name)? {
            Column::Numeric(values) => Ok(values.view()),
            Column::Categorical(_) => Err(MixFxError::Compatibility(format!(
                "column '{}' is categorical, a numeric column is required",
                name
            ))),
        }
    }

    /// Read a column as category labels. Numeric columns are rendered with
    /// their `Display` form so that integer-coded groups can be used directly.
    pub fn categorical(&self, name: &str) -> Result<Vec<String>> {
        match self.column(name)? {
            Column::Categorical(values) => Ok(values.clone()),
            Column::Numeric(values) => Ok(values.iter().map(|v| v.to_string()).collect()),
        }
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|(col, _)| col == name)
    }
}
