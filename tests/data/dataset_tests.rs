//! Tests for the Dataset container

use crate::test_helpers::sample_dataset;
use mixfx_rs::data::{Column, Dataset};

#[test]
fn test_sample_dataset_shape() {
    let df = sample_dataset();
    assert_eq!(df.n_rows(), 5);
    assert_eq!(
        df.column_names(),
        vec!["obs", "obs_se", "cov1", "cov2", "group", "site"]
    );
}

#[test]
fn test_numeric_access() {
    let df = sample_dataset();
    let cov1 = df.numeric("cov1").unwrap();
    assert_eq!(cov1.to_vec(), vec![0.0, 1.0, 2.0, 3.0, 4.0]);

    assert!(df.numeric("group").unwrap_err().is_compatibility());
    assert!(df.numeric("missing").unwrap_err().is_compatibility());
}

#[test]
fn test_categorical_access_stringifies_numbers() {
    let df = Dataset::new()
        .with_numeric("year", vec![2000.0, 2001.0, 2000.0])
        .unwrap();
    let labels = df.categorical("year").unwrap();
    assert_eq!(labels[0], labels[2]);
    assert_ne!(labels[0], labels[1]);
}

#[test]
fn test_mismatched_height_rejected() {
    let err = sample_dataset()
        .with_numeric("short", vec![1.0, 2.0])
        .unwrap_err();
    assert!(err.is_compatibility());
}

#[test]
fn test_replace_column() {
    let mut df = sample_dataset();
    df.insert("cov1", Column::Numeric(ndarray::Array1::zeros(5)))
        .unwrap();
    assert_eq!(df.numeric("cov1").unwrap().sum(), 0.0);
    assert_eq!(df.column_names().len(), 6);
}
