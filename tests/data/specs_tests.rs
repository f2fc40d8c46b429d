//! Tests for DataSpecs validation

use crate::test_helpers::sample_dataset;
use mixfx_rs::data::{check_compatible_specs, DataSpecs};

#[test]
fn test_validate_against_dataset() {
    let df = sample_dataset();
    let specs = DataSpecs::new("obs", "obs_se").with_groups(["group"]);
    assert!(specs.validate(&df).is_ok());

    let specs = DataSpecs::new("obs", "obs_se").with_groups(["region"]);
    let err = specs.validate(&df).unwrap_err();
    assert!(err.is_compatibility());
    assert!(err.to_string().contains("region"));
}

#[test]
fn test_compatible_specs() {
    let a = DataSpecs::new("obs", "obs_se").with_groups(["group"]);
    let b = DataSpecs::new("y", "y_se").with_groups(["site", "group"]);
    assert!(check_compatible_specs(&[a.clone(), b]).is_ok());

    let c = DataSpecs::new("obs", "obs_se");
    assert!(check_compatible_specs(&[a, c]).unwrap_err().is_compatibility());
    assert!(check_compatible_specs(&[]).is_ok());
}

#[test]
fn test_specs_json() {
    let specs: DataSpecs =
        serde_json::from_str(r#"{"col_obs": "obs", "col_obs_se": "obs_se"}"#).unwrap();
    assert!(specs.col_groups.is_empty());
    assert_eq!(specs.columns(), vec!["obs", "obs_se"]);
}
