//! Tests for ParameterSet bookkeeping and the block collector

use crate::test_helpers::{cov1_variable, sample_dataset};
use mixfx_rs::parameter::collect::{ConstraintsFe, DesignMatrixFe, DesignMatrixRe, NGroups};
use mixfx_rs::parameter::{collect_blocks, process_all, ParameterSet, Prior, Selection, Variable};

fn parameter_set() -> ParameterSet {
    ParameterSet::new(vec![
        Variable::intercept(),
        cov1_variable(),
        Variable::covariate("cov2", Prior::unbounded(1)).unwrap(),
    ])
}

#[test]
fn test_collect_in_declaration_order() {
    let df = sample_dataset();
    let mut set = parameter_set();

    let blocks = collect_blocks::<DesignMatrixFe>(&mut set, Some(&df), Selection::All).unwrap();
    assert_eq!(blocks.len(), 3);
    assert_eq!(blocks[0][[2, 0]], 1.0);
    assert_eq!(blocks[1][[2, 0]], 2.0);
    assert_eq!(blocks[2][[2, 0]], 2.0);
}

#[test]
fn test_collect_random_effects_only() {
    let df = sample_dataset();
    let mut set = parameter_set();

    let blocks =
        collect_blocks::<DesignMatrixRe>(&mut set, Some(&df), Selection::RandomEffects).unwrap();
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].dim(), (5, 3));

    let groups = collect_blocks::<NGroups>(&mut set, None, Selection::RandomEffects).unwrap();
    assert_eq!(groups, vec![3]);
}

#[test]
fn test_collect_caches_blocks() {
    let df = sample_dataset();
    let mut set = parameter_set();
    assert!(set.variables()[1].cache().is_empty());

    collect_blocks::<ConstraintsFe>(&mut set, None, Selection::All).unwrap();
    collect_blocks::<DesignMatrixFe>(&mut set, Some(&df), Selection::All).unwrap();
    assert!(set.variables()[1].cache().constraints_fe().is_some());
    assert!(set.variables()[1].cache().design_matrix_fe().is_some());

    // cached blocks are returned without touching the dataset
    let again = collect_blocks::<DesignMatrixFe>(&mut set, None, Selection::All).unwrap();
    assert_eq!(again.len(), 3);
}

#[test]
fn test_collect_without_dataset_fails() {
    let mut set = parameter_set();
    let err = collect_blocks::<DesignMatrixFe>(&mut set, None, Selection::All).unwrap_err();
    assert!(err.is_configuration());
}

#[test]
fn test_collect_error_names_variable() {
    let mut set = ParameterSet::new(vec![
        Variable::intercept(),
        Variable::covariate("cov9", Prior::unbounded(1)).unwrap(),
    ]);
    let err = collect_blocks::<DesignMatrixFe>(&mut set, Some(&sample_dataset()), Selection::All)
        .unwrap_err();
    assert!(err.is_compatibility());
    let message = err.to_string();
    assert!(message.contains("cov9"));
    assert!(message.contains("design_matrix_fe"));
}

#[test]
fn test_reset_clears_combined_state() {
    let df = sample_dataset();
    let mut set = parameter_set();
    process_all(&mut set, &df).unwrap();
    assert!(set.is_processed_for_betas());
    assert!(set.is_processed_for_gammas());
    assert!(set.is_processed_for_us());

    set.reset();
    assert!(set.fixed_effects().is_none());
    assert!(set.re_variances().is_none());
    assert!(set.random_effects().is_none());
    assert!(set.design_matrix_re().is_none());
    assert!(set.re_var_padding().is_none());
    assert!(set.variables()[1].cache().design_matrix_fe().is_none());
    assert!(set.variables()[1].cache().design_matrix_re().is_none());
    // group levels survive a reset
    assert_eq!(set.num_re(), Some(3));
}

#[test]
fn test_push_resets() {
    let df = sample_dataset();
    let mut set = parameter_set();
    process_all(&mut set, &df).unwrap();

    set.push(Variable::covariate("obs", Prior::unbounded(1)).unwrap());
    assert_eq!(set.len(), 4);
    assert!(!set.is_processed_for_betas());

    process_all(&mut set, &df).unwrap();
    assert_eq!(set.design_matrix_fe().unwrap().dim(), (5, 4));
}
