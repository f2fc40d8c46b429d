//! Tests for the processing pipeline

use crate::test_helpers::{array_approx_eq, cov1_variable, random_dataset, sample_dataset};
use mixfx_rs::data::Dataset;
use mixfx_rs::parameter::{
    process_all, process_all_with_config, process_for_betas, process_for_gammas, process_for_us,
    ParameterSet, PipelineConfig, Prior, SplineShape, SplineSpec, Variable,
};
use ndarray::{array, Array1, Array2};
use std::f64::{INFINITY, NEG_INFINITY};

fn site_variable() -> Variable {
    Variable::builder()
        .covariate("cov2")
        .random_effect(
            "site",
            Prior::bounded(vec![0.0], vec![5.0]).unwrap(),
            Prior::bounded(vec![-1.0], vec![1.0]).unwrap(),
        )
        .build()
        .unwrap()
}

#[test]
fn test_betas_shapes_and_values() {
    let df = sample_dataset();
    let mut set = ParameterSet::new(vec![Variable::intercept(), cov1_variable()]);
    process_for_betas(&mut set, &df, true).unwrap();

    let design = set.design_matrix_fe().unwrap();
    assert_eq!(design.dim(), (5, 2));
    assert_eq!(design.column(0).to_vec(), vec![1.0; 5]);
    assert_eq!(design.column(1).to_vec(), vec![0.0, 1.0, 2.0, 3.0, 4.0]);

    assert_eq!(set.lb_fe().unwrap(), &array![NEG_INFINITY, -2.0]);
    assert_eq!(set.ub_fe().unwrap(), &array![INFINITY, 3.0]);

    let constraints = set.constraints_fe().unwrap();
    assert_eq!(constraints.matrix(), &Array2::<f64>::eye(2));
    assert_eq!(constraints.lower_bound(), &array![NEG_INFINITY, -2.0]);
    assert_eq!(set.fe_priors().unwrap().len(), 2);

    // betas alone leave the random-effect objects untouched
    assert!(set.design_matrix_re().is_none());
    assert!(set.re_var_padding().is_none());
}

#[test]
fn test_process_all_single_random_effect() {
    let df = sample_dataset();
    let mut set = ParameterSet::new(vec![Variable::intercept(), cov1_variable()]);
    process_all(&mut set, &df).unwrap();

    assert_eq!(set.num_fe(), 2);
    assert_eq!(set.num_re_var(), 1);
    assert_eq!(set.num_re(), Some(3));

    let design_re = set.design_matrix_re().unwrap();
    assert_eq!(design_re.dim(), (5, 3));
    assert_eq!(design_re.row(4).to_vec(), vec![0.0, 0.0, 1.0]);
    assert_eq!(set.re_var_padding().unwrap(), &Array2::<f64>::ones((3, 1)));

    assert_eq!(set.lb_re_var().unwrap(), &array![-1.0]);
    assert_eq!(set.ub_re_var().unwrap(), &array![1.0]);
    assert_eq!(set.constraints_re_var().unwrap().matrix(), &Array2::<f64>::eye(1));
    let re_var_priors = set.re_var_priors().unwrap();
    assert_eq!(re_var_priors.len(), 1);
    assert_eq!(re_var_priors[0].mean().unwrap(), &array![1.0]);
    assert_eq!(re_var_priors[0].std().unwrap(), &array![2.0]);

    assert_eq!(set.lb_re().unwrap(), &Array1::from_elem(3, -10.0));
    assert_eq!(set.ub_re().unwrap(), &Array1::from_elem(3, 15.0));
    assert_eq!(set.constraints_re().unwrap().matrix(), &Array2::<f64>::eye(3));
    let re_priors = set.re_priors().unwrap();
    assert_eq!(re_priors.len(), 3);
    assert!(re_priors.iter().all(|p| p.upper_bound()[0] == 15.0));
}

#[test]
fn test_process_all_two_random_effects() {
    let df = sample_dataset();
    let mut set = ParameterSet::new(vec![Variable::intercept(), cov1_variable(), site_variable()]);
    process_all(&mut set, &df).unwrap();

    assert_eq!(set.design_matrix_fe().unwrap().dim(), (5, 3));
    assert_eq!(set.num_re_var(), 2);
    assert_eq!(set.num_re(), Some(5));

    let padding = set.re_var_padding().unwrap();
    let expected = array![
        [1.0, 0.0],
        [1.0, 0.0],
        [1.0, 0.0],
        [0.0, 1.0],
        [0.0, 1.0]
    ];
    assert_eq!(padding, &expected);

    let design_re = set.design_matrix_re().unwrap();
    assert_eq!(design_re.dim(), (5, 5));
    for row in design_re.rows() {
        assert_eq!(row.sum(), 2.0);
    }
    // row 2 is group "2" of the first variable and site "b" of the second
    assert_eq!(design_re.row(2).to_vec(), vec![0.0, 1.0, 0.0, 0.0, 1.0]);

    assert_eq!(set.lb_re_var().unwrap(), &array![-1.0, 0.0]);
    assert_eq!(set.ub_re_var().unwrap(), &array![1.0, 5.0]);
    assert_eq!(set.lb_re().unwrap(), &array![-10.0, -10.0, -10.0, -1.0, -1.0]);
    assert_eq!(set.constraints_re().unwrap().matrix(), &Array2::<f64>::eye(5));
    assert_eq!(set.re_priors().unwrap().len(), 5);
    assert_eq!(set.re_priors().unwrap()[3].upper_bound()[0], 1.0);
}

#[test]
fn test_fixed_only_set_skips_random_stages() {
    let df = sample_dataset();
    let mut set = ParameterSet::new(vec![
        Variable::intercept(),
        Variable::covariate("cov2", Prior::unbounded(1)).unwrap(),
    ]);
    process_all(&mut set, &df).unwrap();

    assert!(set.is_processed_for_betas());
    assert!(!set.is_processed_for_gammas());
    assert!(!set.is_processed_for_us());
    assert!(set.design_matrix_re().is_none());

    assert!(process_for_gammas(&mut set, &df, false)
        .unwrap_err()
        .is_configuration());
    assert!(process_for_us(&mut set, &df, false)
        .unwrap_err()
        .is_configuration());
}

#[test]
fn test_empty_set() {
    let df = sample_dataset();
    let mut set = ParameterSet::default();
    process_all(&mut set, &df).unwrap();

    assert_eq!(set.design_matrix_fe().unwrap().dim(), (5, 0));
    assert!(set.lb_fe().unwrap().is_empty());
    assert_eq!(set.constraints_fe().unwrap().matrix().dim(), (0, 0));
}

#[test]
fn test_betas_twice_with_reset_is_idempotent() {
    let df = sample_dataset();
    let mut set = ParameterSet::new(vec![Variable::intercept(), cov1_variable(), site_variable()]);

    process_for_betas(&mut set, &df, true).unwrap();
    let first = set.fixed_effects().unwrap().clone();
    process_for_betas(&mut set, &df, true).unwrap();
    assert_eq!(set.fixed_effects().unwrap(), &first);
}

#[test]
fn test_process_all_twice_is_idempotent() {
    let df = sample_dataset();
    let mut set = ParameterSet::new(vec![Variable::intercept(), cov1_variable(), site_variable()]);

    process_all(&mut set, &df).unwrap();
    let design_re = set.design_matrix_re().unwrap().clone();
    let padding = set.re_var_padding().unwrap().clone();
    let us = set.random_effects().unwrap().clone();

    process_all(&mut set, &df).unwrap();
    assert_eq!(set.design_matrix_re().unwrap(), &design_re);
    assert_eq!(set.re_var_padding().unwrap(), &padding);
    assert_eq!(set.random_effects().unwrap(), &us);
}

#[test]
fn test_missing_covariate_is_compatibility_error() {
    let df = sample_dataset();
    let mut set = ParameterSet::new(vec![
        Variable::intercept(),
        Variable::covariate("cov9", Prior::unbounded(1)).unwrap(),
    ]);
    let err = process_all(&mut set, &df).unwrap_err();
    assert!(err.is_compatibility());
    assert!(!set.is_processed_for_betas());
}

#[test]
fn test_new_dataset_with_other_groups_is_rejected() {
    let mut set = ParameterSet::new(vec![cov1_variable()]);
    process_all(&mut set, &sample_dataset()).unwrap();

    let other = Dataset::new()
        .with_numeric("cov1", vec![0.0, 1.0, 2.0, 3.0, 4.0])
        .unwrap()
        .with_categorical("group", ["1", "2", "4", "1", "3"])
        .unwrap();
    let err = process_all(&mut set, &other).unwrap_err();
    assert!(err.is_compatibility());
}

#[test]
fn test_new_dataset_with_same_groups_is_accepted() {
    let mut set = ParameterSet::new(vec![cov1_variable()]);
    process_all(&mut set, &sample_dataset()).unwrap();

    let other = Dataset::new()
        .with_numeric("cov1", vec![10.0, 11.0, 12.0])
        .unwrap()
        .with_categorical("group", ["1", "2", "3"])
        .unwrap();
    process_all(&mut set, &other).unwrap();
    assert_eq!(set.design_matrix_fe().unwrap().column(0).to_vec(), vec![10.0, 11.0, 12.0]);
    assert_eq!(set.design_matrix_re().unwrap(), &Array2::<f64>::eye(3));
}

#[test]
fn test_betas_without_reset_keeps_random_stages() {
    let df = sample_dataset();
    let mut set = ParameterSet::new(vec![Variable::intercept(), cov1_variable()]);
    process_all(&mut set, &df).unwrap();

    process_for_betas(&mut set, &df, false).unwrap();
    assert!(set.is_processed_for_gammas());
    assert!(set.is_processed_for_us());
}

#[test]
fn test_config_without_reset() {
    let df = sample_dataset();
    let mut set = ParameterSet::new(vec![Variable::intercept(), cov1_variable()]);
    let config = PipelineConfig {
        reset: false,
        ..PipelineConfig::default()
    };
    process_all_with_config(&mut set, &df, &config).unwrap();
    assert!(set.is_processed_for_us());
}

#[test]
fn test_config_json() {
    let config = PipelineConfig::from_json(r#"{"reset": false, "random_effects": true}"#).unwrap();
    assert!(!config.reset);
    assert!(config.random_effects);
}

#[test]
fn test_spline_in_pipeline() {
    let df = sample_dataset();
    let spline = Variable::builder()
        .covariate("cov1")
        .spline(SplineSpec::new(1, 2).unwrap().with_shape(SplineShape::Increasing))
        .build()
        .unwrap();
    let mut set = ParameterSet::new(vec![Variable::intercept(), spline, cov1_variable()]);
    process_all(&mut set, &df).unwrap();

    assert_eq!(set.num_fe(), 5);
    assert_eq!(set.design_matrix_fe().unwrap().dim(), (5, 5));
    let constraints = set.constraints_fe().unwrap();
    // identity rows for 5 coefficients plus two first-difference rows
    assert_eq!(constraints.matrix().dim(), (7, 5));
    assert_eq!(constraints.lower_bound().len(), 7);
}

#[test]
fn test_random_dataset_invariants() {
    let df = random_dataset(60, 4, 7, 42);
    let variables: Vec<Variable> = (0..4)
        .map(|j| {
            let builder = Variable::builder().covariate(&format!("x{}", j));
            if j % 2 == 0 {
                builder
                    .random_effect("group", Prior::unbounded(1), Prior::unbounded(1))
                    .build()
                    .unwrap()
            } else {
                builder.build().unwrap()
            }
        })
        .collect();
    let mut set: ParameterSet = std::iter::once(Variable::intercept()).chain(variables).collect();
    process_all(&mut set, &df).unwrap();

    let num_re = set.num_re().unwrap();
    assert_eq!(num_re, 14);
    assert_eq!(set.design_matrix_fe().unwrap().dim(), (60, 5));
    assert_eq!(set.design_matrix_re().unwrap().dim(), (60, num_re));
    assert_eq!(set.re_var_padding().unwrap().dim(), (num_re, 2));
    assert_eq!(set.constraints_re().unwrap().ncols(), num_re);
    assert_eq!(set.constraints_re_var().unwrap().ncols(), 2);

    // each variance parameter governs exactly its variable's groups
    let column_sums = set.re_var_padding().unwrap().sum_axis(ndarray::Axis(0));
    assert!(array_approx_eq(&column_sums, &array![7.0, 7.0], 1e-12));

    let x0 = df.numeric("x0").unwrap();
    assert_eq!(set.design_matrix_fe().unwrap().column(1), x0);
}
