//! Tests for block-diagonal combination and the padding matrix

use mixfx_rs::parameter::{combine_constraints, padding_matrix, LinearConstraints, PriorBounds};
use ndarray::{array, s, Array1, Array2};

#[test]
fn test_combine_block_diagonal() {
    let a = LinearConstraints::new(
        array![[1.0, -1.0]],
        array![0.0],
        array![1.0],
    )
    .unwrap();
    let bounds = PriorBounds::new(vec![-2.0, -3.0, -4.0], vec![2.0, 3.0, 4.0]).unwrap();
    let b = LinearConstraints::identity(&bounds);

    let combined = combine_constraints(&[a, b]);
    assert_eq!(combined.matrix().dim(), (4, 5));
    assert_eq!(combined.matrix().row(0).to_vec(), vec![1.0, -1.0, 0.0, 0.0, 0.0]);
    assert_eq!(
        combined.matrix().slice(s![1.., 2..]).to_owned(),
        Array2::<f64>::eye(3)
    );
    assert_eq!(combined.matrix().slice(s![1.., ..2]).sum(), 0.0);
    assert_eq!(combined.lower_bound().to_vec(), vec![0.0, -2.0, -3.0, -4.0]);
    assert_eq!(combined.upper_bound().to_vec(), vec![1.0, 2.0, 3.0, 4.0]);
}

#[test]
fn test_combine_no_blocks() {
    let combined = combine_constraints(&[]);
    assert_eq!(combined.matrix().dim(), (0, 0));
    assert!(combined.lower_bound().is_empty());
    assert!(combined.upper_bound().is_empty());
}

#[test]
fn test_combine_single_block_is_unchanged() {
    let block = LinearConstraints::new(array![[2.0, 0.5]], array![-1.0], array![1.0]).unwrap();
    assert_eq!(combine_constraints(&[block.clone()]), block);
}

#[test]
fn test_constraint_rows_must_match_bounds() {
    let err =
        LinearConstraints::new(Array2::eye(2), Array1::zeros(3), Array1::zeros(2)).unwrap_err();
    assert!(err.is_consistency());
}

#[test]
fn test_padding_two_variables() {
    let padding = padding_matrix(&[3, 2]);
    let expected = array![
        [1.0, 0.0],
        [1.0, 0.0],
        [1.0, 0.0],
        [0.0, 1.0],
        [0.0, 1.0]
    ];
    assert_eq!(padding, expected);
}

#[test]
fn test_padding_single_variable() {
    assert_eq!(padding_matrix(&[4]), Array2::<f64>::ones((4, 1)));
    assert_eq!(padding_matrix(&[]).dim(), (0, 0));
}
