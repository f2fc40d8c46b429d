//! Integration tests for datasets and column-role declarations

// Tests for the Dataset container
mod dataset_tests;

// Tests for DataSpecs validation
mod specs_tests;
