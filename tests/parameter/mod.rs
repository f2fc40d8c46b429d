//! Integration tests for the parameter system
//!
//! These tests drive variables, the block collector and the processing
//! pipeline through the public API.


// Tests for block-diagonal combination and padding
mod constraints_tests;

// Tests for ParameterSet bookkeeping and the block collector
mod parameter_set_tests;

// Tests for the processing pipeline
mod processors_tests;
