//! Property-based tests for graph building and cycle detection.
//!
//! These tests use proptest to generate random declaration sequences and
//! verify that merge and cycle invariants hold for all of them.
