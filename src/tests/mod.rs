//! Internal test modules - whitebox tests with crate access
//!
//! End-to-end pipeline scenarios and property tests that reach across
//! parser, classifier, aggregator and renderer.

mod property_tests;
