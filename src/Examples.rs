//! examples of usage of RustedIPOC
/// shipped optimal-control problems solved by barrier continuation
pub mod ocp_examples;
