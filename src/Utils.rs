//! different utility modules used throughout the project
/// logger setup and tiny helpers to save tables into files
pub mod logger;
/// binary/JSON/csv snapshots of continuation results
pub mod persistence;
