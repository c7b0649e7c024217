//! # silo-interest
//! Deterministic fixed-point compound-interest engine for the Silo farm.

pub mod engine;
pub mod fixed;
