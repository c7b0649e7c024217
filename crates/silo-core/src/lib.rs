//! # silo-core
//! Foundation types and traits for the Silo farm.

pub mod constants;
pub mod error;
pub mod traits;
pub mod types;
