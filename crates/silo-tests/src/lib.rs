//! Shared fixtures for the Silo integration suites.

pub mod helpers;
