//! Command implementations for the repoq CLI
//!
//! Each command module provides a `run` function that executes the command logic.

pub mod ask;
pub mod models;
