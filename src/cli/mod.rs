//! Command-line interface support

pub mod commands;
pub mod error;
