//! Command-line interface of the `trovilo` binary.

pub mod types;

pub use types::Cli;
