// ABOUTME: Command implementations exposed by the CLI
// ABOUTME: Exports the interactive migrate workflow

pub mod migrate;

pub use migrate::{migrate, query_holdings, MigrationOutcome};
