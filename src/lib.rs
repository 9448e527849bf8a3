// ABOUTME: Library module for shareledger-migrator
// ABOUTME: Exports all core functionality for use in binary and tests

pub mod accounts;
pub mod commands;
pub mod config;
pub mod interactive;
pub mod ledger;
pub mod migration;
pub mod utils;

#[cfg(test)]
mod testing;
