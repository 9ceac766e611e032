//! Testing infrastructure for nestform integration tests.
//!
//! - `TestWorld`: isolated data directory plus a runner for the `nestform` binary
//! - `assertions`: checks over the CLI's JSON output
//! - `fixtures`: posted bodies for the demo Block/Building/Tenant/Furniture schema

pub mod assertions;
pub mod fixtures;
pub mod world;

pub use world::{CliResult, TestWorld};
