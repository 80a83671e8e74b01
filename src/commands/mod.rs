//! CLI commands for tc-release
//!
//! - **release**: version, commit, tag and push a TwinCAT project, then
//!   optionally deploy it

pub mod release;

pub use release::run_release;
