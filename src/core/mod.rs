//! Core infrastructure for tc-release
//!
//! - **config**: Tool configuration resolved once at startup
//! - **error**: Error types with contextual help messages
//! - **logging**: tracing subscriber setup driven by `-v`
//! - **vcs**: Git operations through the system git binary
//! - **workspace**: Scratch clone directory with guaranteed cleanup

pub mod config;
pub mod error;
pub mod logging;
pub mod vcs;
pub mod workspace;
