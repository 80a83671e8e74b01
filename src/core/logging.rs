//! Logging setup
//!
//! INFO by default; every `-v` lowers the threshold by one level. `RUST_LOG`
//! wins when it is set.

use std::io::IsTerminal;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Map the `-v` count onto a tracing level
pub fn level_for(verbosity: u8) -> Level {
  match verbosity {
    0 => Level::INFO,
    1 => Level::DEBUG,
    _ => Level::TRACE,
  }
}

/// Install the global subscriber. Safe to call more than once.
pub fn init(verbosity: u8) {
  let filter = EnvFilter::builder()
    .with_default_directive(level_for(verbosity).into())
    .from_env_lossy();

  let _ = tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_target(false)
    .without_time()
    .with_ansi(std::io::stderr().is_terminal())
    .with_writer(std::io::stderr)
    .try_init();
}
