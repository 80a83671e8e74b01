//! Integration tests for tc-release
//!
//! Each test builds a bare repository holding a TwinCAT project and runs the
//! compiled binary against it.

mod helpers;
mod test_deploy;
mod test_release;
