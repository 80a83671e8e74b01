//! Utility functions for cross-platform path handling

use std::path::Path;

/// Convert a path to Git format (always forward slashes)
///
/// Git expects paths with forward slashes, even on Windows.
pub fn path_to_git_format(path: &Path) -> String {
  #[cfg(target_os = "windows")]
  {
    path.to_string_lossy().replace('\\', "/")
  }
  #[cfg(not(target_os = "windows"))]
  {
    path.to_string_lossy().to_string()
  }
}

/// Repository name from a clone URL or path
///
/// Takes the last path segment and drops any `.git`:
/// - `git@github.com:pcdshub/lcls-plc-kfe-motion.git` -> `lcls-plc-kfe-motion`
/// - `https://github.com/pcdshub/lcls-twincat-general` -> `lcls-twincat-general`
/// - `/srv/git/plc-tst.git/` -> `plc-tst`
pub fn repo_name_from_url(url: &str) -> String {
  let trimmed = url.trim_end_matches(['/', '\\']);
  let last = trimmed.rsplit(['/', '\\', ':']).next().unwrap_or(trimmed);
  last.replace(".git", "")
}
