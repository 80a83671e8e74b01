//! Locating files in a checked-out repository
//!
//! `scan` is the shared primitive: a case-insensitive match of the file name
//! against a glob pattern, over the whole tree except `.git`. Results are
//! sorted by path so that "first match" means the same thing on every run
//! and every platform.

use crate::core::error::{ProjectError, ReleaseError, ReleaseResult};
use glob::{MatchOptions, Pattern};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Default pattern for TwinCAT PLC project descriptors
pub const PROJECT_PATTERN: &str = "*.plcproj";

/// Pattern for compiled PLC objects used as version reference
pub const REFERENCE_PATTERN: &str = "*.TcPOU";

const MATCH_OPTIONS: MatchOptions = MatchOptions {
  case_sensitive: false,
  require_literal_separator: false,
  require_literal_leading_dot: false,
};

/// All files under `root` whose name matches `pattern`, sorted by path
pub fn scan(root: &Path, pattern: &str) -> ReleaseResult<Vec<PathBuf>> {
  let pattern = Pattern::new(pattern)?;
  let mut found = Vec::new();

  let walker = WalkDir::new(root)
    .sort_by_file_name()
    .into_iter()
    .filter_entry(|entry| !(entry.file_type().is_dir() && entry.file_name() == ".git"));
  for entry in walker {
    let entry = entry?;
    if entry.file_type().is_file() && pattern.matches_with(&entry.file_name().to_string_lossy(), MATCH_OPTIONS) {
      found.push(entry.into_path());
    }
  }

  found.sort();
  tracing::trace!("{} file(s) matching {} under {}", found.len(), pattern, root.display());
  Ok(found)
}

/// The single project descriptor to release
///
/// With a `selector`, the match whose file stem equals it is returned even
/// when other projects exist. Without one, exactly one match is required.
pub fn find_project(root: &Path, pattern: &str, selector: Option<&str>) -> ReleaseResult<PathBuf> {
  let mut candidates = scan(root, pattern)?;

  if candidates.is_empty() {
    return Err(ReleaseError::Project(ProjectError::NotFound {
      pattern: pattern.to_string(),
      root: root.to_path_buf(),
    }));
  }

  match selector.filter(|s| !s.is_empty()) {
    Some(selector) => candidates
      .into_iter()
      .find(|path| path.file_stem().is_some_and(|stem| stem == selector))
      .ok_or_else(|| {
        ReleaseError::Project(ProjectError::SelectorNotFound {
          selector: selector.to_string(),
          pattern: pattern.to_string(),
        })
      }),
    None if candidates.len() > 1 => Err(ReleaseError::Project(ProjectError::Ambiguous {
      pattern: pattern.to_string(),
      candidates,
    })),
    None => Ok(candidates.remove(0)),
  }
}

/// First compiled object in the tree. When there are several, which one is
/// used only depends on path order; they are expected to share the same
/// version attributes.
pub fn find_reference_object(root: &Path) -> ReleaseResult<PathBuf> {
  let candidates = scan(root, REFERENCE_PATTERN)?;
  if candidates.len() > 1 {
    tracing::debug!(
      "{} files match {}; using {}",
      candidates.len(),
      REFERENCE_PATTERN,
      candidates[0].display()
    );
  }

  candidates.into_iter().next().ok_or_else(|| {
    ReleaseError::Project(ProjectError::ReferenceNotFound {
      pattern: REFERENCE_PATTERN.to_string(),
      root: root.to_path_buf(),
    })
  })
}
