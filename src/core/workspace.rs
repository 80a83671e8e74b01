//! Scratch workspace for a single release
//!
//! A `Workspace` owns the scratch directory and the repository living in it.
//! Dropping it removes the directory on every exit path, unless the caller
//! asked to retain it (dry runs). The repository handle only holds paths; git
//! itself runs as short-lived child processes, so nothing keeps files open
//! once a step has returned.

use crate::core::config::GitConfig;
use crate::core::error::{GitError, ReleaseError, ReleaseResult};
use crate::core::vcs::SystemGit;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub struct Workspace {
  path: PathBuf,
  repo: SystemGit,
  retain: bool,
}

impl Workspace {
  /// Create the scratch directory and an empty repository in it.
  ///
  /// Refuses to reuse an existing directory: it may hold a repository from
  /// an earlier run, and it is not ours to delete.
  pub fn create(path: &Path, git: &GitConfig, retain: bool) -> ReleaseResult<Self> {
    if path.exists() {
      return Err(ReleaseError::Git(GitError::WorkspaceOccupied {
        path: path.to_path_buf(),
      }));
    }

    tracing::info!("Creating working directory: {}", path.display());
    fs::create_dir_all(path)?;

    let repo = match SystemGit::init(path, git) {
      Ok(repo) => repo,
      Err(e) => {
        // The directory is ours already; don't leave it behind
        if let Err(cleanup) = remove_dir_forcing(path) {
          tracing::warn!("Failed to remove {}: {}", path.display(), cleanup);
        }
        return Err(e);
      }
    };

    Ok(Self {
      path: path.to_path_buf(),
      repo,
      retain,
    })
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  pub fn repo(&self) -> &SystemGit {
    &self.repo
  }
}

impl Drop for Workspace {
  fn drop(&mut self) {
    if self.retain {
      tracing::info!("Skipping cleanup for dry-run: see {}", self.path.display());
      return;
    }

    tracing::info!("Cleaning up");
    if let Err(e) = remove_dir_forcing(&self.path) {
      tracing::warn!("Failed to remove {}: {}", self.path.display(), e);
    }
  }
}

/// Remove a directory tree, clearing read-only bits if the first attempt is
/// refused (git marks pack files read-only, which blocks deletion on Windows).
pub fn remove_dir_forcing(path: &Path) -> io::Result<()> {
  match fs::remove_dir_all(path) {
    Ok(()) => Ok(()),
    Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
    Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
      tracing::debug!("Clearing read-only attributes under {}", path.display());
      clear_readonly(path)?;
      fs::remove_dir_all(path)
    }
    Err(e) => Err(e),
  }
}

#[allow(clippy::permissions_set_readonly_false)]
fn clear_readonly(path: &Path) -> io::Result<()> {
  for entry in WalkDir::new(path) {
    let entry = entry.map_err(io::Error::other)?;
    let mut perms = entry.metadata().map_err(io::Error::other)?.permissions();
    if perms.readonly() {
      perms.set_readonly(false);
      fs::set_permissions(entry.path(), perms)?;
    }
  }
  Ok(())
}
