//! Repository preparation
//!
//! Turns the empty repository of a fresh workspace into a checkout of the
//! remote's default branch.

use crate::core::error::{GitError, ReleaseError, ReleaseResult};
use crate::core::vcs::SystemGit;

/// Remote the release is fetched from and pushed to
pub const REMOTE: &str = "origin";

/// Used when the remote does not advertise a HEAD
const FALLBACK_BRANCH: &str = "master";

/// Add `url` as origin, fetch it, and check out a local branch tracking its
/// default branch. Returns that branch's name.
pub fn prepare(repo: &SystemGit, url: &str) -> ReleaseResult<String> {
  tracing::debug!("Adding remote {} -> {}", REMOTE, url);
  repo.add_remote(REMOTE, url)?;

  if !repo.remote_exists(REMOTE)? {
    return Err(ReleaseError::Git(GitError::RepoNotFound { url: url.to_string() }));
  }

  tracing::info!("Fetching {}", url);
  repo.fetch_from_remote(REMOTE)?;

  let branch = match repo.remote_default_branch(REMOTE)? {
    Some(branch) => branch,
    None => {
      tracing::debug!("Remote has no HEAD; assuming '{}'", FALLBACK_BRANCH);
      FALLBACK_BRANCH.to_string()
    }
  };

  tracing::info!("Checking out {}/{}", REMOTE, branch);
  repo.checkout_tracking_branch(REMOTE, &branch)?;
  repo.current_branch()
}
