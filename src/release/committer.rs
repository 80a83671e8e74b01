//! Commit, tag and push a prepared release

use crate::core::error::ReleaseResult;
use crate::core::vcs::SystemGit;
use crate::release::preparer::REMOTE;
use std::path::Path;

/// What `commit_and_tag` did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
  /// The tag was already present; nothing was committed or pushed
  AlreadyTagged,

  /// A commit and annotated tag were created
  Tagged {
    commit: String,
    /// Porcelain output of the tag push, `None` for dry runs
    pushed: Option<String>,
  },
}

/// Commit message (and tag annotation) for a release
pub fn release_message(tag: &str) -> String {
  format!("Tagging version {}", tag)
}

/// Stage exactly `changed`, commit without hooks, tag the commit and, unless
/// `dry_run`, push only the tag to origin.
pub fn commit_and_tag<P: AsRef<Path>>(
  repo: &SystemGit,
  changed: &[P],
  tag: &str,
  message: &str,
  dry_run: bool,
) -> ReleaseResult<CommitOutcome> {
  if repo.has_tag(tag)? {
    tracing::info!("Tag {} already exists; nothing to release", tag);
    return Ok(CommitOutcome::AlreadyTagged);
  }

  repo.stage_paths(changed)?;
  let commit = repo.commit_no_verify(message)?;
  tracing::info!("Committed {}", commit);

  repo.create_annotated_tag(tag, message)?;
  tracing::info!("Tagged {} as {}", commit, tag);

  if dry_run {
    tracing::info!("Dry run: not pushing {}", tag);
    return Ok(CommitOutcome::Tagged { commit, pushed: None });
  }

  tracing::info!("Pushing {} to {}", tag, REMOTE);
  let pushed = repo.push_tag(REMOTE, tag)?;
  tracing::debug!("Push result: {}", pushed);

  Ok(CommitOutcome::Tagged {
    commit,
    pushed: Some(pushed),
  })
}
