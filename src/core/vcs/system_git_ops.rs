//! Remote, branch, tag and commit operations for SystemGit

use super::system_git::SystemGit;
use crate::core::error::{GitError, ReleaseError, ReleaseResult, ResultExt};
use crate::utils::path_to_git_format;
use std::path::Path;

impl SystemGit {
  /// Add a remote repository
  pub fn add_remote(&self, name: &str, url: &str) -> ReleaseResult<()> {
    self.run(["remote", "add", name, url])?;
    Ok(())
  }

  /// Check that a remote resolves to a reachable repository
  ///
  /// Uses `git ls-remote`, which fails for missing repositories, bad URLs and
  /// unreachable hosts alike. Prompting for credentials is disabled.
  pub fn remote_exists(&self, name: &str) -> ReleaseResult<bool> {
    let output = self
      .git_cmd()
      .args(["ls-remote", "--heads", name])
      .output()
      .context("Failed to run git ls-remote")?;

    if !output.status.success() {
      tracing::debug!("ls-remote {} failed: {}", name, String::from_utf8_lossy(&output.stderr).trim());
    }

    Ok(output.status.success())
  }

  /// Fetch all branches and tags from remote
  pub fn fetch_from_remote(&self, remote_name: &str) -> ReleaseResult<()> {
    tracing::debug!("Fetching from remote '{}'", remote_name);
    self.run(["fetch", "--quiet", "--tags", remote_name])?;
    Ok(())
  }

  /// Branch the remote's HEAD points at, if it advertises one
  pub fn remote_default_branch(&self, remote_name: &str) -> ReleaseResult<Option<String>> {
    let output = self.run(["ls-remote", "--symref", remote_name, "HEAD"])?;
    Ok(parse_symref_head(&String::from_utf8_lossy(&output.stdout)))
  }

  /// Create a local branch tracking `remote/branch` and check it out
  pub fn checkout_tracking_branch(&self, remote_name: &str, branch: &str) -> ReleaseResult<()> {
    let upstream = format!("{}/{}", remote_name, branch);
    self.run(["checkout", "--quiet", "-b", branch, "--track", upstream.as_str()])?;
    Ok(())
  }

  /// List all tag names
  pub fn list_tags(&self) -> ReleaseResult<Vec<String>> {
    let output = self.run(["tag", "--list"])?;

    let tags = String::from_utf8_lossy(&output.stdout)
      .lines()
      .map(|s| s.trim().to_string())
      .filter(|s| !s.is_empty())
      .collect();

    Ok(tags)
  }

  /// Check whether a tag of this exact name exists
  pub fn has_tag(&self, tag: &str) -> ReleaseResult<bool> {
    Ok(self.list_tags()?.iter().any(|t| t == tag))
  }

  /// Stage specific files (absolute or work-tree relative paths)
  pub fn stage_paths<P: AsRef<Path>>(&self, paths: &[P]) -> ReleaseResult<()> {
    let mut args = vec!["add".to_string(), "--".to_string()];
    for path in paths {
      let path = path.as_ref();
      let relative = path.strip_prefix(&self.work_tree).unwrap_or(path);
      args.push(path_to_git_format(relative));
    }

    self.run(&args)?;
    Ok(())
  }

  /// Commit the index; no hooks run (see `core.hooksPath` in `base_command`)
  pub fn commit_no_verify(&self, message: &str) -> ReleaseResult<String> {
    self.run(["commit", "--quiet", "--no-verify", "-m", message])?;
    self.head_commit()
  }

  /// Create an annotated tag at HEAD
  pub fn create_annotated_tag(&self, tag: &str, message: &str) -> ReleaseResult<()> {
    self.run(["tag", "-a", tag, "-m", message, "HEAD"])?;
    Ok(())
  }

  /// Push a single tag to remote
  pub fn push_tag(&self, remote_name: &str, tag: &str) -> ReleaseResult<String> {
    let refspec = format!("refs/tags/{}", tag);
    tracing::debug!("Pushing {} to remote '{}'", refspec, remote_name);

    let output = self
      .git_cmd()
      .args(["push", "--porcelain", remote_name, refspec.as_str()])
      .output()
      .context("Failed to push")?;

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      let stdout = String::from_utf8_lossy(&output.stdout);
      return Err(ReleaseError::Git(GitError::PushFailed {
        remote: remote_name.to_string(),
        refspec,
        reason: format!("{}{}", stdout.trim(), stderr.trim()),
      }));
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
  }
}

/// Parse `git ls-remote --symref <remote> HEAD` output
///
/// Format: "ref: refs/heads/main\tHEAD" followed by "<sha>\tHEAD"
fn parse_symref_head(output: &str) -> Option<String> {
  output.lines().find_map(|line| {
    let target = line.strip_prefix("ref:")?.trim();
    let (reference, name) = target.split_once(char::is_whitespace)?;
    if name.trim() != "HEAD" {
      return None;
    }
    reference.strip_prefix("refs/heads/").map(str::to_string)
  })
}
