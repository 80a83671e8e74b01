//! System git backend
//!
//! Every operation shells out to the configured `git` binary with an
//! isolated environment, so a user's global hooks, signing setup or pager
//! cannot change what a release does.

use crate::core::config::GitConfig;
use crate::core::error::{GitError, ReleaseError, ReleaseResult, ResultExt};
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// Environment variables passed through to git; everything else is cleared
const PASSTHROUGH_ENV: &[&str] = &[
  "PATH",
  "HOME",
  "USERPROFILE",
  "HOMEDRIVE",
  "HOMEPATH",
  "SYSTEMROOT",
  "TEMP",
  "TMP",
  "SSH_AUTH_SOCK",
  "SSH_ASKPASS",
  "GIT_SSH_COMMAND",
  "GIT_ASKPASS",
  "GIT_SSL_CAINFO",
  "GIT_SSL_CAPATH",
  "SSL_CERT_FILE",
  "SSL_CERT_DIR",
  "http_proxy",
  "https_proxy",
  "no_proxy",
  "all_proxy",
  "HTTP_PROXY",
  "HTTPS_PROXY",
  "NO_PROXY",
  "ALL_PROXY",
  "XDG_CONFIG_HOME",
  "LANG",
  "LC_ALL",
  "GIT_CONFIG_PARAMETERS",
  "GIT_AUTHOR_NAME",
  "GIT_AUTHOR_EMAIL",
  "GIT_COMMITTER_NAME",
  "GIT_COMMITTER_EMAIL",
];

/// Hooks directory that never contains a hook
#[cfg(windows)]
const NO_HOOKS: &str = "NUL";
#[cfg(not(windows))]
const NO_HOOKS: &str = "/dev/null";

/// Handle on a local repository driven through system git
#[derive(Debug)]
pub struct SystemGit {
  /// Working tree root
  pub(crate) work_tree: PathBuf,

  /// How to invoke git (binary, ssh, identity)
  config: GitConfig,
}

impl SystemGit {
  /// Create an empty repository at `path`, creating the directory if needed
  pub fn init(path: &Path, config: &GitConfig) -> ReleaseResult<Self> {
    let output = base_command(config)
      .args(["init", "--quiet"])
      .arg(path)
      .output()
      .with_context(|| format!("Failed to execute {}", config.program.display()))?;

    if !output.status.success() {
      return Err(command_failed("git init", &output));
    }

    Ok(Self {
      work_tree: path.to_path_buf(),
      config: config.clone(),
    })
  }

  /// Shallow-clone `url` at `tag` into `dest`
  pub fn clone_at_tag(url: &str, tag: &str, dest: &Path, config: &GitConfig) -> ReleaseResult<Self> {
    let output = base_command(config)
      .args(["clone", "--quiet", "--depth", "1", "--branch", tag, url])
      .arg(dest)
      .output()
      .context("Failed to execute git clone")?;

    if !output.status.success() {
      return Err(command_failed("git clone", &output));
    }

    Ok(Self {
      work_tree: dest.to_path_buf(),
      config: config.clone(),
    })
  }

  /// Working tree root
  pub fn work_tree(&self) -> &Path {
    &self.work_tree
  }

  /// Get HEAD commit SHA
  pub fn head_commit(&self) -> ReleaseResult<String> {
    let output = self.run(["rev-parse", "HEAD"])?;
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
  }

  /// Get current branch name
  pub fn current_branch(&self) -> ReleaseResult<String> {
    let output = self
      .git_cmd()
      .args(["rev-parse", "--abbrev-ref", "HEAD"])
      .output()
      .context("Failed to get current branch")?;

    if !output.status.success() {
      return Ok("HEAD".to_string()); // Detached HEAD
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
  }

  /// Run a git subcommand and fail with its stderr if it exits non-zero
  pub(crate) fn run<I, S>(&self, args: I) -> ReleaseResult<Output>
  where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
  {
    let args: Vec<S> = args.into_iter().collect();
    let command = format!(
      "git {}",
      args
        .iter()
        .map(|a| a.as_ref().to_string_lossy().to_string())
        .collect::<Vec<_>>()
        .join(" ")
    );

    tracing::trace!("Running {}", command);
    let output = self
      .git_cmd()
      .args(&args)
      .output()
      .with_context(|| format!("Failed to execute {}", command))?;

    if !output.status.success() {
      return Err(command_failed(&command, &output));
    }

    Ok(output)
  }

  /// Create a safe git command with isolated environment
  ///
  /// - Sets working directory to the work tree
  /// - Clears environment variables except a short whitelist
  /// - Adds safe configuration overrides
  pub(crate) fn git_cmd(&self) -> Command {
    let mut cmd = base_command(&self.config);
    cmd.arg("-C").arg(&self.work_tree);
    cmd
  }
}

/// Build a git command that is not yet bound to a repository
fn base_command(config: &GitConfig) -> Command {
  let mut cmd = Command::new(&config.program);

  // Isolated environment (don't trust global config)
  pass_environment(&mut cmd, |key| std::env::var_os(key));
  cmd.env("GIT_TERMINAL_PROMPT", "0");
  if let Some(ssh) = &config.ssh {
    cmd.env("GIT_SSH", ssh);
  }

  // Force safe behavior (override user config)
  cmd.arg("-c").arg("advice.detachedHead=false");
  cmd.arg("-c").arg("core.quotePath=false"); // Don't escape non-ASCII
  cmd.arg("-c").arg("commit.gpgsign=false");
  cmd.arg("-c").arg("tag.gpgsign=false");
  cmd.arg("-c").arg(format!("core.hooksPath={}", NO_HOOKS)); // Ignore every hook
  if let Some(name) = &config.user_name {
    cmd.arg("-c").arg(format!("user.name={}", name));
  }
  if let Some(email) = &config.user_email {
    cmd.arg("-c").arg(format!("user.email={}", email));
  }

  cmd
}

/// Clear the environment, then copy over the whitelisted keys `lookup` knows
fn pass_environment(cmd: &mut Command, lookup: impl Fn(&str) -> Option<OsString>) {
  cmd.env_clear();
  for key in PASSTHROUGH_ENV {
    if let Some(value) = lookup(key) {
      cmd.env(key, value);
    }
  }
}

fn command_failed(command: &str, output: &Output) -> ReleaseError {
  ReleaseError::Git(GitError::CommandFailed {
    command: command.to_string(),
    stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
  })
}
