//! Error types for tc-release with contextual messages
//!
//! Every failure that ends a release attempt is a `ReleaseError`. Errors are
//! grouped by the stage that raised them, and most carry a help message that
//! is shown to the user alongside the error itself.
//!
//! None of these are retried internally. An existing release tag is not an
//! error at all: the pipeline reports it as an already-completed release.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Main error type for tc-release
#[derive(Debug)]
pub enum ReleaseError {
  /// Configuration errors
  Config(ConfigError),

  /// Git operation errors
  Git(GitError),

  /// Project discovery and XML structure errors
  Project(ProjectError),

  /// Version string does not match `vMAJOR.MINOR.BUILD[.REVISION]`
  InvalidVersion { input: String, reason: String },

  /// Deploy target resolution and build errors
  Deploy(DeployError),

  /// I/O errors
  Io(io::Error),

  /// Generic error with message and optional context
  Message {
    message: String,
    context: Option<String>,
    help: Option<String>,
  },
}

impl ReleaseError {
  /// Create a simple error message
  pub fn message(msg: impl Into<String>) -> Self {
    ReleaseError::Message {
      message: msg.into(),
      context: None,
      help: None,
    }
  }

  /// Add context to an existing error
  pub fn context(self, ctx: impl Into<String>) -> Self {
    let ctx_str = ctx.into();
    match self {
      ReleaseError::Message { message, context, help } => ReleaseError::Message {
        message,
        context: Some(context.map(|c| format!("{}\n{}", ctx_str, c)).unwrap_or(ctx_str)),
        help,
      },
      // The underlying cause becomes the detail line under the context
      ReleaseError::Io(err) => ReleaseError::Message {
        message: ctx_str,
        context: Some(err.to_string()),
        help: None,
      },
      _ => self,
    }
  }

  /// Get contextual help message for this error
  pub fn help_message(&self) -> Option<String> {
    match self {
      ReleaseError::Config(e) => e.help_message(),
      ReleaseError::Git(e) => e.help_message(),
      ReleaseError::Project(e) => e.help_message(),
      ReleaseError::InvalidVersion { .. } => {
        Some("Use a tag such as v1.2.3 (MAJOR.MINOR.BUILD, optionally followed by more numbers).".to_string())
      }
      ReleaseError::Deploy(e) => e.help_message(),
      ReleaseError::Message { help, .. } => help.clone(),
      ReleaseError::Io(_) => None,
    }
  }
}

impl fmt::Display for ReleaseError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ReleaseError::Config(e) => write!(f, "{}", e),
      ReleaseError::Git(e) => write!(f, "{}", e),
      ReleaseError::Project(e) => write!(f, "{}", e),
      ReleaseError::InvalidVersion { input, reason } => {
        write!(f, "Invalid version string '{}': {}", input, reason)
      }
      ReleaseError::Deploy(e) => write!(f, "{}", e),
      ReleaseError::Io(e) => write!(f, "I/O error: {}", e),
      ReleaseError::Message { message, context, .. } => {
        write!(f, "{}", message)?;
        if let Some(ctx) = context {
          write!(f, "\n{}", ctx)?;
        }
        Ok(())
      }
    }
  }
}

impl std::error::Error for ReleaseError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      ReleaseError::Io(e) => Some(e),
      _ => None,
    }
  }
}

impl From<io::Error> for ReleaseError {
  fn from(err: io::Error) -> Self {
    ReleaseError::Io(err)
  }
}

impl From<quick_xml::Error> for ReleaseError {
  fn from(err: quick_xml::Error) -> Self {
    ReleaseError::message(format!("XML error: {}", err))
  }
}

impl From<quick_xml::events::attributes::AttrError> for ReleaseError {
  fn from(err: quick_xml::events::attributes::AttrError) -> Self {
    ReleaseError::message(format!("XML attribute error: {}", err))
  }
}

impl From<toml_edit::de::Error> for ReleaseError {
  fn from(err: toml_edit::de::Error) -> Self {
    ReleaseError::message(format!("TOML deserialization error: {}", err))
  }
}

impl From<std::string::FromUtf8Error> for ReleaseError {
  fn from(err: std::string::FromUtf8Error) -> Self {
    ReleaseError::message(format!("UTF-8 conversion error: {}", err))
  }
}

impl From<walkdir::Error> for ReleaseError {
  fn from(err: walkdir::Error) -> Self {
    ReleaseError::message(format!("Directory walk error: {}", err))
  }
}

impl From<glob::PatternError> for ReleaseError {
  fn from(err: glob::PatternError) -> Self {
    ReleaseError::message(format!("Invalid file pattern: {}", err))
  }
}

/// Configuration-related errors
#[derive(Debug)]
pub enum ConfigError {
  /// Config file exists but cannot be used
  Invalid { path: PathBuf, reason: String },
}

impl ConfigError {
  fn help_message(&self) -> Option<String> {
    match self {
      ConfigError::Invalid { path, .. } => Some(format!(
        "Fix or remove {}. Supported sections are [git] and [deploy].",
        path.display()
      )),
    }
  }
}

impl fmt::Display for ConfigError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ConfigError::Invalid { path, reason } => {
        write!(f, "Invalid tc-release configuration in {}: {}", path.display(), reason)
      }
    }
  }
}

/// Git operation errors
#[derive(Debug)]
pub enum GitError {
  /// Git command failed
  CommandFailed { command: String, stderr: String },

  /// Remote repository does not exist or cannot be reached
  RepoNotFound { url: String },

  /// Push failed
  PushFailed {
    remote: String,
    refspec: String,
    reason: String,
  },

  /// Scratch directory is already there (usually left by a dry run)
  WorkspaceOccupied { path: PathBuf },
}

impl GitError {
  fn help_message(&self) -> Option<String> {
    match self {
      GitError::PushFailed { reason, .. } => {
        if reason.contains("already exists") {
          Some("The tag already exists on the remote. Pick a new version number.".to_string())
        } else if reason.contains("Permission denied") || reason.contains("403") {
          Some("Check your SSH key or credentials for the remote repository.".to_string())
        } else {
          None
        }
      }
      GitError::RepoNotFound { .. } => {
        Some("Check the repository URL and that you have read access to it.".to_string())
      }
      GitError::WorkspaceOccupied { path } => Some(format!(
        "Remove {} (left over from a previous dry run?) and try again.",
        path.display()
      )),
      GitError::CommandFailed { .. } => None,
    }
  }
}

impl fmt::Display for GitError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      GitError::CommandFailed { command, stderr } => {
        write!(f, "Git command failed: {}\n{}", command, stderr)
      }
      GitError::RepoNotFound { url } => {
        write!(f, "Repo URL does not exist: {}", url)
      }
      GitError::PushFailed { remote, refspec, reason } => {
        write!(f, "Push of {} to {} failed: {}", refspec, remote, reason)
      }
      GitError::WorkspaceOccupied { path } => {
        write!(f, "Working directory already exists: {}", path.display())
      }
    }
  }
}

/// Project discovery and XML structure errors
#[derive(Debug)]
pub enum ProjectError {
  /// No file matched the project pattern
  NotFound { pattern: String, root: PathBuf },

  /// The requested project name did not match any candidate
  SelectorNotFound { selector: String, pattern: String },

  /// More than one project matched and no selector was given
  Ambiguous { pattern: String, candidates: Vec<PathBuf> },

  /// `ProjectVersion` or `Title` missing from the project descriptor
  TitleOrVersionTagMissing { path: PathBuf },

  /// The Global_Version template lost an element it relies on
  MalformedTemplate { reason: String },

  /// No compiled object to take version metadata from
  ReferenceNotFound { pattern: String, root: PathBuf },
}

impl ProjectError {
  fn help_message(&self) -> Option<String> {
    match self {
      ProjectError::Ambiguous { candidates, .. } => {
        let names: Vec<String> = candidates
          .iter()
          .filter_map(|p| p.file_stem())
          .map(|s| s.to_string_lossy().to_string())
          .collect();
        Some(format!("Select one with --plcproj <name>. Candidates: {}", names.join(", ")))
      }
      ProjectError::SelectorNotFound { .. } => {
        Some("--plcproj takes the project file name without its extension.".to_string())
      }
      ProjectError::TitleOrVersionTagMissing { .. } => Some(
        "Did you forget to set the plc project version to 0.0.0 or select an appropriate project title in TwinCAT?"
          .to_string(),
      ),
      ProjectError::ReferenceNotFound { .. } => {
        Some("The project needs at least one POU so its TwinCAT version can be determined.".to_string())
      }
      _ => None,
    }
  }
}

impl fmt::Display for ProjectError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ProjectError::NotFound { pattern, root } => {
        write!(f, "Did not find {} file in {}", pattern, root.display())
      }
      ProjectError::SelectorNotFound { selector, pattern } => {
        write!(f, "Did not find specified project '{}' among {} files", selector, pattern)
      }
      ProjectError::Ambiguous { pattern, candidates } => {
        write!(f, "Found {} files matching {}", candidates.len(), pattern)
      }
      ProjectError::TitleOrVersionTagMissing { path } => {
        write!(
          f,
          "Did not find a plc project version tag or a title tag in {}",
          path.display()
        )
      }
      ProjectError::MalformedTemplate { reason } => {
        write!(f, "Malformed Global_Version template: {}", reason)
      }
      ProjectError::ReferenceNotFound { pattern, root } => {
        write!(f, "Did not find any {} file in {}", pattern, root.display())
      }
    }
  }
}

/// Deploy errors
#[derive(Debug)]
pub enum DeployError {
  /// No `--deploy-path` and no IOC category matches the repository name
  TargetUndetermined { repo_name: String, ioc_dir: PathBuf },

  /// Deploy directory does not exist
  TargetMissing { path: PathBuf },

  /// The build tool exited unsuccessfully
  BuildFailed { dir: PathBuf, status: String },
}

impl DeployError {
  fn help_message(&self) -> Option<String> {
    match self {
      DeployError::TargetUndetermined { .. } => Some("Pass --deploy-path to choose the directory explicitly.".to_string()),
      DeployError::TargetMissing { .. } => Some("Verify you used a valid path.".to_string()),
      DeployError::BuildFailed { .. } => None,
    }
  }
}

impl fmt::Display for DeployError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      DeployError::TargetUndetermined { repo_name, ioc_dir } => {
        write!(
          f,
          "Cannot determine where to deploy IOC for {} (no matching category in {})",
          repo_name,
          ioc_dir.display()
        )
      }
      DeployError::TargetMissing { path } => {
        write!(f, "{} does not exist!", path.display())
      }
      DeployError::BuildFailed { dir, status } => {
        write!(f, "Build failed in {}: {}", dir.display(), status)
      }
    }
  }
}

/// Result type alias for tc-release
pub type ReleaseResult<T> = Result<T, ReleaseError>;

/// Helper trait to add context to Results
pub trait ResultExt<T> {
  /// Add context to an error result
  fn context(self, ctx: impl Into<String>) -> ReleaseResult<T>;

  /// Add context using a closure (lazy evaluation)
  fn with_context<F>(self, f: F) -> ReleaseResult<T>
  where
    F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
  E: Into<ReleaseError>,
{
  fn context(self, ctx: impl Into<String>) -> ReleaseResult<T> {
    self.map_err(|e| e.into().context(ctx))
  }

  fn with_context<F>(self, f: F) -> ReleaseResult<T>
  where
    F: FnOnce() -> String,
  {
    self.map_err(|e| e.into().context(f()))
  }
}

/// Report an error through the logger: the message at error level, help at
/// info level, and the full debug rendering only when debug logging is on.
pub fn print_error(error: &ReleaseError) {
  tracing::debug!("{:?}", error);
  tracing::error!("{}", error);

  if let Some(help) = error.help_message() {
    tracing::info!("help: {}", help);
  }
}
