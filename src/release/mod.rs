//! The release pipeline
//!
//! One release runs these steps in order, each failing the whole release:
//!
//! 1. `preparer`: fetch the remote and check out its default branch
//! 2. `locator`: find the project descriptor (and a compiled object to copy
//!    TwinCAT version attributes from)
//! 3. `injector`: set `ProjectVersion` and render `Global_Version.TcGVL`
//! 4. `PlcProject::link_generated_file`: list the generated file in the project
//! 5. `committer`: commit both files, tag, push the tag
//!
//! `deploy` runs afterwards, from the command, when requested.
//!
//! An existing tag stops the pipeline early with `ReleaseOutcome::AlreadyReleased`.

pub mod committer;
pub mod deploy;
pub mod injector;
pub mod locator;
pub mod preparer;
pub mod version;

use crate::core::error::{ReleaseResult, ResultExt};
use crate::core::vcs::SystemGit;
use crate::twincat::gvl::{GLOBAL_VERSION_FILE, ObjectVersions, VERSION_FOLDER};
use crate::twincat::plcproj::PlcProject;
use committer::CommitOutcome;
use std::fs;
use std::path::PathBuf;
use version::ReleaseVersion;

/// A validated release request
#[derive(Debug, Clone)]
pub struct ReleaseRequest {
  pub version: ReleaseVersion,
  pub repo_url: String,
  /// File stem of the project to release when the repository has several
  pub selector: Option<String>,
  pub deploy: bool,
  pub deploy_path: Option<PathBuf>,
  pub dry_run: bool,
}

impl ReleaseRequest {
  /// Validate the version string up front, before anything touches the
  /// network
  pub fn new(version_string: &str, repo_url: impl Into<String>) -> ReleaseResult<Self> {
    Ok(Self {
      version: ReleaseVersion::parse(version_string)?,
      repo_url: repo_url.into(),
      selector: None,
      deploy: false,
      deploy_path: None,
      dry_run: false,
    })
  }

  pub fn tag(&self) -> &str {
    self.version.tag()
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseOutcome {
  /// The tag already existed on the remote
  AlreadyReleased,

  Released {
    /// Project descriptor that was versioned
    project: PathBuf,
    /// Generated declaration file
    declaration: PathBuf,
    commit: String,
    /// Whether the tag was pushed (false for dry runs)
    pushed: bool,
  },
}

/// Run the release pipeline in `repo`, a freshly initialised repository
pub fn make_release(repo: &SystemGit, request: &ReleaseRequest) -> ReleaseResult<ReleaseOutcome> {
  let tag = request.tag();
  let branch = preparer::prepare(repo, &request.repo_url)?;

  if repo.has_tag(tag)? {
    tracing::info!("{} is already tagged as {}; skipping", request.repo_url, tag);
    return Ok(ReleaseOutcome::AlreadyReleased);
  }

  let root = repo.work_tree();
  let project_path = locator::find_project(root, locator::PROJECT_PATTERN, request.selector.as_deref())?;
  let mut project = PlcProject::load(&project_path)?;
  tracing::info!(
    "Releasing {} from {} ({} -> {})",
    project.path().display(),
    branch,
    project.version()?,
    request.version.as_dotted()
  );

  let reference_path = locator::find_reference_object(root)?;
  tracing::debug!("Copying TwinCAT version attributes from {}", reference_path.display());
  let reference = ObjectVersions::load(&reference_path)?;

  let gvl = injector::inject_version(&mut project, &reference, tag)?;

  let project_dir = project_path.parent().unwrap_or(root);
  let version_dir = project_dir.join(VERSION_FOLDER);
  fs::create_dir_all(&version_dir).with_context(|| format!("Failed to create {}", version_dir.display()))?;
  let declaration_path = version_dir.join(GLOBAL_VERSION_FILE);
  gvl.save(&declaration_path)?;
  tracing::info!("Wrote {}", declaration_path.display());

  let include = format!("{}\\{}", VERSION_FOLDER, GLOBAL_VERSION_FILE);
  project.link_generated_file(VERSION_FOLDER, &include)?;
  project.save()?;

  let message = committer::release_message(tag);
  let outcome = committer::commit_and_tag(
    repo,
    &[&declaration_path, &project_path],
    tag,
    &message,
    request.dry_run,
  )?;

  Ok(match outcome {
    CommitOutcome::AlreadyTagged => ReleaseOutcome::AlreadyReleased,
    CommitOutcome::Tagged { commit, pushed } => ReleaseOutcome::Released {
      project: project_path,
      declaration: declaration_path,
      commit,
      pushed: pushed.is_some(),
    },
  })
}
