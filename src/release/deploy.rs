//! Deploy trigger
//!
//! After a release, an IOC repository can be cloned at the new tag into the
//! shared EPICS area and built there. The layout is
//! `<target>/<repo_name>/<tag>`, where `<target>` is either given explicitly
//! or derived from the repository name: `ioc-kfe-motion` deploys under
//! `<site_top>/ioc/kfe` when that directory exists.

use crate::core::config::ToolConfig;
use crate::core::error::{DeployError, ReleaseError, ReleaseResult, ResultExt};
use crate::core::vcs::SystemGit;
use crate::utils::repo_name_from_url;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use walkdir::WalkDir;

/// Where a release ends up, and which directories get built
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployPlan {
  pub repo_name: String,
  /// `<target>/<repo_name>/<tag>`
  pub checkout_dir: PathBuf,
}

/// Directory the repository's deployments live under (`<target>`)
pub fn resolve_target(repo_name: &str, deploy_path: Option<&Path>, site_top: &Path) -> ReleaseResult<PathBuf> {
  let target = match deploy_path {
    Some(path) => path.to_path_buf(),
    None => {
      let ioc_dir = site_top.join("ioc");
      let category = find_category(repo_name, &ioc_dir)?.ok_or_else(|| {
        ReleaseError::Deploy(DeployError::TargetUndetermined {
          repo_name: repo_name.to_string(),
          ioc_dir: ioc_dir.clone(),
        })
      })?;
      ioc_dir.join(category)
    }
  };

  if !target.is_dir() {
    return Err(ReleaseError::Deploy(DeployError::TargetMissing { path: target }));
  }
  Ok(target)
}

/// First subdirectory of `ioc_dir` (by name) that is one of the
/// hyphen-separated parts of `repo_name`
fn find_category(repo_name: &str, ioc_dir: &Path) -> ReleaseResult<Option<String>> {
  let entries = match fs::read_dir(ioc_dir) {
    Ok(entries) => entries,
    Err(e) => {
      tracing::debug!("Cannot list {}: {}", ioc_dir.display(), e);
      return Ok(None);
    }
  };

  let mut categories = Vec::new();
  for entry in entries {
    let entry = entry?;
    if entry.file_type()?.is_dir() {
      categories.push(entry.file_name().to_string_lossy().into_owned());
    }
  }
  categories.sort();

  let parts: Vec<&str> = repo_name.split('-').collect();
  Ok(categories.into_iter().find(|c| parts.contains(&c.as_str())))
}

/// Top-most directories holding a `Makefile`
///
/// Once a directory has a Makefile its subdirectories are not searched: the
/// top-level Makefile is expected to build them.
pub fn find_makefiles(dir: &Path) -> ReleaseResult<Vec<PathBuf>> {
  let mut found = Vec::new();

  let mut walker = WalkDir::new(dir)
    .sort_by_file_name()
    .into_iter()
    .filter_entry(|entry| entry.file_name() != ".git");
  while let Some(entry) = walker.next() {
    let entry = entry?;
    if entry.file_type().is_dir() && entry.path().join("Makefile").is_file() {
      found.push(entry.into_path());
      walker.skip_current_dir();
    }
  }

  Ok(found)
}

/// Work out where `tag` of `repo_url` would be deployed
pub fn plan(repo_url: &str, tag: &str, deploy_path: Option<&Path>, config: &ToolConfig) -> ReleaseResult<DeployPlan> {
  let repo_name = repo_name_from_url(repo_url);
  let target = resolve_target(&repo_name, deploy_path, &config.deploy.site_top)?;

  Ok(DeployPlan {
    checkout_dir: target.join(&repo_name).join(tag),
    repo_name,
  })
}

/// Clone `tag` of `repo_url` into its deploy location and build it
pub fn make_deploy(
  repo_url: &str,
  tag: &str,
  deploy_path: Option<&Path>,
  config: &ToolConfig,
  dry_run: bool,
) -> ReleaseResult<DeployPlan> {
  let plan = plan(repo_url, tag, deploy_path, config)?;
  tracing::info!("Deploying {} to {} at {}", plan.repo_name, plan.checkout_dir.display(), tag);

  if dry_run {
    tracing::info!("Dry run: skipping clone and build");
    return Ok(plan);
  }

  if let Some(repo_dir) = plan.checkout_dir.parent() {
    fs::create_dir_all(repo_dir).with_context(|| format!("Failed to create {}", repo_dir.display()))?;
  }
  SystemGit::clone_at_tag(repo_url, tag, &plan.checkout_dir, &config.git)?;

  for dir in find_makefiles(&plan.checkout_dir)? {
    run_make(&config.deploy.make_program, &dir)?;
  }

  Ok(plan)
}

fn run_make(program: &str, dir: &Path) -> ReleaseResult<()> {
  tracing::info!("Running {} in {}", program, dir.display());
  let status = Command::new(program)
    .current_dir(dir)
    .status()
    .with_context(|| format!("Failed to execute {}", program))?;

  if !status.success() {
    return Err(ReleaseError::Deploy(DeployError::BuildFailed {
      dir: dir.to_path_buf(),
      status: status.to_string(),
    }));
  }
  Ok(())
}
