//! `tc-release` command implementation
//!
//! Owns the scratch workspace for the duration of the pipeline, prints the
//! summary, and runs the deploy step when asked.

use crate::core::config::ToolConfig;
use crate::core::error::ReleaseResult;
use crate::core::workspace::Workspace;
use crate::release::{ReleaseOutcome, ReleaseRequest, deploy, make_release};
use std::path::Path;

/// Release `request` using a scratch workspace under `cwd`
pub fn run_release(request: &ReleaseRequest, config: &ToolConfig, cwd: &Path) -> ReleaseResult<()> {
  let work_dir = cwd.join(&config.work_dir_name);

  // The workspace is removed when this scope ends, whatever the outcome
  let outcome = {
    let workspace = Workspace::create(&work_dir, &config.git, request.dry_run)?;
    tracing::debug!("Releasing {} in {}", request.repo_url, workspace.path().display());
    make_release(workspace.repo(), request)?
  };

  print_summary(request, &outcome, &work_dir);

  if request.deploy {
    let plan = deploy::make_deploy(
      &request.repo_url,
      request.tag(),
      request.deploy_path.as_deref(),
      config,
      request.dry_run,
    )?;
    if !request.dry_run {
      println!("🚀 Deployed to {}", plan.checkout_dir.display());
    }
  }

  Ok(())
}

fn print_summary(request: &ReleaseRequest, outcome: &ReleaseOutcome, work_dir: &Path) {
  match outcome {
    ReleaseOutcome::AlreadyReleased => {
      println!("✅ {} is already released; nothing to do", request.tag());
    }
    ReleaseOutcome::Released {
      project,
      declaration,
      commit,
      pushed,
    } => {
      println!("📦 Release {}", request.tag());
      println!("  Project:     {}", display_relative(project, work_dir));
      println!("  Declaration: {}", display_relative(declaration, work_dir));
      println!("  Commit:      {}", commit);
      if *pushed {
        println!("✅ Pushed {} to origin", request.tag());
      } else {
        println!("🔍 Dry-run mode: tag not pushed, workspace kept at {}", work_dir.display());
      }
    }
  }
}

fn display_relative(path: &Path, base: &Path) -> String {
  path.strip_prefix(base).unwrap_or(path).display().to_string()
}
