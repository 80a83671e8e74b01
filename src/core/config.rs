//! Tool configuration, resolved once at startup
//!
//! Everything that depends on the platform or the environment (scratch
//! directory naming, which git binary to run, where IOCs are deployed) lives
//! here so that the rest of the pipeline never reads ambient process state.
//!
//! Sources, lowest precedence first:
//! 1. Built-in defaults (per platform)
//! 2. An optional `tc-release.toml` in the current directory
//! 3. Environment variables (`EPICS_SITE_TOP`)

use crate::core::error::{ConfigError, ReleaseError, ReleaseResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default deploy root when neither the environment nor the config file set one
pub const DEFAULT_SITE_TOP: &str = "/cds/group/pcds/epics";

/// Environment variable overriding the deploy root
pub const SITE_TOP_ENV: &str = "EPICS_SITE_TOP";

/// Platform conventions that affect configuration defaults
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
  Windows,
  Posix,
}

impl Platform {
  pub fn current() -> Self {
    if cfg!(windows) { Platform::Windows } else { Platform::Posix }
  }

  /// Scratch directory name: hidden on POSIX, tilde-prefixed on Windows
  pub fn work_dir_name(self) -> &'static str {
    match self {
      Platform::Windows => "~tc-release-tmp",
      Platform::Posix => ".tc-release-tmp",
    }
  }
}

/// Resolved configuration passed to every stage that needs it
#[derive(Debug, Clone)]
pub struct ToolConfig {
  /// Name of the scratch directory created under the current directory
  pub work_dir_name: String,
  pub git: GitConfig,
  pub deploy: DeployConfig,
}

#[derive(Debug, Clone)]
pub struct GitConfig {
  /// git executable
  pub program: PathBuf,
  /// ssh executable handed to git as `GIT_SSH`
  pub ssh: Option<PathBuf>,
  /// Commit identity overrides
  pub user_name: Option<String>,
  pub user_email: Option<String>,
}

impl Default for GitConfig {
  fn default() -> Self {
    Self {
      program: PathBuf::from("git"),
      ssh: None,
      user_name: None,
      user_email: None,
    }
  }
}

#[derive(Debug, Clone)]
pub struct DeployConfig {
  /// EPICS site top; IOCs are deployed below `<site_top>/ioc`
  pub site_top: PathBuf,
  /// Build tool run in every directory holding a Makefile
  pub make_program: String,
}

/// On-disk configuration file (all fields optional)
///
/// ```toml
/// [git]
/// program = "/usr/local/bin/git"
/// user_name = "Release Bot"
/// user_email = "release@example.com"
///
/// [deploy]
/// site_top = "/reg/g/pcds/epics"
/// make_program = "make"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
  #[serde(default)]
  pub git: GitSection,
  #[serde(default)]
  pub deploy: DeploySection,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GitSection {
  #[serde(default)]
  pub program: Option<PathBuf>,
  #[serde(default)]
  pub ssh: Option<PathBuf>,
  #[serde(default)]
  pub user_name: Option<String>,
  #[serde(default)]
  pub user_email: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeploySection {
  #[serde(default)]
  pub site_top: Option<PathBuf>,
  #[serde(default)]
  pub make_program: Option<String>,
}

impl FileConfig {
  /// Find config file in search order: tc-release.toml, .tc-release.toml, .config/tc-release.toml
  pub fn find_config_path(path: &Path) -> Option<PathBuf> {
    let candidates = vec![
      path.join("tc-release.toml"),
      path.join(".tc-release.toml"),
      path.join(".config").join("tc-release.toml"),
    ];

    candidates.into_iter().find(|p| p.is_file())
  }

  /// Load the config file if there is one; a missing file is not an error
  pub fn load(path: &Path) -> ReleaseResult<Option<Self>> {
    let Some(config_path) = Self::find_config_path(path) else {
      return Ok(None);
    };

    let content = fs::read_to_string(&config_path)?;
    let config: FileConfig = toml_edit::de::from_str(&content).map_err(|e| {
      ReleaseError::Config(ConfigError::Invalid {
        path: config_path.clone(),
        reason: e.to_string(),
      })
    })?;

    tracing::debug!("Loaded configuration from {}", config_path.display());
    Ok(Some(config))
  }
}

impl ToolConfig {
  /// Resolve configuration for the current process
  pub fn resolve(cwd: &Path) -> ReleaseResult<Self> {
    let file = FileConfig::load(cwd)?.unwrap_or_default();
    Ok(Self::from_sources(
      Platform::current(),
      file,
      |key| std::env::var(key).ok(),
      |path| path.is_dir(),
    ))
  }

  /// Combine defaults, file values and environment lookups.
  ///
  /// `env` and `dir_exists` are injected so resolution can be tested without
  /// touching the real process environment.
  pub fn from_sources(
    platform: Platform,
    file: FileConfig,
    env: impl Fn(&str) -> Option<String>,
    dir_exists: impl Fn(&Path) -> bool,
  ) -> Self {
    let mut git = GitConfig::default();

    if platform == Platform::Windows
      && let Some(user) = env("USERNAME")
    {
      let local_install = PathBuf::from(format!("C:\\Users\\{}\\AppData\\Local\\Programs\\Git\\", user));
      if dir_exists(&local_install) {
        git.program = local_install.join("mingw64").join("bin").join("git.exe");
        git.ssh = Some(local_install.join("usr").join("bin").join("ssh.exe"));
      }
    }

    if let Some(program) = file.git.program {
      git.program = program;
    }
    if file.git.ssh.is_some() {
      git.ssh = file.git.ssh;
    }
    git.user_name = file.git.user_name;
    git.user_email = file.git.user_email;

    let site_top = env(SITE_TOP_ENV)
      .filter(|v| !v.is_empty())
      .map(PathBuf::from)
      .or(file.deploy.site_top)
      .unwrap_or_else(|| PathBuf::from(DEFAULT_SITE_TOP));

    Self {
      work_dir_name: platform.work_dir_name().to_string(),
      git,
      deploy: DeployConfig {
        site_top,
        make_program: file.deploy.make_program.unwrap_or_else(|| "make".to_string()),
      },
    }
  }
}
