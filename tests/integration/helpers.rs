//! Test helpers for integration tests

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// Scratch directory name the tool uses on this platform
pub const WORK_DIR: &str = if cfg!(windows) { "~tc-release-tmp" } else { ".tc-release-tmp" };

/// Name of the bare remote (and so of the repository, for deploys)
pub const REPO_NAME: &str = "lcls-plc-example";

/// A bare "remote" repository holding TwinCAT projects, plus a directory to
/// run the tool from
pub struct TestRemote {
  _root: TempDir,
  pub root: PathBuf,
  /// Bare repository, usable as a clone URL
  pub url: String,
  /// Current directory for tool runs
  pub run_dir: PathBuf,
}

/// Builder for `TestRemote`
pub struct TestRemoteBuilder {
  projects: Vec<String>,
  files: Vec<(String, String)>,
  tags: Vec<String>,
}

impl TestRemote {
  /// Remote with a single project, `plc_example`
  pub fn new() -> Result<Self> {
    Self::builder().project("plc_example").build()
  }

  pub fn builder() -> TestRemoteBuilder {
    TestRemoteBuilder {
      projects: Vec::new(),
      files: Vec::new(),
      tags: Vec::new(),
    }
  }

  /// Where the tool keeps its working copy during (and after a dry) run
  pub fn work_dir(&self) -> PathBuf {
    self.run_dir.join(WORK_DIR)
  }

  /// Run tc-release from `run_dir`
  pub fn run(&self, args: &[&str]) -> Result<Output> {
    run_tc_release(&self.run_dir, &self.root, args, &[])
  }

  /// Run tc-release from `run_dir` with extra environment variables
  pub fn run_with_env(&self, args: &[&str], env: &[(&str, &str)]) -> Result<Output> {
    run_tc_release(&self.run_dir, &self.root, args, env)
  }

  /// Tags present in the remote
  pub fn remote_tags(&self) -> Result<Vec<String>> {
    let output = git(&self.root, &["--git-dir", &self.url, "tag", "--list"])?;
    Ok(
      String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(String::from)
        .collect(),
    )
  }

  /// Contents of a file at a revision of the remote
  pub fn remote_file(&self, rev: &str, path: &str) -> Result<String> {
    let spec = format!("{}:{}", rev, path);
    let output = git(&self.root, &["--git-dir", &self.url, "show", &spec])?;
    Ok(String::from_utf8_lossy(&output.stdout).to_string())
  }
}

impl TestRemoteBuilder {
  /// Add a project `<name>/<name>.plcproj` with one POU
  pub fn project(mut self, name: &str) -> Self {
    self.projects.push(name.to_string());
    self
  }

  /// Add an arbitrary file
  pub fn file(mut self, path: &str, content: &str) -> Self {
    self.files.push((path.to_string(), content.to_string()));
    self
  }

  /// Tag the seed commit (annotated)
  pub fn tag(mut self, tag: &str) -> Self {
    self.tags.push(tag.to_string());
    self
  }

  pub fn build(self) -> Result<TestRemote> {
    let root_dir = TempDir::new()?;
    let root = root_dir.path().to_path_buf();
    let seed = root.join("seed");
    let run_dir = root.join("run");
    std::fs::create_dir_all(&seed)?;
    std::fs::create_dir_all(&run_dir)?;

    git(&seed, &["init", "--quiet", "--initial-branch=main"])?;
    git(&seed, &["config", "user.name", "Test User"])?;
    git(&seed, &["config", "user.email", "test@example.com"])?;

    for name in &self.projects {
      write(&seed.join(name).join(format!("{}.plcproj", name)), &plcproj(name))?;
      write(&seed.join(name).join("POUs").join("MAIN.TcPOU"), MAIN_POU)?;
    }
    for (path, content) in &self.files {
      write(&seed.join(path), content)?;
    }

    git(&seed, &["add", "."])?;
    git(&seed, &["commit", "--quiet", "-m", "Initial PLC project"])?;
    for tag in &self.tags {
      git(&seed, &["tag", "-a", tag, "-m", tag])?;
    }

    let bare = format!("{}.git", REPO_NAME);
    git(&root, &["clone", "--quiet", "--bare", "seed", &bare])?;
    let url = root.join(&bare).to_string_lossy().to_string();

    Ok(TestRemote {
      _root: root_dir,
      root,
      url,
      run_dir,
    })
  }
}

/// Project descriptor in the shape TwinCAT XAE writes
pub fn plcproj(name: &str) -> String {
  format!(
    r#"<?xml version="1.0" encoding="utf-8"?>
<Project DefaultTargets="Build" xmlns="http://schemas.microsoft.com/developer/msbuild/2003">
  <PropertyGroup>
    <FileVersion>1.0.0.0</FileVersion>
    <SchemaVersion>2.0</SchemaVersion>
    <ProjectGuid>{{6a0b2e9e-4a77-4c2f-8a3c-0d4e1c5f7b21}}</ProjectGuid>
    <OutputType>Exe</OutputType>
    <AssemblyName>{name}</AssemblyName>
    <Name>{name}</Name>
    <ProgramVersion>3.1.4024.12</ProgramVersion>
    <Application>{{c5d9f2a4-1b3e-4f8a-9d6c-2e7b0a4c8f13}}</Application>
    <TypeSystem>{{1e8b4c7d-3a2f-4b9e-8c5d-6f0a1b2c3d4e}}</TypeSystem>
    <Implicit_Task_Info>{{9f3c2b1a-7e6d-4c5b-8a9f-0e1d2c3b4a59}}</Implicit_Task_Info>
    <Company>SLAC</Company>
    <Released>false</Released>
    <Title>lcls-plc-example</Title>
    <ProjectVersion>0.0.0</ProjectVersion>
  </PropertyGroup>
  <ItemGroup>
    <Compile Include="POUs\MAIN.TcPOU">
      <SubType>Code</SubType>
    </Compile>
  </ItemGroup>
  <ItemGroup>
    <Folder Include="POUs" />
  </ItemGroup>
</Project>
"#
  )
}

pub const MAIN_POU: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<TcPlcObject Version="1.1.0.1" ProductVersion="3.1.4024.12">
  <POU Name="MAIN" Id="{3e1f2a4b-5c6d-4e7f-8a9b-0c1d2e3f4a5b}" SpecialFunc="None">
    <Declaration><![CDATA[PROGRAM MAIN
VAR
END_VAR
]]></Declaration>
    <Implementation>
      <ST><![CDATA[]]></ST>
    </Implementation>
  </POU>
</TcPlcObject>
"#;

fn write(path: &Path, content: &str) -> Result<()> {
  if let Some(parent) = path.parent() {
    std::fs::create_dir_all(parent)?;
  }
  std::fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
}

/// Run git command in a directory
pub fn git(cwd: &Path, args: &[&str]) -> Result<Output> {
  let output = Command::new("git")
    .current_dir(cwd)
    .args(args)
    .output()
    .context("Failed to run git command")?;

  if !output.status.success() {
    let stderr = String::from_utf8_lossy(&output.stderr);
    anyhow::bail!("Git command failed: git {}\n{}", args.join(" "), stderr);
  }

  Ok(output)
}

/// Run the tc-release binary. The exit status is left to the caller.
///
/// `home` isolates the run from the user's git configuration; the commit
/// identity comes from the environment instead.
pub fn run_tc_release(cwd: &Path, home: &Path, args: &[&str], env: &[(&str, &str)]) -> Result<Output> {
  let bin = env!("CARGO_BIN_EXE_tc-release");

  let mut cmd = Command::new(bin);
  cmd
    .current_dir(cwd)
    .args(args)
    .env("HOME", home)
    .env("GIT_AUTHOR_NAME", "Release Tester")
    .env("GIT_AUTHOR_EMAIL", "release@example.com")
    .env("GIT_COMMITTER_NAME", "Release Tester")
    .env("GIT_COMMITTER_EMAIL", "release@example.com")
    .env_remove("RUST_LOG")
    .env_remove("EPICS_SITE_TOP");
  for (key, value) in env {
    cmd.env(key, value);
  }

  cmd.output().context("Failed to run tc-release")
}

/// stdout and stderr, for assertion messages
pub fn describe(output: &Output) -> String {
  format!(
    "status: {}\nstdout: {}\nstderr: {}",
    output.status,
    String::from_utf8_lossy(&output.stdout),
    String::from_utf8_lossy(&output.stderr)
  )
}
