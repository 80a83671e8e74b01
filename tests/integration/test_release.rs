//! Integration tests for the release pipeline

use crate::helpers::{TestRemote, describe, git};
use anyhow::Result;

const DECLARATION: &str = "plc_example/Version/Global_Version.TcGVL";
const PROJECT: &str = "plc_example/plc_example.plcproj";

#[test]
fn test_dry_run_keeps_workspace_and_does_not_push() -> Result<()> {
  let remote = TestRemote::new()?;

  let output = remote.run(&["v999.999.999", &remote.url, "--dry-run"])?;
  assert!(output.status.success(), "{}", describe(&output));

  let work = remote.work_dir();
  let project = std::fs::read_to_string(work.join(PROJECT))?;
  assert!(project.contains("<ProjectVersion>999.999.999</ProjectVersion>"));

  let declaration = std::fs::read_to_string(work.join(DECLARATION))?;
  assert!(declaration.contains(
    "stLibVersion_lcls_plc_example : ST_LibVersion := (iMajor := 999, iMinor := 999, iBuild := 999, iRevision := 0, sVersion := '999.999.999');"
  ));
  assert!(declaration.contains(r#"<TcPlcObject Version="1.1.0.1" ProductVersion="3.1.4024.12">"#));
  assert!(declaration.contains("<Declaration><![CDATA["));

  assert!(remote.remote_tags()?.is_empty());
  let stdout = String::from_utf8_lossy(&output.stdout);
  assert!(stdout.contains("Dry-run mode"), "{}", describe(&output));

  Ok(())
}

#[test]
fn test_piped_logs_have_no_color_codes() -> Result<()> {
  let remote = TestRemote::new()?;

  let output = remote.run(&["v1.0.0", &remote.url, "--dry-run"])?;
  assert!(output.status.success(), "{}", describe(&output));

  let stderr = String::from_utf8_lossy(&output.stderr);
  assert!(stderr.contains("INFO"), "{}", describe(&output));
  assert!(!stderr.contains('\x1b'), "{}", describe(&output));

  Ok(())
}

#[cfg(unix)]
#[test]
fn test_global_hooks_cannot_block_the_release() -> Result<()> {
  use std::os::unix::fs::PermissionsExt;

  let remote = TestRemote::new()?;
  let hooks = remote.root.join("hooks");
  std::fs::create_dir_all(&hooks)?;
  for hook in ["pre-commit", "prepare-commit-msg", "post-commit", "pre-push"] {
    let path = hooks.join(hook);
    std::fs::write(&path, "#!/bin/sh\necho HOOK-RAN >&2\nexit 1\n")?;
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))?;
  }
  std::fs::write(
    remote.root.join(".gitconfig"),
    format!("[core]\n\thooksPath = {}\n", hooks.display()),
  )?;

  let output = remote.run(&["v1.0.0", &remote.url])?;
  assert!(output.status.success(), "{}", describe(&output));
  assert!(!String::from_utf8_lossy(&output.stderr).contains("HOOK-RAN"));
  assert_eq!(remote.remote_tags()?, vec!["v1.0.0".to_string()]);

  Ok(())
}

#[test]
fn test_five_component_version_uses_fifth_as_revision() -> Result<()> {
  let remote = TestRemote::new()?;

  let output = remote.run(&["v1.2.3.4.5", &remote.url, "--dry-run"])?;
  assert!(output.status.success(), "{}", describe(&output));

  let declaration = std::fs::read_to_string(remote.work_dir().join(DECLARATION))?;
  assert!(declaration.contains("iMajor := 1, iMinor := 2, iBuild := 3, iRevision := 5, sVersion := '1.2.3.4.5'"));

  let project = std::fs::read_to_string(remote.work_dir().join(PROJECT))?;
  assert!(project.contains("<ProjectVersion>1.2.3.4.5</ProjectVersion>"));

  Ok(())
}

#[test]
fn test_release_pushes_annotated_tag_and_cleans_up() -> Result<()> {
  let remote = TestRemote::new()?;

  let output = remote.run(&["v1.0.0", &remote.url])?;
  assert!(output.status.success(), "{}", describe(&output));

  assert_eq!(remote.remote_tags()?, vec!["v1.0.0".to_string()]);
  assert!(!remote.work_dir().exists(), "workspace should be removed");

  let project = remote.remote_file("v1.0.0", PROJECT)?;
  assert!(project.contains("<ProjectVersion>1.0.0</ProjectVersion>"));
  assert!(project.contains(r#"<Folder Include="Version" />"#));
  assert!(project.contains(r#"<Compile Include="Version\Global_Version.TcGVL">"#));

  let declaration = remote.remote_file("v1.0.0", DECLARATION)?;
  assert!(declaration.contains("sVersion := '1.0.0'"));

  let tag = git(&remote.root, &["--git-dir", &remote.url, "cat-file", "-p", "v1.0.0"])?;
  let tag = String::from_utf8_lossy(&tag.stdout);
  assert!(tag.contains("type commit"), "v1.0.0 should be an annotated tag");
  assert!(tag.contains("Tagging version v1.0.0"));

  Ok(())
}

#[test]
fn test_existing_tag_is_skipped_successfully() -> Result<()> {
  let remote = TestRemote::builder().project("plc_example").tag("v2.0.0").build()?;

  let output = remote.run(&["v2.0.0", &remote.url])?;
  assert!(output.status.success(), "{}", describe(&output));

  let stdout = String::from_utf8_lossy(&output.stdout);
  assert!(stdout.contains("already released"), "{}", describe(&output));
  assert!(!remote.work_dir().exists());

  // Untouched: the tag still points at the seed commit
  let project = remote.remote_file("v2.0.0", PROJECT)?;
  assert!(project.contains("<ProjectVersion>0.0.0</ProjectVersion>"));

  Ok(())
}

#[test]
fn test_releasing_twice_links_generated_file_once() -> Result<()> {
  let remote = TestRemote::new()?;

  let first = remote.run(&["v1.0.0", &remote.url])?;
  assert!(first.status.success(), "{}", describe(&first));

  // Only the tag was pushed; move the branch onto the release commit so the
  // next release starts from an already linked project
  git(
    &remote.root,
    &["--git-dir", &remote.url, "update-ref", "refs/heads/main", "v1.0.0^{commit}"],
  )?;

  let second = remote.run(&["v1.0.1", &remote.url])?;
  assert!(second.status.success(), "{}", describe(&second));

  let project = remote.remote_file("v1.0.1", PROJECT)?;
  assert!(project.contains("<ProjectVersion>1.0.1</ProjectVersion>"));
  assert_eq!(project.matches(r#"<Folder Include="Version" />"#).count(), 1);
  assert_eq!(
    project.matches(r#"<Compile Include="Version\Global_Version.TcGVL">"#).count(),
    1
  );

  Ok(())
}

#[test]
fn test_invalid_version_fails_before_cloning() -> Result<()> {
  let remote = TestRemote::new()?;

  let output = remote.run(&["1.0.0", &remote.url])?;
  assert_eq!(output.status.code(), Some(1), "{}", describe(&output));

  let stderr = String::from_utf8_lossy(&output.stderr);
  assert!(stderr.contains("Invalid version string"), "{}", describe(&output));
  assert!(!remote.work_dir().exists());

  Ok(())
}

#[test]
fn test_missing_repository_fails_and_cleans_up() -> Result<()> {
  let remote = TestRemote::new()?;
  let missing = remote.root.join("missing.git");

  let output = remote.run(&["v1.0.0", &missing.to_string_lossy()])?;
  assert_eq!(output.status.code(), Some(1), "{}", describe(&output));

  let stderr = String::from_utf8_lossy(&output.stderr);
  assert!(stderr.contains("Repo URL does not exist"), "{}", describe(&output));
  assert!(!remote.work_dir().exists());

  Ok(())
}

#[test]
fn test_several_projects_need_plcproj_selector() -> Result<()> {
  let remote = TestRemote::builder().project("plc_example").project("plc_other").build()?;

  let output = remote.run(&["v1.0.0", &remote.url])?;
  assert_eq!(output.status.code(), Some(1), "{}", describe(&output));
  assert!(remote.remote_tags()?.is_empty());

  let output = remote.run(&["v1.0.0", &remote.url, "--plcproj", "plc_other"])?;
  assert!(output.status.success(), "{}", describe(&output));

  let released = remote.remote_file("v1.0.0", "plc_other/plc_other.plcproj")?;
  assert!(released.contains("<ProjectVersion>1.0.0</ProjectVersion>"));
  let untouched = remote.remote_file("v1.0.0", PROJECT)?;
  assert!(untouched.contains("<ProjectVersion>0.0.0</ProjectVersion>"));

  Ok(())
}

#[test]
fn test_occupied_workspace_is_left_alone() -> Result<()> {
  let remote = TestRemote::new()?;
  std::fs::create_dir_all(remote.work_dir())?;
  std::fs::write(remote.work_dir().join("keep.txt"), "mine")?;

  let output = remote.run(&["v1.0.0", &remote.url])?;
  assert_eq!(output.status.code(), Some(1), "{}", describe(&output));
  assert_eq!(std::fs::read_to_string(remote.work_dir().join("keep.txt"))?, "mine");

  Ok(())
}
