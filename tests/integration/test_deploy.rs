//! Integration tests for `--deploy`

use crate::helpers::{REPO_NAME, TestRemote, describe};
use anyhow::Result;

const MAKEFILE: &str = "all:\n\t@echo built\n";

fn use_make_program(remote: &TestRemote, program: &str) -> Result<()> {
  std::fs::write(
    remote.run_dir.join("tc-release.toml"),
    format!("[deploy]\nmake_program = \"{}\"\n", program),
  )?;
  Ok(())
}

#[test]
fn test_dry_run_deploy_creates_nothing() -> Result<()> {
  let remote = TestRemote::new()?;
  let target = remote.root.join("deploy");
  std::fs::create_dir_all(&target)?;

  let output = remote.run(&[
    "v1.0.0",
    &remote.url,
    "--dry-run",
    "--deploy",
    "--deploy-path",
    &target.to_string_lossy(),
  ])?;
  assert!(output.status.success(), "{}", describe(&output));

  let stderr = String::from_utf8_lossy(&output.stderr);
  assert!(stderr.contains(&format!("Deploying {}", REPO_NAME)), "{}", describe(&output));
  assert!(!target.join(REPO_NAME).exists());

  Ok(())
}

#[test]
fn test_deploy_category_from_site_top() -> Result<()> {
  let remote = TestRemote::new()?;
  let site_top = remote.root.join("epics");
  std::fs::create_dir_all(site_top.join("ioc/common"))?;
  std::fs::create_dir_all(site_top.join("ioc/plc"))?;

  let site_top_env = site_top.to_string_lossy().to_string();
  let output = remote.run_with_env(
    &["v1.0.0", &remote.url, "--dry-run", "--deploy"],
    &[("EPICS_SITE_TOP", site_top_env.as_str())],
  )?;
  assert!(output.status.success(), "{}", describe(&output));

  let expected = site_top.join("ioc").join("plc").join(REPO_NAME).join("v1.0.0");
  let stderr = String::from_utf8_lossy(&output.stderr);
  assert!(stderr.contains(&expected.display().to_string()), "{}", describe(&output));

  Ok(())
}

#[test]
fn test_deploy_to_missing_path_fails() -> Result<()> {
  let remote = TestRemote::new()?;
  let target = remote.root.join("no-such-dir");

  let output = remote.run(&[
    "v1.0.0",
    &remote.url,
    "--dry-run",
    "--deploy",
    "--deploy-path",
    &target.to_string_lossy(),
  ])?;
  assert_eq!(output.status.code(), Some(1), "{}", describe(&output));

  let stderr = String::from_utf8_lossy(&output.stderr);
  assert!(stderr.contains("does not exist"), "{}", describe(&output));

  Ok(())
}

#[cfg(unix)]
#[test]
fn test_deploy_clones_tag_and_builds() -> Result<()> {
  let remote = TestRemote::builder()
    .project("plc_example")
    .file("iocBoot/ioc-plc-example/Makefile", MAKEFILE)
    .build()?;
  use_make_program(&remote, "true")?;
  let target = remote.root.join("deploy");
  std::fs::create_dir_all(&target)?;

  let output = remote.run(&["v1.0.0", &remote.url, "--deploy", "--deploy-path", &target.to_string_lossy()])?;
  assert!(output.status.success(), "{}", describe(&output));

  let checkout = target.join(REPO_NAME).join("v1.0.0");
  let project = std::fs::read_to_string(checkout.join("plc_example/plc_example.plcproj"))?;
  assert!(project.contains("<ProjectVersion>1.0.0</ProjectVersion>"));
  assert!(checkout.join("plc_example/Version/Global_Version.TcGVL").is_file());

  Ok(())
}

#[cfg(unix)]
#[test]
fn test_failing_build_is_an_error() -> Result<()> {
  let remote = TestRemote::builder()
    .project("plc_example")
    .file("iocBoot/ioc-plc-example/Makefile", MAKEFILE)
    .build()?;
  use_make_program(&remote, "false")?;
  let target = remote.root.join("deploy");
  std::fs::create_dir_all(&target)?;

  let output = remote.run(&["v1.0.0", &remote.url, "--deploy", "--deploy-path", &target.to_string_lossy()])?;
  assert_eq!(output.status.code(), Some(1), "{}", describe(&output));

  let stderr = String::from_utf8_lossy(&output.stderr);
  assert!(stderr.contains("Build failed"), "{}", describe(&output));
  // The release itself went through
  assert_eq!(remote.remote_tags()?, vec!["v1.0.0".to_string()]);

  Ok(())
}
