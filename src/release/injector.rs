//! Writing the release version into a project
//!
//! The project's `ProjectVersion` and the generated declaration both come
//! from one parsed `ReleaseVersion`, so they cannot disagree.

use crate::core::error::ReleaseResult;
use crate::release::version::ReleaseVersion;
use crate::twincat::gvl::{GlobalVersion, ObjectVersions};
use crate::twincat::lib_version::LibVersionLiteral;
use crate::twincat::plcproj::PlcProject;

/// Set the project's version and render the matching global-version
/// declaration.
///
/// `reference` supplies the `Version`/`ProductVersion` attributes of the
/// declaration. Fails if `version_string` is not a release tag, if the
/// project lacks `Title` or `ProjectVersion`, or if the built-in template
/// does not have the expected shape.
pub fn inject_version(
  project: &mut PlcProject,
  reference: &ObjectVersions,
  version_string: &str,
) -> ReleaseResult<GlobalVersion> {
  let version = ReleaseVersion::parse(version_string)?;
  let symbol = LibVersionLiteral::symbol_from_title(&project.title()?);

  project.set_version(version.as_dotted())?;
  tracing::debug!("ProjectVersion set to {}", version.as_dotted());

  let mut gvl = GlobalVersion::from_template()?;
  gvl.apply_object_versions(reference)?;
  let id = gvl.regenerate_id()?;
  gvl.set_literal(&version.literal(&symbol))?;
  tracing::debug!("Rendered stLibVersion_{} with id {}", symbol, id);

  Ok(gvl)
}
