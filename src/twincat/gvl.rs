//! Generated `Global_Version.TcGVL`
//!
//! Built from a fixed skeleton on every release. The skeleton's
//! `Version`/`ProductVersion` are replaced with those of a compiled object
//! from the project (so TwinCAT opens the file without conversion prompts),
//! the GVL gets a fresh id, and its declaration gets the release's
//! `ST_LibVersion` constant.

use crate::core::error::{ProjectError, ReleaseError, ReleaseResult, ResultExt};
use crate::twincat::lib_version::LibVersionLiteral;
use crate::twincat::xml::XmlDocument;
use std::fs;
use std::path::Path;
use uuid::Uuid;

/// File name of the generated declaration
pub const GLOBAL_VERSION_FILE: &str = "Global_Version.TcGVL";

/// Project folder holding the generated declaration
pub const VERSION_FOLDER: &str = "Version";

const TEMPLATE: &str = include_str!("templates/Global_Version.TcGVL");

/// Version attributes of a compiled TwinCAT object's root element
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectVersions {
  pub version: Option<String>,
  pub product_version: Option<String>,
}

impl ObjectVersions {
  pub fn read(doc: &XmlDocument) -> ReleaseResult<Self> {
    let Some(root) = doc.root() else {
      return Ok(Self::default());
    };

    Ok(Self {
      version: doc.attribute(root, "Version")?,
      product_version: doc.attribute(root, "ProductVersion")?,
    })
  }

  pub fn load(path: &Path) -> ReleaseResult<Self> {
    Self::read(&XmlDocument::load(path)?)
  }
}

/// The generated declaration document
#[derive(Debug, Clone)]
pub struct GlobalVersion {
  doc: XmlDocument,
}

impl GlobalVersion {
  /// Start from the built-in skeleton
  pub fn from_template() -> ReleaseResult<Self> {
    Ok(Self::from_document(XmlDocument::parse(TEMPLATE)?))
  }

  pub fn from_document(doc: XmlDocument) -> Self {
    Self { doc }
  }

  /// Copy `Version`/`ProductVersion` onto the root element. Absent values
  /// leave the skeleton's defaults in place.
  pub fn apply_object_versions(&mut self, versions: &ObjectVersions) -> ReleaseResult<()> {
    let root = self.doc.root().ok_or_else(|| malformed("document has no root element"))?;

    if let Some(product_version) = &versions.product_version {
      self.doc.set_attribute(root, "ProductVersion", product_version)?;
    }
    match &versions.version {
      Some(version) => self.doc.set_attribute(root, "Version", version)?,
      None => tracing::warn!("Reference object has no Version attribute; keeping the template's"),
    }

    Ok(())
  }

  /// Give the GVL element a new random id, returning it
  pub fn regenerate_id(&mut self) -> ReleaseResult<String> {
    let gvl = self.doc.find_element("GVL").ok_or_else(|| malformed("missing GVL element"))?;
    let id = Uuid::new_v4().to_string();
    self.doc.set_attribute(gvl, "Id", &id)?;
    Ok(id)
  }

  /// Current declaration text (CDATA contents)
  pub fn declaration(&self) -> ReleaseResult<String> {
    Ok(self.doc.text(self.declaration_index()?)?.unwrap_or_default())
  }

  /// Swap the declaration's `ST_LibVersion` constant for `literal`
  pub fn set_literal(&mut self, literal: &LibVersionLiteral) -> ReleaseResult<()> {
    let rewritten = literal
      .rewrite(&self.declaration()?)
      .ok_or_else(|| malformed("declaration has no ST_LibVersion constant"))?;
    let idx = self.declaration_index()?;
    self.doc.set_cdata(idx, &rewritten)
  }

  /// Serialized file contents
  pub fn render(&self) -> ReleaseResult<String> {
    self.doc.to_xml_string()
  }

  pub fn save(&self, path: &Path) -> ReleaseResult<()> {
    fs::write(path, self.render()?).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
  }

  fn declaration_index(&self) -> ReleaseResult<usize> {
    self
      .doc
      .find_element("Declaration")
      .ok_or_else(|| malformed("missing Declaration element"))
  }
}

fn malformed(reason: &str) -> ReleaseError {
  ReleaseError::Project(ProjectError::MalformedTemplate {
    reason: reason.to_string(),
  })
}
