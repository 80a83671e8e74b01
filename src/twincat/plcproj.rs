//! `.plcproj` project descriptor
//!
//! MSBuild-style XML. Only three things are touched: the `Title` (read), the
//! `ProjectVersion` (rewritten) and the `ItemGroup` entries that make the
//! generated `Version\Global_Version.TcGVL` part of the build.

use crate::core::error::{ProjectError, ReleaseError, ReleaseResult};
use crate::twincat::xml::XmlDocument;
use std::path::{Path, PathBuf};

const ITEM_GROUP: &str = "ItemGroup";

#[derive(Debug, Clone)]
pub struct PlcProject {
  path: PathBuf,
  doc: XmlDocument,
}

impl PlcProject {
  pub fn load(path: &Path) -> ReleaseResult<Self> {
    Ok(Self {
      path: path.to_path_buf(),
      doc: XmlDocument::load(path)?,
    })
  }

  /// Wrap an already-parsed document; `path` is used for error reporting
  /// and as the default save location
  pub fn from_document(path: impl Into<PathBuf>, doc: XmlDocument) -> Self {
    Self { path: path.into(), doc }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  /// Write back to the file the project was loaded from
  pub fn save(&self) -> ReleaseResult<()> {
    self.doc.save(&self.path)
  }

  /// Project title, surrounding whitespace trimmed
  pub fn title(&self) -> ReleaseResult<String> {
    let idx = self.doc.find_element("Title").ok_or_else(|| self.tag_missing())?;
    Ok(self.doc.text(idx)?.unwrap_or_default().trim().to_string())
  }

  pub fn version(&self) -> ReleaseResult<String> {
    let idx = self.doc.find_element("ProjectVersion").ok_or_else(|| self.tag_missing())?;
    Ok(self.doc.text(idx)?.unwrap_or_default().trim().to_string())
  }

  pub fn set_version(&mut self, version: &str) -> ReleaseResult<()> {
    let idx = self.doc.find_element("ProjectVersion").ok_or_else(|| self.tag_missing())?;
    self.doc.set_text(idx, version)
  }

  /// Make sure `folder` and `file` (a backslash-separated include path
  /// inside it) are listed in the project. Existing entries are left alone,
  /// so calling this repeatedly changes nothing after the first time.
  pub fn link_generated_file(&mut self, folder: &str, file: &str) -> ReleaseResult<()> {
    if !self.has_item("Folder", folder)? {
      self.insert_item("Folder", &format!(r#"<Folder Include="{}" />"#, folder), &[])?;
      tracing::debug!("Added folder '{}' to {}", folder, self.path.display());
    }

    if !self.has_item("Compile", file)? {
      self.insert_item(
        "Compile",
        &format!(r#"<Compile Include="{}">"#, file),
        &["<SubType>Code</SubType>", "</Compile>"],
      )?;
      tracing::debug!("Added compile item '{}' to {}", file, self.path.display());
    }

    Ok(())
  }

  /// Whether an item of `kind` already includes `include`. Include paths
  /// compare the way MSBuild resolves them: case-insensitive, either slash.
  fn has_item(&self, kind: &str, include: &str) -> ReleaseResult<bool> {
    let wanted = normalize_include(include);
    let count = self
      .doc
      .count_in_parent(ITEM_GROUP, kind, "Include", |value| normalize_include(value) == wanted)?;
    Ok(count > 0)
  }

  /// Place a new item next to the first item of the same kind, or in a new
  /// item group at the end of the project when there is none.
  ///
  /// `tail` holds the remaining lines of a multi-line item: every line but
  /// the last is nested one level deeper than the opening line.
  fn insert_item(&mut self, kind: &str, head: &str, tail: &[&str]) -> ReleaseResult<()> {
    if let Some(anchor) = self.doc.find_in_parent(ITEM_GROUP, kind, None)? {
      let indent = self.doc.indentation_of(anchor);
      let fragment = item_fragment(self.doc.line_ending(), &indent, head, tail);
      return self.doc.insert_after(anchor, &fragment);
    }

    let root = self
      .doc
      .root()
      .ok_or_else(|| ReleaseError::message(format!("{} has no root element", self.path.display())))?;
    let group_indent = format!("{}  ", self.doc.indentation_of(root));
    let item_indent = format!("{}  ", group_indent);
    let newline = self.doc.line_ending();
    let group = format!(
      "<{group}>{newline}{item_indent}{item}{newline}{group_indent}</{group}>",
      group = ITEM_GROUP,
      item = item_fragment(newline, &item_indent, head, tail),
    );
    self.doc.append_child(root, &group)
  }

  fn tag_missing(&self) -> ReleaseError {
    ReleaseError::Project(ProjectError::TitleOrVersionTagMissing {
      path: self.path.clone(),
    })
  }
}

fn normalize_include(include: &str) -> String {
  include.trim().replace('/', "\\").to_lowercase()
}

fn item_fragment(newline: &str, indent: &str, head: &str, tail: &[&str]) -> String {
  let mut fragment = head.to_string();
  for (i, line) in tail.iter().enumerate() {
    let nested = if i + 1 < tail.len() { "  " } else { "" };
    fragment.push_str(newline);
    fragment.push_str(indent);
    fragment.push_str(nested);
    fragment.push_str(line);
  }
  fragment
}
