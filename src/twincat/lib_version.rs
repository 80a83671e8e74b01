//! `ST_LibVersion` struct literal
//!
//! The generated GVL exposes the release version to the PLC runtime through
//! one constant of the form:
//!
//! ```text
//! stLibVersion_<Title> : ST_LibVersion := (iMajor := 1, iMinor := 2, iBuild := 3, iRevision := 0, sVersion := '1.2.3');
//! ```
//!
//! `find` locates and parses an existing literal inside declaration text,
//! `Display` renders one, and `rewrite` swaps one for the other while leaving
//! the rest of the declaration untouched.

use regex::Regex;
use std::fmt;
use std::ops::Range;
use std::sync::LazyLock;

static LITERAL_RE: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(concat!(
    r"stLibVersion_(?P<symbol>\w+)\s*:\s*ST_LibVersion\s*:=\s*\(\s*",
    r"iMajor\s*:=\s*(?P<major>\d+)\s*,\s*",
    r"iMinor\s*:=\s*(?P<minor>\d+)\s*,\s*",
    r"iBuild\s*:=\s*(?P<build>\d+)\s*,\s*",
    r"iRevision\s*:=\s*(?P<revision>\d+)\s*,\s*",
    r"sVersion\s*:=\s*'(?P<version>[^']*)'\s*\)\s*;",
  ))
  .expect("ST_LibVersion pattern is valid")
});

/// Parsed (or to-be-rendered) version constant
///
/// Numeric fields are kept as the exact digit strings of the version tag so
/// that the constant agrees with `ProjectVersion` byte for byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibVersionLiteral {
  /// Suffix after `stLibVersion_`
  pub symbol: String,
  pub major: String,
  pub minor: String,
  pub build: String,
  pub revision: String,
  /// `sVersion` string value
  pub version: String,
}

impl LibVersionLiteral {
  /// Turn a project title into a symbol suffix: spaces and hyphens become
  /// underscores
  pub fn symbol_from_title(title: &str) -> String {
    title.replace([' ', '-'], "_")
  }

  /// First literal in `text`, with its byte range
  pub fn find(text: &str) -> Option<(Range<usize>, Self)> {
    let caps = LITERAL_RE.captures(text)?;
    let whole = caps.get(0)?;

    let literal = Self {
      symbol: caps["symbol"].to_string(),
      major: caps["major"].to_string(),
      minor: caps["minor"].to_string(),
      build: caps["build"].to_string(),
      revision: caps["revision"].to_string(),
      version: caps["version"].to_string(),
    };

    Some((whole.range(), literal))
  }

  /// Replace the first literal in `text` with `self`.
  ///
  /// Returns `None` when `text` holds no literal to replace.
  pub fn rewrite(&self, text: &str) -> Option<String> {
    let (range, _) = Self::find(text)?;

    let mut out = String::with_capacity(text.len() + 16);
    out.push_str(&text[..range.start]);
    out.push_str(&self.to_string());
    out.push_str(&text[range.end..]);
    Some(out)
  }
}

impl fmt::Display for LibVersionLiteral {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "stLibVersion_{} : ST_LibVersion := (iMajor := {}, iMinor := {}, iBuild := {}, iRevision := {}, sVersion := '{}');",
      self.symbol, self.major, self.minor, self.build, self.revision, self.version
    )
  }
}
