//! Release version tags
//!
//! A tag looks like `v1.2.3`, optionally with more dot-separated numbers.
//! The numeric fields are kept as the exact digit strings of the tag so the
//! project's `ProjectVersion` and the generated `ST_LibVersion` constant
//! agree with it byte for byte.
//!
//! Only components 0, 1 and 2 (major, minor, build) and component 4
//! (revision) are used. A fourth component is accepted but does not reach
//! any field, so `v1.2.3.4` has revision `0` and `v1.2.3.4.5` has
//! revision `5`. `sVersion` always carries the full dotted string.

use crate::core::error::{ReleaseError, ReleaseResult};
use crate::twincat::lib_version::LibVersionLiteral;
use regex::Regex;
use std::sync::LazyLock;

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^v([\d.]+)$").expect("version tag pattern is valid"));

const REVISION_INDEX: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseVersion {
  tag: String,
  dotted: String,
  pub major: String,
  pub minor: String,
  pub build: String,
  pub revision: String,
}

impl ReleaseVersion {
  pub fn parse(input: &str) -> ReleaseResult<Self> {
    let invalid = |reason: &str| ReleaseError::InvalidVersion {
      input: input.to_string(),
      reason: reason.to_string(),
    };

    let caps = TAG_RE
      .captures(input)
      .ok_or_else(|| invalid("expected 'v' followed by dot-separated numbers"))?;
    let dotted = caps[1].to_string();

    let components: Vec<&str> = dotted.split('.').collect();
    if components.iter().any(|c| c.is_empty()) {
      return Err(invalid("empty version component"));
    }
    if components.len() < 3 {
      return Err(invalid("at least MAJOR.MINOR.BUILD is required"));
    }

    Ok(Self {
      tag: input.to_string(),
      major: components[0].to_string(),
      minor: components[1].to_string(),
      build: components[2].to_string(),
      revision: components.get(REVISION_INDEX).copied().unwrap_or("0").to_string(),
      dotted,
    })
  }

  /// The tag as given, e.g. `v1.2.3`
  pub fn tag(&self) -> &str {
    &self.tag
  }

  /// The tag without its leading `v`
  pub fn as_dotted(&self) -> &str {
    &self.dotted
  }

  /// `ST_LibVersion` constant for this version under `symbol`
  pub fn literal(&self, symbol: &str) -> LibVersionLiteral {
    LibVersionLiteral {
      symbol: symbol.to_string(),
      major: self.major.clone(),
      minor: self.minor.clone(),
      build: self.build.clone(),
      revision: self.revision.clone(),
      version: self.dotted.clone(),
    }
  }
}
