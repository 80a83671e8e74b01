//! TwinCAT file formats
//!
//! - `xml`: lossless event-list XML document shared by the formats below
//! - `plcproj`: project descriptor (version, title, item groups)
//! - `lib_version`: the `ST_LibVersion` constant literal
//! - `gvl`: the generated `Global_Version.TcGVL` declaration

pub mod gvl;
pub mod lib_version;
pub mod plcproj;
pub mod xml;
