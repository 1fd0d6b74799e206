//! Portable directory archive: one directory per message.
//!
//! A message directory is named
//! `<date_millis>_<participants>_<DIRECTION>_<checksum>` and contains an
//! `info` metadata file plus the attachment files under their logical
//! names.

pub mod info;
pub mod reader;
pub mod writer;

/// Name of the metadata file inside each message directory.
pub const INFO_FILE: &str = "info";
