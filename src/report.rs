//! JSON report persistence.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;
use serde_json::ser::PrettyFormatter;

use crate::error::{Error, Result};

/// Serialize a value as pretty JSON with four-space indentation and
/// non-ASCII text left unescaped.
pub fn to_json_string<T: Serialize>(value: &T) -> Result<String> {
    let mut out = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    value
        .serialize(&mut serializer)
        .map_err(|e| Error::Persistence(e.to_string()))?;
    String::from_utf8(out).map_err(|e| Error::Persistence(e.to_string()))
}

/// Write a value as a pretty JSON file, creating missing parent directories.
///
/// Failures surface as [`Error::Persistence`] so callers can report them
/// without discarding the computed results.
pub fn write_json<T: Serialize, P: AsRef<Path>>(value: &T, path: P) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| {
                Error::Persistence(format!("failed to create {}: {e}", parent.display()))
            })?;
        }
    }

    let file = File::create(path)
        .map_err(|e| Error::Persistence(format!("failed to create {}: {e}", path.display())))?;
    let mut writer = BufWriter::new(file);
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut writer, formatter);
    value
        .serialize(&mut serializer)
        .map_err(|e| Error::Persistence(format!("failed to write {}: {e}", path.display())))?;
    writer
        .flush()
        .map_err(|e| Error::Persistence(format!("failed to write {}: {e}", path.display())))
}
