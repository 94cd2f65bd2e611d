//! Writes a processed `Content` tree into a single ZIP archive instead of a
//! real directory tree.
//!
//! The original source's equivalent (`zipfile.c` / `zip.h`) wraps the
//! Info-Zip C library; no example in this pack demonstrates writing a ZIP,
//! so this is written directly against the `zip` crate's own writer API
//! rather than ported from a specific file (see `DESIGN.md`).

use std::fs::File;
use std::io::Write;
use std::path::Path;

use zip::write::{SimpleFileOptions, ZipWriter};
use zip::CompressionMethod;

use crate::content::{Content, Kind, Timestamp};
use crate::error::MlbrError;
use crate::timestamp::unix_to_civil;

/// Writes `node` (and, for a `Library`, every descendant) into a new ZIP
/// archive at `path`, using each node's `save_path` for the entry name and
/// nesting libraries as ZIP directory prefixes.
pub fn write_zip(node: &Content, path: &Path) -> Result<(), MlbrError> {
    let file = File::create(path).map_err(|e| MlbrError::Io { path: path.to_path_buf(), source: e })?;
    let mut zip = ZipWriter::new(file);
    add_node(&mut zip, node, "", path)?;
    zip.finish().map_err(|e| MlbrError::Zip { path: path.to_path_buf(), source: e })?;
    Ok(())
}

fn add_node(zip: &mut ZipWriter<File>, node: &Content, prefix: &str, archive_path: &Path) -> Result<(), MlbrError> {
    match node.kind {
        Kind::Skipped | Kind::Missing => Ok(()),
        Kind::Library => {
            let child_prefix = match entry_name(node) {
                Some(name) => format!("{prefix}{name}/"),
                None => prefix.to_string(),
            };
            for child in &node.children {
                add_node(zip, child, &child_prefix, archive_path)?;
            }
            Ok(())
        }
        _ => {
            let Some(name) = entry_name(node) else {
                return Ok(());
            };
            let entry = format!("{prefix}{name}");
            let mut options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
            if let Some(dt) = node.output.fdate.and_then(to_zip_datetime) {
                options = options.last_modified_time(dt);
            }
            zip.start_file(entry, options)
                .map_err(|e| MlbrError::Zip { path: archive_path.to_path_buf(), source: e })?;
            zip.write_all(&node.output.buf)
                .map_err(|e| MlbrError::Io { path: archive_path.to_path_buf(), source: e })?;
            Ok(())
        }
    }
}

fn entry_name(node: &Content) -> Option<String> {
    node.save_path
        .as_ref()
        .and_then(|p| p.file_name())
        .map(|n| n.to_string_lossy().into_owned())
}

/// Converts a Unix timestamp into the `zip` crate's packed DOS-range
/// `DateTime`, which only covers 1980-2107; years outside that range are
/// dropped (the entry is still written, just without a modified-time).
fn to_zip_datetime(ts: Timestamp) -> Option<zip::DateTime> {
    let (year, month, day, hour, minute, second) = unix_to_civil(ts);
    if !(1980..=2107).contains(&year) {
        return None;
    }
    zip::DateTime::from_date_and_time(year as u16, month as u8, day as u8, hour as u8, minute as u8, second as u8).ok()
}
