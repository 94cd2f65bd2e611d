//! Loads a real file from disk into the in-memory buffer a [`Content`] tree
//! is built over, ported from `memio.c`'s `loadFile`/`unloadFile`/`nameOnly`.
//!
//! Per spec.md's Non-goals this is "external collaborator" territory — the
//! hard core only cares about bytes already in memory — but the binary needs
//! something here to be runnable end-to-end, so it's kept to exactly what
//! the original does: read the whole file, note its mtime, and strip any
//! leading directory from the name.

use std::fs;
use std::path::Path;
use std::time::UNIX_EPOCH;

use crate::content::Timestamp;
use crate::naming::map_case;

/// A whole file read into memory, the root buffer every `Content` in its
/// tree eventually borrows a slice of.
pub struct LoadedFile {
    pub buf: Vec<u8>,
    pub fname: String,
    pub fdate: Option<Timestamp>,
}

/// Strips any leading directory components, mirroring `nameOnly`.
fn name_only(path: &Path) -> String {
    path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default()
}

/// Reads `path` into memory. On failure, prints the same one-line
/// diagnostic `loadFile` does and returns `None` so the caller can skip to
/// the next input rather than aborting the whole run.
pub fn load_file(path: &Path) -> Option<LoadedFile> {
    let meta = match fs::metadata(path) {
        Ok(m) => m,
        Err(_) => {
            crate::displayout!(" cannot open\n");
            return None;
        }
    };
    let buf = match fs::read(path) {
        Ok(b) => b,
        Err(_) => {
            crate::displayout!(" problem reading\n");
            return None;
        }
    };
    let fdate = meta
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs() as Timestamp);
    Some(LoadedFile {
        buf,
        fname: map_case(&name_only(path)),
        fdate,
    })
}
