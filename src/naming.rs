//! OS-safe name generation: case mapping, illegal-character substitution,
//! reserved-name prefixing and collision avoidance.
//!
//! Ported from `os.c`'s `mapCase`/`chkReserved`/`uniqueName`. The original
//! compiles two variants of the illegal-character set and the reserved-name
//! check behind `#ifdef _WIN32`; this keeps a single, conservative
//! Windows-safe rule set on every host so that a tree extracted on Linux
//! still unpacks cleanly if it's later copied to Windows — a deliberate
//! simplification noted in `DESIGN.md`.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

/// Global "keep original case" switch, set once from the CLI's `-k` flag.
static KEEP_CASE: AtomicBool = AtomicBool::new(false);

pub fn set_keep_case(keep: bool) {
    KEEP_CASE.store(keep, Ordering::Relaxed);
}

/// Lower-cases `name` unless `-k`/`--keep-case` was given, mirroring
/// `mapCase`.
pub fn map_case(name: &str) -> String {
    if KEEP_CASE.load(Ordering::Relaxed) {
        name.to_owned()
    } else {
        name.to_lowercase()
    }
}

const ILLEGAL_CHARS: &[char] = &['/', '\\', '|', '"', '<', '>', ':', '?', '*'];

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if ILLEGAL_CHARS.contains(&c) { '_' } else { c })
        .collect()
}

/// Whether `stem` (the part of the name before the extension) collides with
/// a DOS/Windows reserved device name (`CON`, `PRN`, `AUX`, `NUL`, `COM1`-
/// `COM9`, `LPT1`-`LPT9`), mirroring `chkReserved`.
fn is_reserved(stem: &str) -> bool {
    let lower = stem.to_ascii_lowercase();
    matches!(lower.as_str(), "con" | "prn" | "aux" | "nul")
        || ((lower.starts_with("com") || lower.starts_with("lpt"))
            && lower.len() == 4
            && lower.as_bytes()[3].is_ascii_digit())
}

/// Splits `name` into (stem, extension-including-dot), mirroring the
/// `strrchr(fname, '.')` split in `uniqueName`.
fn split_ext(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(i) => (&name[..i], &name[i..]),
        None => (name, ""),
    }
}

/// Tracks every save path handed out so far so that later calls produce
/// distinct names — the "global name collision table" of spec.md §5,
/// a case-insensitive analogue of `chkClash`'s hash table.
#[derive(Default)]
pub struct CollisionTable {
    seen: HashSet<String>,
}

impl CollisionTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn claim(&mut self, path: &str) -> bool {
        self.seen.insert(path.to_ascii_lowercase())
    }

    /// Produces an unused path under `dir` for `fname`, trying the plain
    /// (sanitized, case-mapped) name first and then `stem(1).ext`,
    /// `stem(2).ext`, … up to 99, matching `uniqueName`.
    pub fn unique_name(&mut self, dir: &Path, fname: &str) -> PathBuf {
        let prefix = if is_reserved(split_ext(fname).0) { "_" } else { "" };
        let (stem, ext) = split_ext(fname);

        for i in 0..100 {
            let candidate = if i == 0 {
                format!("{prefix}{stem}{ext}")
            } else {
                format!("{prefix}{stem}({i}){ext}")
            };
            let candidate = map_case(&sanitize(&candidate));
            let path = dir.join(&candidate);
            if self.claim(&path.to_string_lossy()) {
                return path;
            }
        }
        // Exhausted all 100 slots: fall back to the last attempt rather
        // than aborting the whole run (the original exits the process).
        dir.join(format!("{prefix}{stem}(99){ext}"))
    }
}

/// Replaces (or removes) the extension of `name`, mirroring `replaceExt`.
pub fn replace_ext(name: &str, ext: &str) -> String {
    let (stem, _) = split_ext(name);
    format!("{stem}{ext}")
}
