//! Library-level error and status types.
//!
//! `DecodeStatus` mirrors the four-way classification the original decoders
//! return (`GOOD`/`BADCRC`/`CORRUPT`/`BADHEADER` in `mlbr.h`). It is not an
//! error in the `std::error::Error` sense — a `BadCrc` stream still produces
//! bytes the driver may choose to keep — so decoders return it directly
//! rather than wrapping it in `Result`. `MlbrError` covers the failures that
//! really do abort an operation (I/O, sink construction), in the same manual
//! `Display` + `std::error::Error` style as the teacher's `Lz4FError`.

use std::fmt;
use std::path::PathBuf;

/// Outcome of attempting to decode one compressed member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeStatus {
    /// Decoded cleanly and the trailer CRC matched (or no CRC was present).
    Good,
    /// Decoded cleanly but the trailer CRC did not match the decoded bytes.
    BadCrc,
    /// The bit/byte stream ended before the decoder reached a valid
    /// terminator, or an internal table invariant was violated.
    Corrupt,
    /// The fixed-format header (name, size fields, comment) could not be
    /// parsed.
    BadHeader,
}

impl DecodeStatus {
    /// Whether the decoded bytes in `Content::output` are usable at all.
    /// `BadCrc` still counts — the bytes are produced, just unverified.
    pub fn has_output(self) -> bool {
        matches!(self, DecodeStatus::Good | DecodeStatus::BadCrc)
    }
}

impl fmt::Display for DecodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DecodeStatus::Good => "good",
            DecodeStatus::BadCrc => "bad CRC",
            DecodeStatus::Corrupt => "corrupt",
            DecodeStatus::BadHeader => "bad header",
        };
        f.write_str(s)
    }
}

/// Failures that abort processing of a file or one of its sinks outright.
#[derive(Debug)]
pub enum MlbrError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Zip {
        path: PathBuf,
        source: zip::result::ZipError,
    },
}

impl fmt::Display for MlbrError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MlbrError::Io { path, source } => {
                write!(f, "{}: {}", path.display(), source)
            }
            MlbrError::Zip { path, source } => {
                write!(f, "{}: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for MlbrError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MlbrError::Io { source, .. } => Some(source),
            MlbrError::Zip { source, .. } => Some(source),
        }
    }
}
