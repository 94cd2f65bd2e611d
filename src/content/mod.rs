//! The `Content` node: the in-memory unit of work shared by every
//! decoder, the LBR parser, the driver, and the sinks.
//!
//! This is a Rust reshaping of `content_t` / `file_t` from `mlbr.h`. The C
//! struct is a singly linked, intrusive node (`next`) holding two `file_t`
//! views (`in`, `out`) that alias process-global and `malloc`'d buffers
//! interchangeably. Here `Content<'a>` owns its children in a `Vec` and
//! borrows its input bytes from the single top-level buffer that outlives
//! the whole tree (see `crate::file::LoadedFile`) — every LBR member, at any
//! nesting depth, is still just a slice of that same root buffer, since only
//! `Library`-kind members keep their `in` view around un-decoded.

pub mod io;

use std::path::PathBuf;

use crate::config;

/// What a `Content` node turned out to be, mirroring the `stored`..`mapping`
/// enum in `mlbr.h`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Stored,
    Squeezed,
    Crunched,
    CrunchV1,
    CrunchV2,
    CrLzh,
    CrLzhV1,
    CrLzhV2,
    Library,
    Skipped,
    Missing,
    Mapping,
}

impl Kind {
    /// Display name used in listings and diagnostics (`methodName` in
    /// `main.c`).
    pub fn name(self) -> &'static str {
        match self {
            Kind::Stored => "stored",
            Kind::Squeezed => "squeezed",
            Kind::Crunched | Kind::CrunchV1 | Kind::CrunchV2 => "crunched",
            Kind::CrLzh | Kind::CrLzhV1 | Kind::CrLzhV2 => "crlzh'd",
            Kind::Library => "library",
            Kind::Skipped => "skipped",
            Kind::Missing => "missing",
            Kind::Mapping => "mapping",
        }
    }
}

/// Per-entry status bits, mirroring the `BADCRC`..`INCONTAINER` flags in
/// `mlbr.h`. A plain newtype rather than a `bitflags` type: four bits don't
/// earn the dependency, and the teacher's pack never reaches for one either.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Status(pub u8);

impl Status {
    pub const NONE: Status = Status(0);
    pub const BAD_CRC: Status = Status(1);
    pub const NO_CRC: Status = Status(2);
    pub const TRUNCATED: Status = Status(4);
    pub const ILLEGAL_CHAR: Status = Status(8);
    pub const DEF_DATE: Status = Status(32);
    pub const INCONTAINER: Status = Status(128);

    pub fn contains(self, flag: Status) -> bool {
        self.0 & flag.0 != 0
    }

    pub fn insert(&mut self, flag: Status) {
        self.0 |= flag.0;
    }
}

impl std::ops::BitOr for Status {
    type Output = Status;
    fn bitor(self, rhs: Status) -> Status {
        Status(self.0 | rhs.0)
    }
}

/// Seconds since the Unix epoch (UTC). `None` stands in for the C side's
/// `time_t == 0` "unknown" sentinel.
pub type Timestamp = i64;

/// A read-only view over a slice of the root loaded-file buffer, with its
/// own cursor and bit-reader state. Corresponds to `file_t` used as `in`.
pub struct InputView<'a> {
    pub buf: &'a [u8],
    pub pos: usize,
    pub fname: String,
    pub fdate: Option<Timestamp>,
    bit_stream: u32,
    bit_count: u8,
}

impl<'a> InputView<'a> {
    pub fn new(buf: &'a [u8], fname: String, fdate: Option<Timestamp>) -> Self {
        InputView {
            buf,
            pos: 0,
            fname,
            fdate,
            bit_stream: 0,
            bit_count: 0,
        }
    }
}

/// An owned, growable output buffer with the RLE filter's carry state.
/// Corresponds to `file_t` used as `out`, minus the pointer aliasing the C
/// side relies on for the "store as-is" fallback (see `DESIGN.md`).
#[derive(Default)]
pub struct OutputView {
    pub buf: Vec<u8>,
    pub fname: Option<String>,
    pub fdate: Option<Timestamp>,
    repeat_flag: bool,
    last_ch: u8,
}

impl OutputView {
    pub fn with_capacity(expected_input_len: usize) -> Self {
        let floor = std::cmp::max(config::MIN_ALLOC, expected_input_len * 2);
        OutputView {
            buf: Vec::with_capacity(floor),
            ..Default::default()
        }
    }
}

/// One node of the content tree: a file, an LBR member, a nested library, or
/// a synthesized sidecar (`Mapping`).
pub struct Content<'a> {
    pub kind: Kind,
    pub status: Status,
    pub input: InputView<'a>,
    pub output: OutputView,
    /// Declared/expected input length (`content->length` in the C source);
    /// `input.buf.len()` is the *actual* available length, which can be
    /// shorter when the member was truncated inside its container.
    pub expected_length: usize,
    pub children: Vec<Content<'a>>,
    pub comment: Option<String>,
    pub save_name: Option<String>,
    pub save_path: Option<PathBuf>,
    /// Accumulated diagnostic text for later emission to the `.info`
    /// sidecar, mirroring `content->msg` / `logErr` in `support.c`.
    pub msg: Option<String>,
}

impl<'a> Content<'a> {
    pub fn new(kind: Kind, buf: &'a [u8], fname: String, fdate: Option<Timestamp>) -> Self {
        let expected_length = buf.len();
        Content {
            kind,
            status: Status::NONE,
            input: InputView::new(buf, fname, fdate),
            output: OutputView::with_capacity(expected_length),
            expected_length,
            children: Vec::new(),
            comment: None,
            save_name: None,
            save_path: None,
            msg: None,
        }
    }

    /// Appends a diagnostic line, mirroring `logErr`'s append-to-`msg`
    /// behavior (no separator is added here; callers include their own
    /// trailing newline as `support.c`'s format strings do).
    pub fn log_err(&mut self, text: impl AsRef<str>) {
        match &mut self.msg {
            Some(msg) => msg.push_str(text.as_ref()),
            None => self.msg = Some(text.as_ref().to_string()),
        }
    }

    /// Drop any decoded output and make this node's `out` a verbatim copy of
    /// its input — `setStoreFile` in `memio.c`. Deliberately leaves `kind`
    /// untouched: the original calls this for the `Stored` fallback, for
    /// `Library` nodes (to give the listing a sensible name/length after its
    /// children are already dispatched), and for `Missing` nodes alike, with
    /// the caller deciding the final `kind` in each case.
    pub fn set_store_file(&mut self) {
        self.comment = None;
        self.output = OutputView {
            buf: self.input.buf.to_vec(),
            fname: Some(self.input.fname.clone()),
            fdate: self.input.fdate,
            ..Default::default()
        };
    }
}
