//! Command-line surface, ported from `main.c`'s hand-rolled option loop.
//!
//! The original parses `argv` itself; this crate already depends on `clap`
//! (present in the teacher's own `Cargo.toml` even though its CLI never
//! calls into it), so the option surface below is expressed as a derived
//! `Parser` instead of a loop over `std::env::args()`.

use std::path::PathBuf;

use clap::Parser;

/// Extracts and decompresses CP/M `.lbr` archives and Squeeze/Crunch/Cr-Lzh
/// compressed files.
#[derive(Parser, Debug)]
#[command(name = "mlbr", version, about, long_about = None)]
pub struct Cli {
    /// One or more .lbr, squeezed, crunched or Cr-Lzh'd files.
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Extract to directory.
    #[arg(short = 'x', long = "extract", conflicts_with_all = ["extract_sub", "zip"])]
    pub extract: bool,

    /// Extract to a subdirectory named after the input stem.
    #[arg(short = 'd', long = "extract-sub", conflicts_with = "zip")]
    pub extract_sub: bool,

    /// Convert to a zip file named after the input stem.
    #[arg(short = 'z', long = "zip")]
    pub zip: bool,

    /// Override the target directory (default: current directory).
    #[arg(short = 'D', long = "dir", value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// Force writing of skipped (truncated-but-CRC-ok) library content.
    #[arg(short = 'f', long = "force")]
    pub force: bool,

    /// Retain the case of original file names (default is lower case).
    #[arg(short = 'k', long = "keep-case")]
    pub keep_case: bool,

    /// Disable nested-subdirectory auto expansion for the -d mode.
    #[arg(long = "no-expand")]
    pub no_expand: bool,

    /// Recurse into LBRs nested inside LBRs.
    #[arg(short = 'r', long = "recurse")]
    pub recurse: bool,

    /// Increase diagnostic verbosity (repeatable).
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Treat a bad trailer CRC as acceptable and keep the decoded bytes.
    #[arg(long = "ignore-crc")]
    pub ignore_crc: bool,

    /// Treat a corrupt (truncated mid-stream) decode as acceptable and keep
    /// whatever partial bytes were produced.
    #[arg(long = "ignore-corrupt")]
    pub ignore_corrupt: bool,
}

impl Cli {
    /// `-d` was given and nested-library expansion into per-library
    /// subdirectories was not suppressed with `--no-expand`.
    pub fn expand_nested(&self) -> bool {
        self.extract_sub && !self.no_expand
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_extract_and_zip_together() {
        let err = Cli::try_parse_from(["mlbr", "-x", "-z", "a.lbr"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn rejects_extract_sub_and_zip_together() {
        let err = Cli::try_parse_from(["mlbr", "-d", "-z", "a.lbr"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn requires_at_least_one_file() {
        assert!(Cli::try_parse_from(["mlbr"]).is_err());
    }

    #[test]
    fn verbose_is_repeatable() {
        let cli = Cli::try_parse_from(["mlbr", "-vvv", "a.lbr"]).unwrap();
        assert_eq!(cli.verbose, 3);
    }

    #[test]
    fn expand_nested_requires_extract_sub() {
        let cli = Cli::try_parse_from(["mlbr", "-x", "a.lbr"]).unwrap();
        assert!(!cli.expand_nested());
        let cli = Cli::try_parse_from(["mlbr", "-d", "a.lbr"]).unwrap();
        assert!(cli.expand_nested());
        let cli = Cli::try_parse_from(["mlbr", "-d", "--no-expand", "a.lbr"]).unwrap();
        assert!(!cli.expand_nested());
    }
}
