//! Verbosity level and display macros.
//!
//! Plays the role `cli::constants`'s display-level globals and
//! `displaylevel!`/`displayout!` macros play in the teacher: a crate-level
//! atomic counter plus a small macro family, used instead of pulling in the
//! `log` crate for what is fundamentally a CLI progress/diagnostic stream.

use std::sync::atomic::{AtomicU32, Ordering};

/// 0 = silent, 1 = errors only, 2 = normal (default), 3 = verbose.
pub static VERBOSITY: AtomicU32 = AtomicU32::new(2);

#[inline]
pub fn level() -> u32 {
    VERBOSITY.load(Ordering::Relaxed)
}

#[inline]
pub fn set_level(level: u32) {
    VERBOSITY.store(level, Ordering::Relaxed);
}

#[inline]
pub fn raise_level() {
    VERBOSITY.fetch_add(1, Ordering::Relaxed);
}

/// Print to stdout unconditionally — listing output, info-file summaries.
#[macro_export]
macro_rules! displayout {
    ($($arg:tt)*) => { print!($($arg)*) };
}

/// Conditionally print to stderr at or above `level` — diagnostics and the
/// "is corrupt, processing as normal file" style messages.
#[macro_export]
macro_rules! displaylevel {
    ($level:expr, $($arg:tt)*) => {
        if $crate::verbosity::level() >= $level {
            eprint!($($arg)*);
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_level_is_normal() {
        assert_eq!(level(), 2);
    }

    #[test]
    fn raise_level_increments() {
        set_level(2);
        raise_level();
        assert_eq!(level(), 3);
        set_level(2);
    }
}
