#[cfg(any(test, feature = "test-support"))]
pub mod test;

#[cfg(any(test, feature = "test-support"))]
pub use test::RandomCharIter;

/// Panics in debug builds and logs an error with a backtrace in release builds.
///
/// Use this for conditions that indicate a bug, but that the caller can recover from.
#[macro_export]
macro_rules! debug_panic {
    ( $($fmt_arg:tt)* ) => {
        if cfg!(debug_assertions) {
            panic!( $($fmt_arg)* );
        } else {
            let backtrace = std::backtrace::Backtrace::capture();
            log::error!("{}\n{:?}", format_args!($($fmt_arg)*), backtrace);
        }
    };
}

/// Removes characters from the end of the string if its length is greater than `max_chars` and
/// appends "..." to the string. Returns string unchanged if its length is smaller than max_chars.
pub fn truncate_and_trailoff(s: &str, max_chars: usize) -> String {
    debug_assert!(max_chars >= 3);
    match s.char_indices().nth(max_chars) {
        Some((truncation_ix, _)) => format!("{}...", &s[..truncation_ix]),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_and_trailoff() {
        assert_eq!(truncate_and_trailoff("", 3), "");
        assert_eq!(truncate_and_trailoff("abc", 3), "abc");
        assert_eq!(truncate_and_trailoff("abcd", 3), "abc...");
        assert_eq!(truncate_and_trailoff("αβγδε", 4), "αβγδ...");
        assert_eq!(truncate_and_trailoff("🍐🏀🍗", 5), "🍐🏀🍗");
    }

    #[test]
    #[should_panic(expected = "bad state 7")]
    #[cfg(debug_assertions)]
    fn test_debug_panic_panics_in_debug_builds() {
        debug_panic!("bad state {}", 7);
    }
}
