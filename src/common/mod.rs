pub mod io;
pub mod logging;

use std::io::{IsTerminal, Write};

/// Bold red, used for fatal diagnostics on a terminal.
const BOLD_RED: &str = "\x1b[1;31m";
/// Reset all terminal attributes.
const COLOR_RESET: &str = "\x1b[0m";

/// Name printed in front of every diagnostic.
pub const TOOL_NAME: &str = "lazysort";

/// Render a diagnostic line, colored when `color` is set.
pub fn format_error(msg: &str, color: bool) -> String {
    if color {
        format!("{}{}: {}{}", BOLD_RED, TOOL_NAME, msg, COLOR_RESET)
    } else {
        format!("{}: {}", TOOL_NAME, msg)
    }
}

/// Print a diagnostic to stderr. Color is only used when stderr is a terminal,
/// so redirected logs never contain escape codes.
pub fn report_error(msg: &str) {
    let stderr = std::io::stderr();
    let color = stderr.is_terminal();
    let mut lock = stderr.lock();
    let _ = writeln!(lock, "{}", format_error(msg, color));
}

/// Peak resident set size of this process so far, in bytes.
#[cfg(unix)]
pub fn peak_rss_bytes() -> Option<u64> {
    let mut usage = std::mem::MaybeUninit::<libc::rusage>::zeroed();
    // SAFETY: getrusage only writes into the provided struct.
    let rc = unsafe { libc::getrusage(libc::RUSAGE_SELF, usage.as_mut_ptr()) };
    if rc != 0 {
        return None;
    }
    // SAFETY: zero-initialized and filled in by a successful getrusage.
    let usage = unsafe { usage.assume_init() };
    let max = u64::try_from(usage.ru_maxrss).ok()?;
    // macOS reports bytes, everything else kilobytes.
    if cfg!(target_os = "macos") {
        Some(max)
    } else {
        Some(max.saturating_mul(1024))
    }
}

#[cfg(not(unix))]
pub fn peak_rss_bytes() -> Option<u64> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_error_plain() {
        assert_eq!(
            format_error("invalid sort column", false),
            "lazysort: invalid sort column"
        );
    }

    #[test]
    fn test_format_error_colored() {
        let s = format_error("boom", true);
        assert!(s.starts_with("\x1b[1;31m"));
        assert!(s.ends_with("\x1b[0m"));
        assert!(s.contains("lazysort: boom"));
    }

    #[cfg(unix)]
    #[test]
    fn test_peak_rss_is_reported() {
        let held = vec![1u8; 4 << 20];
        let peak = peak_rss_bytes().unwrap();
        assert!(peak >= held.len() as u64);
    }
}
