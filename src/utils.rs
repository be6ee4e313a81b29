//! Shared formatting helpers for the batssh CLI.

use std::borrow::Cow;

/// Formats a duration in seconds into a human-readable string.
///
/// # Examples
///
/// ```ignore
/// use batssh::utils::format_duration;
///
/// assert_eq!(format_duration(3661), "1h 1m 1s");
/// assert_eq!(format_duration(61), "1m 1s");
/// assert_eq!(format_duration(30), "30s");
/// ```
pub fn format_duration(seconds: i64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    match (hours, minutes) {
        (0, 0) => format!("{}s", secs),
        (0, _) => format!("{}m {}s", minutes, secs),
        _ => format!("{}h {}m {}s", hours, minutes, secs),
    }
}

/// Truncates a string to at most `max_chars` characters, appending "..." if truncated.
///
/// Counts characters rather than bytes so multi-byte roster lines never split
/// inside a code point.
pub fn truncate(s: &str, max_chars: usize) -> Cow<'_, str> {
    if s.chars().count() <= max_chars {
        Cow::Borrowed(s)
    } else if max_chars <= 3 {
        Cow::Owned(s.chars().take(max_chars).collect())
    } else {
        let head: String = s.chars().take(max_chars - 3).collect();
        Cow::Owned(format!("{}...", head))
    }
}
