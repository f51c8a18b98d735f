//! Formatting helpers for the fixed-width report.
//!
//! Pure string functions; colors are applied by the renderer.

/// Format byte count as a compact human-readable size: `"1.5G"`, `"100.3M"`,
/// `"50.0K"`, `"512B"`.
pub fn format_bytes(bytes: u64) -> String {
    let f = bytes as f64;
    if bytes >= 1024 * 1024 * 1024 {
        format!("{:.1}G", f / (1024.0 * 1024.0 * 1024.0))
    } else if bytes >= 1024 * 1024 {
        format!("{:.1}M", f / (1024.0 * 1024.0))
    } else if bytes >= 1024 {
        format!("{:.1}K", f / 1024.0)
    } else {
        format!("{}B", bytes)
    }
}

/// Format a duration in milliseconds as `"45s"`, `"3m5s"`, `"2h10m"`, `"4d3h"`.
pub fn format_uptime(millis: u64) -> String {
    let secs = millis / 1000;
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m{}s", secs / 60, secs % 60)
    } else if secs < 86400 {
        format!("{}h{}m", secs / 3600, (secs % 3600) / 60)
    } else {
        format!("{}d{}h", secs / 86400, (secs % 86400) / 3600)
    }
}

/// Shortens `name` to at most `max_len` characters by cutting the middle.
///
/// The last `keep_tail` characters survive (thread names usually end in the
/// distinguishing index), the head fills what is left, and `...` marks the
/// cut: `short_name("pool-12-worker-thread-7", 16, 8)` is `"pool-...thread-7"`.
pub fn short_name(name: &str, max_len: usize, keep_tail: usize) -> String {
    let chars: Vec<char> = name.chars().collect();
    if chars.len() <= max_len {
        return name.to_string();
    }
    if max_len <= 3 {
        return chars[..max_len].iter().collect();
    }

    let tail = keep_tail.min(max_len - 3);
    let head = max_len - 3 - tail;
    let mut out: String = chars[..head].iter().collect();
    out.push_str("...");
    out.extend(&chars[chars.len() - tail..]);
    out
}

/// First `max_len` characters of `s`.
pub fn left_str(s: &str, max_len: usize) -> String {
    s.chars().take(max_len).collect()
}
