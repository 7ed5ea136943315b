//! Small text helpers shared by the file tools.

/// Collapse CRLF and lone CR line endings to LF.
pub fn normalize_line_endings(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

/// Split `text` into lines that keep their `\n` terminator.
///
/// A trailing segment without a newline counts as a line; an empty string
/// has no lines. Concatenating any contiguous run of the result gives back
/// the exact original bytes for that run.
pub fn split_lines(text: &str) -> Vec<&str> {
    text.split_inclusive('\n').collect()
}

/// The first `n` lines of `text`, or all of it when `n` exceeds the count.
pub fn head(text: &str, n: usize) -> String {
    split_lines(text).into_iter().take(n).collect()
}

/// The last `n` lines of `text`, or all of it when `n` exceeds the count.
pub fn tail(text: &str, n: usize) -> String {
    let lines = split_lines(text);
    let skip = lines.len().saturating_sub(n);
    lines[skip..].concat()
}

const SIZE_UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// Human-readable size in binary units, e.g. `1.5 KB`.
///
/// Two decimals with trailing zeros dropped; `0 B` for zero.
#[allow(clippy::cast_precision_loss)]
pub fn format_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 B".to_owned();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < SIZE_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let fixed = format!("{value:.2}");
    let trimmed = fixed.trim_end_matches('0').trim_end_matches('.');
    format!("{trimmed} {}", SIZE_UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_line_endings() {
        assert_eq!(normalize_line_endings("a\r\nb\rc\n"), "a\nb\nc\n");
        assert_eq!(normalize_line_endings("\r\r\n"), "\n\n");
        assert_eq!(normalize_line_endings("plain"), "plain");
    }

    #[test]
    fn test_head_and_tail_clamp() {
        let text = "one\ntwo\nthree\n";
        assert_eq!(head(text, 1), "one\n");
        assert_eq!(tail(text, 1), "three\n");
        assert_eq!(tail(text, 3), text);
        assert_eq!(tail(text, 99), text);
        assert_eq!(head(text, 99), text);
    }

    #[test]
    fn test_unterminated_last_line() {
        let text = "one\ntwo";
        assert_eq!(split_lines(text), vec!["one\n", "two"]);
        assert_eq!(tail(text, 1), "two");
        assert_eq!(head(text, 1), "one\n");
    }

    #[test]
    fn test_empty_text_has_no_lines() {
        assert!(split_lines("").is_empty());
        assert_eq!(tail("", 5), "");
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(1), "1 B");
        assert_eq!(format_size(1023), "1023 B");
        assert_eq!(format_size(1024), "1 KB");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(1_234_567), "1.18 MB");
        assert_eq!(format_size(5 * 1024 * 1024 * 1024), "5 GB");
    }
}
