#![forbid(unsafe_code)]

//! Small text helpers used by content properties.

/// Marker that flags a code line for highlighting.
pub const HIGHLIGHT_MARKER: &str = ";; <hl>";

/// Turn heading text into an `id`-safe slug.
///
/// Lowercases, drops everything except ASCII letters, digits, spaces and
/// dashes, then collapses whitespace and dash runs into single dashes.
#[must_use]
pub fn slugify(text: &str) -> String {
    let replaced = text.replacen('.', "-", 1);
    let lowered = replaced.trim().to_lowercase();
    let mut slug = String::with_capacity(lowered.len());
    let mut pending_dash = false;
    for ch in lowered.chars() {
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch);
        } else if ch == '-' || ch.is_whitespace() {
            pending_dash = true;
        }
    }
    if pending_dash && !slug.is_empty() {
        slug.push('-');
    }
    slug
}

/// Code text with highlight markers removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightedCode {
    pub text: String,
    /// 1-based line numbers merged into ranges: `"1-3,5"`.
    pub lines: String,
}

/// Strip [`HIGHLIGHT_MARKER`] from every line and record which lines had it.
#[must_use]
pub fn find_and_remove_highlighter(code: &str) -> HighlightedCode {
    let mut text = String::with_capacity(code.len());
    let mut highlighted = Vec::new();
    for (i, line) in code.split('\n').enumerate() {
        match line.find(HIGHLIGHT_MARKER) {
            Some(at) => {
                highlighted.push(i + 1);
                text.push_str(&line[..at]);
                text.push_str(&line[at + HIGHLIGHT_MARKER.len()..]);
            }
            None => text.push_str(line),
        }
        text.push('\n');
    }
    HighlightedCode {
        text,
        lines: merge_line_numbers(&highlighted),
    }
}

/// Collapse ascending runs of consecutive numbers: `[1,2,3,5]` → `"1-3,5"`.
#[must_use]
pub fn merge_line_numbers(numbers: &[usize]) -> String {
    let Some((&first, rest)) = numbers.split_first() else {
        return String::new();
    };
    let mut ranges = Vec::new();
    let (mut start, mut end) = (first, first);
    for &n in rest {
        if n == end + 1 {
            end = n;
        } else {
            ranges.push(range_label(start, end));
            start = n;
            end = n;
        }
    }
    ranges.push(range_label(start, end));
    ranges.join(",")
}

fn range_label(start: usize, end: usize) -> String {
    if start == end {
        start.to_string()
    } else {
        format!("{start}-{end}")
    }
}

/// Replace the last occurrence of `old` in `s`.
#[must_use]
pub fn replace_last(s: &str, old: &str, new: &str) -> String {
    match s.rfind(old) {
        Some(idx) => format!("{}{new}{}", &s[..idx], &s[idx + old.len()..]),
        None => s.to_owned(),
    }
}

/// Count of leading and trailing ASCII spaces. A string made only of
/// spaces reports them all as leading.
#[must_use]
pub fn edge_spaces(s: &str) -> (usize, usize) {
    let before = s.len() - s.trim_start_matches(' ').len();
    if before == s.len() {
        return (before, 0);
    }
    let after = s.len() - s.trim_end_matches(' ').len();
    (before, after)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_headings() {
        assert_eq!(slugify("Hello World"), "hello-world");
        assert_eq!(slugify("  Getting   Started!  "), "getting-started");
        assert_eq!(slugify("v1.2 notes"), "v1-2-notes");
        assert_eq!(slugify("a -- b"), "a-b");
        assert_eq!(slugify(""), "");
    }

    #[test]
    fn highlighter_markers_are_removed() {
        let code = "let a = 1; ;; <hl>\nlet b = 2;\nlet c = 3; ;; <hl>\nlet d = 4; ;; <hl>";
        let out = find_and_remove_highlighter(code);
        assert_eq!(out.lines, "1,3-4");
        assert!(!out.text.contains(HIGHLIGHT_MARKER));
        assert!(out.text.starts_with("let a = 1; \n"));
    }

    #[test]
    fn merge_numbers() {
        assert_eq!(merge_line_numbers(&[]), "");
        assert_eq!(merge_line_numbers(&[4]), "4");
        assert_eq!(merge_line_numbers(&[1, 2, 3, 5, 7, 8]), "1-3,5,7-8");
    }

    #[test]
    fn replace_last_only_touches_final_match() {
        assert_eq!(replace_last("<p>a</p><p>b</p>", "<p>", ""), "<p>a</p>b</p>");
        assert_eq!(replace_last("abc", "x", "y"), "abc");
    }

    #[test]
    fn edge_space_counts() {
        assert_eq!(edge_spaces("  hi "), (2, 1));
        assert_eq!(edge_spaces("   "), (3, 0));
        assert_eq!(edge_spaces("x"), (0, 0));
    }
}
