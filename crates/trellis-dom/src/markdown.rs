#![forbid(unsafe_code)]

//! Inline markdown for `StringValue` content.

use pulldown_cmark::{Event, Options, Parser, html};

/// Render `text` as inline HTML.
///
/// Raw HTML in the input is escaped rather than passed through, and a
/// single paragraph loses its `<p>` wrapper so the result can sit inside a
/// text node's element.
#[must_use]
pub fn inline(text: &str) -> String {
    let options = Options::ENABLE_STRIKETHROUGH;
    let parser = Parser::new_ext(text, options).map(|event| match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        other => other,
    });
    let mut out = String::with_capacity(text.len() + 16);
    html::push_html(&mut out, parser);

    let trimmed = out.trim_end_matches('\n');
    match trimmed
        .strip_prefix("<p>")
        .and_then(|s| s.strip_suffix("</p>"))
    {
        Some(inner) if !inner.contains("<p>") => inner.to_owned(),
        _ => trimmed.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emphasis_without_paragraph() {
        assert_eq!(inline("hello *world*"), "hello <em>world</em>");
        assert_eq!(inline("**bold**"), "<strong>bold</strong>");
    }

    #[test]
    fn raw_html_is_escaped() {
        assert_eq!(inline("<b>x</b>"), "&lt;b&gt;x&lt;/b&gt;");
    }

    #[test]
    fn several_paragraphs_keep_wrappers() {
        assert_eq!(inline("a\n\nb"), "<p>a</p>\n<p>b</p>");
    }

    #[test]
    fn empty_input() {
        assert_eq!(inline(""), "");
    }
}
