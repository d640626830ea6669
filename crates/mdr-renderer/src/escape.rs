//! Character-substitution escapers, one per output language.
//!
//! Each escaper is a single pass over the input: characters found in the
//! table are replaced, everything else is copied unchanged. Already escaped
//! sequences are escaped again.

/// Reserved characters of CommonMark and their escaped forms.
pub const MARKDOWN_ESCAPES: &[(char, &str)] = &[
    ('*', "\\*"),
    ('<', "\\<"),
    ('[', "\\["),
    ('`', "\\`"),
    ('.', "\\."),
    ('#', "\\#"),
    ('&', "\\&"),
    ('\\', "\\\\"),
];

/// Reserved characters of HTML and their entities.
pub const HTML_ESCAPES: &[(char, &str)] = &[
    ('&', "&amp;"),
    ('<', "&lt;"),
    ('>', "&gt;"),
    ('"', "&quot;"),
    ('\'', "&#x27;"),
];

/// Reserved characters of roff and their escaped forms.
pub const ROFF_ESCAPES: &[(char, &str)] = &[('\\', "\\e"), ('-', "\\-")];

fn translate(s: &str, table: &[(char, &str)]) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match table.iter().find(|(reserved, _)| *reserved == c) {
            Some((_, replacement)) => result.push_str(replacement),
            None => result.push(c),
        }
    }
    result
}

/// Escape CommonMark special characters.
#[must_use]
pub fn escape_markdown(s: &str) -> String {
    translate(s, MARKDOWN_ESCAPES)
}

/// Escape HTML special characters.
#[must_use]
pub fn escape_html(s: &str) -> String {
    translate(s, HTML_ESCAPES)
}

/// Escape roff special characters.
///
/// Does not guard control characters at the start of a line; see
/// [`guard_roff_line`].
#[must_use]
pub fn escape_roff(s: &str) -> String {
    translate(s, ROFF_ESCAPES)
}

/// Prefix every line starting with `.` or `'` with the zero-width `\&` so
/// roff does not read it as a request.
#[must_use]
pub fn guard_roff_line(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut at_line_start = true;
    for c in s.chars() {
        if at_line_start && (c == '.' || c == '\'') {
            result.push_str("\\&");
        }
        result.push(c);
        at_line_start = c == '\n';
    }
    result
}
