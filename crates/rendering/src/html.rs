//! Small HTML assembly helpers shared by the document templates.

/// Escape user-provided text for interpolation into HTML.
pub fn escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

/// Escape a multi-line body, mapping line breaks to `<br>`.
pub fn escape_multiline(input: &str) -> String {
    let escaped = escape(input);
    escaped.replace("\r\n", "<br>").replace('\n', "<br>")
}
