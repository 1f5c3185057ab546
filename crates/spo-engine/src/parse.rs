//! Tag extraction for model replies.

/// Trimmed content of the first `<tag>...</tag>` block in `text`.
///
/// Returns `None` when the opening or closing tag is missing.
pub fn extract_tag<'a>(text: &'a str, tag: &str) -> Option<&'a str> {
    let open = format!("<{}>", tag);
    let close = format!("</{}>", tag);

    let start = text.find(&open)? + open.len();
    let len = text[start..].find(&close)?;
    Some(text[start..start + len].trim())
}
