//! Cleanup of values as they arrive from the test table
//!
//! Cell values come through the wiki renderer: addresses turn into links,
//! line breaks into markup and special characters into entities.

/// Undo wiki rendering of a value before it is typed or compared
pub fn cleanup_value(value: &str) -> String {
    let value = unwrap_link(value);
    let value = value
        .replace("<br/>", "\n")
        .replace("<br>", "\n")
        .replace("\\n", "\n")
        .replace("\\t", "\t");
    decode_entities(&value)
}

/// Target of a rendered `<a href="...">...</a>`, else the value itself
pub fn unwrap_link(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.starts_with("<a ") && trimmed.ends_with("</a>") {
        if let Some(start) = trimmed.find("href=\"") {
            let rest = &trimmed[start + "href=\"".len()..];
            if let Some(end) = rest.find('"') {
                return decode_entities(&rest[..end]);
            }
        }
    }
    value.to_string()
}

fn decode_entities(value: &str) -> String {
    value
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", "\u{a0}")
        .replace("&amp;", "&")
}
