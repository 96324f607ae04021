//! Voice-prompt markup rendering.

/// A single spoken message followed by hangup.
pub fn say_and_hangup(message: &str) -> String {
    [
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>",
        "<Response>",
        &format!("  <Say>{}</Say>", escape_xml(message)),
        "  <Hangup/>",
        "</Response>",
    ]
    .concat()
}

fn escape_xml(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
