use ammonia;

/// Clean user-supplied text with the ammonia library before it is embedded
/// in outbound email HTML.
///
/// Whitelist-based: harmless formatting tags survive, while <script>,
/// <iframe>, event-handler attributes and similar are stripped. Feedback text
/// is the only user input that ends up rendered as HTML anywhere, so this is
/// the single choke point for it.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}

/// Assembles the operator-facing feedback notification body. `message` must
/// already have passed through `clean_html`.
pub fn render_feedback_email(kind: &str, message: &str, reply_to: Option<&str>) -> String {
    let contact = match reply_to {
        Some(addr) => format!("<p>Reply to: {}</p>", clean_html(addr)),
        None => "<p>No contact address left.</p>".to_string(),
    };

    format!(
        "<h2>New {} feedback</h2>{}<hr><div>{}</div>",
        kind, contact, message
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_script_tags_but_keeps_formatting() {
        let cleaned = clean_html("<b>bold</b><script>alert('x')</script>");
        assert!(cleaned.contains("<b>bold</b>"));
        assert!(!cleaned.contains("script"));
        assert!(!cleaned.contains("alert"));
    }

    #[test]
    fn strips_event_handler_attributes() {
        let cleaned = clean_html(r#"<img src="x" onerror="steal()">"#);
        assert!(!cleaned.contains("onerror"));
    }

    #[test]
    fn feedback_email_contains_the_sanitized_message() {
        let body = render_feedback_email("bug", "it broke", Some("user@example.com"));
        assert!(body.contains("New bug feedback"));
        assert!(body.contains("it broke"));
        assert!(body.contains("user@example.com"));
    }
}
