use regex::Regex;
use std::sync::LazyLock;

/// Twitter / X status links, anywhere in the message text.
static STATUS_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:https?://)?(?:www\.)?(?:twitter\.com|x\.com)/\w+/status/(\d+)")
        .expect("status link pattern is a valid regex")
});

/// A status link found in a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLink<'t> {
    /// The link exactly as it appears in the text
    pub matched: &'t str,
    pub status_id: &'t str,
}

impl StatusLink<'_> {
    /// The link with a scheme, as handed to the extractor.
    pub fn url(&self) -> String {
        if self.matched.starts_with("http://") || self.matched.starts_with("https://") {
            self.matched.to_string()
        } else {
            format!("https://{}", self.matched)
        }
    }
}

/// Recognises the one supported link shape.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinkPattern;

impl LinkPattern {
    pub fn new() -> Self {
        Self
    }

    /// First recognised link in `text`.
    pub fn find<'t>(&self, text: &'t str) -> Option<StatusLink<'t>> {
        let caps = STATUS_LINK.captures(text)?;
        Some(StatusLink {
            matched: caps.get(0)?.as_str(),
            status_id: caps.get(1)?.as_str(),
        })
    }
}
