//! Error types for the transfer pipeline and its collaborators.

use std::path::PathBuf;
use std::time::Duration;

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, TransferError>;

/// Upper bound on failure text shown in chat, well under Telegram's 4096.
const MAX_USER_MESSAGE_CHARS: usize = 1000;

/// Extractor stderr lines kept in the user-facing failure text.
const USER_STDERR_LINES: usize = 5;

/// Errors that abort a single transfer request.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    /// The message does not contain a recognised video link.
    #[error("unsupported link: {0}")]
    UnsupportedUrl(String),

    /// The media duration could not be determined.
    #[error("could not probe {}: {message}", path.display())]
    Probe { path: PathBuf, message: String },

    /// The segment remux failed.
    #[error("splitting {} failed: {message}", path.display())]
    Split { path: PathBuf, message: String },

    /// The concat remux failed.
    #[error("merging into {} failed: {message}", destination.display())]
    Merge {
        destination: PathBuf,
        message: String,
    },

    /// The extractor did not finish before the deadline.
    #[error("download timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// The extractor exited cleanly but left no media file behind.
    #[error("no downloaded video found in {}", .0.display())]
    NoOutput(PathBuf),

    /// The extractor exited with a failure status.
    #[error("extractor exited with {code:?}: {stderr}")]
    Subprocess { code: Option<i32>, stderr: String },

    /// The scratch workspace could not be created.
    #[error("workspace error: {0}")]
    Workspace(std::io::Error),

    /// I/O error on scratch storage.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransferError {
    /// The text shown to the requesting user when this error ends a request.
    ///
    /// Extractor stderr is cut to its last few lines and the whole text is
    /// bounded; the error value itself keeps everything.
    pub fn user_message(&self) -> String {
        let message = match self {
            TransferError::UnsupportedUrl(_) => {
                "Please send a valid Twitter/X video link.".to_string()
            }
            TransferError::Timeout(_) => {
                "Download failed: the download timed out, please try again later.".to_string()
            }
            TransferError::Subprocess { stderr, .. } => {
                format!("Download failed: {}", last_lines(stderr, USER_STDERR_LINES))
            }
            other => format!("Download failed: {}", other),
        };
        truncate_chars(message, MAX_USER_MESSAGE_CHARS)
    }
}

fn last_lines(text: &str, count: usize) -> String {
    let lines: Vec<&str> = text.lines().filter(|line| !line.trim().is_empty()).collect();
    lines[lines.len().saturating_sub(count)..].join("\n")
}

fn truncate_chars(text: String, max: usize) -> String {
    match text.char_indices().nth(max.saturating_sub(1)) {
        Some((cut, _)) if text.chars().count() > max => format!("{}…", &text[..cut]),
        _ => text,
    }
}

/// A chat send or edit failed. Never fatal to a request.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("chat API error: {0}")]
    Api(#[from] ApiError),
}

/// Errors from the Telegram Bot API client.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Bot API returned an error ({code:?}): {description}")]
    Api {
        code: Option<i64>,
        description: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Startup configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid user id in ALLOWED_TELEGRAM_USER_IDS: {0:?}")]
    InvalidUserId(String),

    #[error("could not write extractor config {}: {source}", path.display())]
    ExtractorConfig {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subprocess_message_carries_stderr_verbatim() {
        let err = TransferError::Subprocess {
            code: Some(1),
            stderr: "rate limited".to_string(),
        };
        assert_eq!(err.user_message(), "Download failed: rate limited");
    }

    #[test]
    fn test_unsupported_url_message() {
        let err = TransferError::UnsupportedUrl("https://example.com".to_string());
        assert_eq!(err.user_message(), "Please send a valid Twitter/X video link.");
    }

    #[test]
    fn test_long_extractor_output_is_bounded() {
        let stderr: Vec<String> = (0..200)
            .map(|i| format!("[twitter][error] Traceback line {} {}", i, "x".repeat(60)))
            .collect();
        let err = TransferError::Subprocess {
            code: Some(1),
            stderr: stderr.join("\n"),
        };

        let message = err.user_message();
        assert!(message.chars().count() <= MAX_USER_MESSAGE_CHARS);
        assert!(message.contains("Traceback line 199"));
        assert!(!message.contains("Traceback line 194 "));
        match err {
            TransferError::Subprocess { stderr, .. } => assert_eq!(stderr.lines().count(), 200),
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_single_huge_line_is_truncated() {
        let err = TransferError::Subprocess {
            code: Some(1),
            stderr: "é".repeat(10_000),
        };
        let message = err.user_message();
        assert_eq!(message.chars().count(), MAX_USER_MESSAGE_CHARS);
        assert!(message.starts_with("Download failed: é"));
        assert!(message.ends_with('…'));
    }

    #[test]
    fn test_timeout_display() {
        let err = TransferError::Timeout(Duration::from_secs(300));
        assert_eq!(err.to_string(), "download timed out after 300s");
    }
}
