use crate::domain::media::DeliverablePart;
use crate::error::DeliveryError;
use async_trait::async_trait;

/// Pushes human-readable status lines to the requesting user.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProgressSink: Send + Sync {
    /// Replace the current status text
    async fn update(&self, status: &str) -> Result<(), DeliveryError>;
}

/// Delivers finished parts back to the chat.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PartSender: Send + Sync {
    /// Send one part as a video attachment, captioned with its position
    async fn send_part(&self, part: &DeliverablePart) -> Result<(), DeliveryError>;

    /// Send a standalone text message
    async fn notify(&self, text: &str) -> Result<(), DeliveryError>;
}
