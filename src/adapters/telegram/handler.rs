use super::client::BotClient;
use super::types::{Message, Update};
use crate::application::TransferService;
use crate::config::AccessList;
use crate::domain::av::RemuxRunner;
use crate::domain::media::DeliverablePart;
use crate::error::DeliveryError;
use crate::ports::chat::{PartSender, ProgressSink};
use async_trait::async_trait;

const START_TEXT: &str = "Welcome to the video download bot!\n\
Send me a Twitter video link and I will download the video for you.\n\
Supported links:\n\
- Twitter: https://twitter.com/user/status/...\n\
Note: large files are sent in several parts";

const HELP_TEXT: &str = "How to use:\n\
1. Send a Twitter video link to download it\n\
2. Large files are split and sent in parts\n\
3. Both twitter.com and x.com links work";

const DENIED_TEXT: &str = "Sorry, you are not allowed to use this bot.";
const ACCEPTED_TEXT: &str = "Processing your request, please wait...";

/// What an incoming text asks for.
#[derive(Debug, PartialEq, Eq)]
pub enum Route {
    Start,
    Help,
    Download(String),
    Ignore,
}

impl Route {
    pub fn from_text(text: &str) -> Route {
        let text = text.trim();
        if text.is_empty() {
            return Route::Ignore;
        }
        if let Some(command) = text.strip_prefix('/') {
            let name = command
                .split_whitespace()
                .next()
                .unwrap_or_default()
                .split('@')
                .next()
                .unwrap_or_default();
            return match name {
                "start" => Route::Start,
                "help" => Route::Help,
                _ => Route::Ignore,
            };
        }
        Route::Download(text.to_string())
    }
}

/// Streams status text by editing one message in place.
pub struct StatusMessage {
    client: BotClient,
    chat_id: i64,
    message_id: i64,
}

#[async_trait]
impl ProgressSink for StatusMessage {
    async fn update(&self, status: &str) -> Result<(), DeliveryError> {
        self.client
            .edit_message_text(self.chat_id, self.message_id, status)
            .await?;
        Ok(())
    }
}

/// Replies to the request message with videos and notices.
pub struct ChatReplies {
    client: BotClient,
    chat_id: i64,
    reply_to: i64,
}

#[async_trait]
impl PartSender for ChatReplies {
    async fn send_part(&self, part: &DeliverablePart) -> Result<(), DeliveryError> {
        self.client
            .send_video(
                self.chat_id,
                part.file.path(),
                &part.file_name(),
                &part.caption(),
                Some(self.reply_to),
            )
            .await?;
        Ok(())
    }

    async fn notify(&self, text: &str) -> Result<(), DeliveryError> {
        self.client
            .send_message(self.chat_id, text, Some(self.reply_to))
            .await?;
        Ok(())
    }
}

/// Handle one update: commands, access control and transfers.
pub async fn handle_update<R: RemuxRunner>(
    client: &BotClient,
    access: &AccessList,
    service: &TransferService<R>,
    update: Update,
) {
    let Some(message) = update.message else {
        return;
    };
    let Some(user) = message.from.as_ref() else {
        return;
    };
    let route = Route::from_text(message.text.as_deref().unwrap_or_default());
    if route == Route::Ignore {
        return;
    }

    if !access.is_allowed(user.id) {
        tracing::warn!("Rejected user {} ({:?})", user.id, user.username);
        reply(client, &message, DENIED_TEXT).await;
        return;
    }

    match route {
        Route::Start => reply(client, &message, START_TEXT).await,
        Route::Help => reply(client, &message, HELP_TEXT).await,
        Route::Download(url) => download(client, service, &message, &url).await,
        Route::Ignore => {}
    }
}

async fn download<R: RemuxRunner>(
    client: &BotClient,
    service: &TransferService<R>,
    message: &Message,
    url: &str,
) {
    tracing::info!("Download request from chat {}: {}", message.chat.id, url);

    let status = match client
        .send_message(message.chat.id, ACCEPTED_TEXT, Some(message.message_id))
        .await
    {
        Ok(status) => status,
        Err(e) => {
            tracing::error!("Could not acknowledge request in chat {}: {}", message.chat.id, e);
            return;
        }
    };

    let progress = StatusMessage {
        client: client.clone(),
        chat_id: message.chat.id,
        message_id: status.message_id,
    };
    let replies = ChatReplies {
        client: client.clone(),
        chat_id: message.chat.id,
        reply_to: message.message_id,
    };

    if let Ok(report) = service.transfer(url, &progress, &replies).await {
        tracing::info!(
            "Finished {}: {}/{} parts delivered",
            url,
            report.delivered,
            report.total_parts
        );
    }
}

async fn reply(client: &BotClient, message: &Message, text: &str) {
    if let Err(e) = client
        .send_message(message.chat.id, text, Some(message.message_id))
        .await
    {
        tracing::warn!("Could not reply in chat {}: {}", message.chat.id, e);
    }
}
