use super::types::{ApiResponse, Message, Update};
use crate::error::ApiError;
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use std::time::Duration;
use tokio_util::io::ReaderStream;

/// Timeout for text calls and uploads.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Thin Bot API client. Cheap to clone.
#[derive(Clone, Debug)]
pub struct BotClient {
    http: reqwest::Client,
    base: String,
}

#[derive(Serialize)]
struct GetUpdates {
    offset: i64,
    timeout: u64,
    allowed_updates: [&'static str; 1],
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: i64,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_to_message_id: Option<i64>,
}

#[derive(Serialize)]
struct EditMessageText<'a> {
    chat_id: i64,
    message_id: i64,
    text: &'a str,
}

impl BotClient {
    pub fn new(api_url: &str, token: &str) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .connect_timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            base: format!("{}/bot{}", api_url.trim_end_matches('/'), token),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/{}", self.base, method)
    }

    async fn call<P, T>(&self, method: &str, params: &P, timeout: Duration) -> Result<T, ApiError>
    where
        P: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response: ApiResponse<T> = self
            .http
            .post(self.method_url(method))
            .timeout(timeout)
            .json(params)
            .send()
            .await?
            .json()
            .await?;
        unwrap_response(response)
    }

    /// Long-poll for updates after `offset`, waiting up to `wait` seconds.
    pub async fn get_updates(&self, offset: i64, wait: u64) -> Result<Vec<Update>, ApiError> {
        let params = GetUpdates {
            offset,
            timeout: wait,
            allowed_updates: ["message"],
        };
        self.call("getUpdates", &params, Duration::from_secs(wait) + REQUEST_TIMEOUT)
            .await
    }

    pub async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        reply_to: Option<i64>,
    ) -> Result<Message, ApiError> {
        let params = SendMessage {
            chat_id,
            text,
            reply_to_message_id: reply_to,
        };
        self.call("sendMessage", &params, REQUEST_TIMEOUT).await
    }

    pub async fn edit_message_text(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
    ) -> Result<(), ApiError> {
        let params = EditMessageText {
            chat_id,
            message_id,
            text,
        };
        // The result is either the edited message or `true`.
        let _: serde_json::Value = self.call("editMessageText", &params, REQUEST_TIMEOUT).await?;
        Ok(())
    }

    /// Upload `path` as a video, streaming it from disk.
    pub async fn send_video(
        &self,
        chat_id: i64,
        path: &Path,
        file_name: &str,
        caption: &str,
        reply_to: Option<i64>,
    ) -> Result<Message, ApiError> {
        let file = tokio::fs::File::open(path).await?;
        let len = file.metadata().await?.len();
        let body = reqwest::Body::wrap_stream(ReaderStream::new(file));
        let video = Part::stream_with_length(body, len)
            .file_name(file_name.to_string())
            .mime_str("video/mp4")?;

        let mut form = Form::new()
            .text("chat_id", chat_id.to_string())
            .text("caption", caption.to_string())
            .text("supports_streaming", "true")
            .part("video", video);
        if let Some(message_id) = reply_to {
            form = form.text("reply_to_message_id", message_id.to_string());
        }

        // Uploads of up to ~50 MB get a longer budget than plain calls.
        let response: ApiResponse<Message> = self
            .http
            .post(self.method_url("sendVideo"))
            .timeout(REQUEST_TIMEOUT * 5)
            .multipart(form)
            .send()
            .await?
            .json()
            .await?;
        unwrap_response(response)
    }
}

fn unwrap_response<T>(response: ApiResponse<T>) -> Result<T, ApiError> {
    match response {
        ApiResponse {
            ok: true,
            result: Some(result),
            ..
        } => Ok(result),
        ApiResponse {
            description,
            error_code,
            ..
        } => Err(ApiError::Api {
            code: error_code,
            description: description.unwrap_or_else(|| String::from("no description")),
        }),
    }
}
