//! Telegram Bot API front end.

pub mod client;
pub mod handler;
pub mod poller;
pub mod types;

pub use client::BotClient;
pub use poller::Poller;
