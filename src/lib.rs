//! Clipferry - Twitter/X video relay bot
//!
//! Hexagonal Architecture:
//! - domain/: The transfer pipeline (fetch, split, merge, plan, workspace)
//! - ports/: Trait definitions the pipeline reports through
//! - adapters/: Telegram Bot API front end, gallery-dl configuration
//! - application/: The transfer service driving one request end to end
//! - config: Environment configuration
//! - error: Error types

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod ports;

// Re-exports for convenience
pub use application::{TransferReport, TransferService};
pub use config::{AccessList, BotConfig, TransferLimits};
pub use error::{Result, TransferError};
