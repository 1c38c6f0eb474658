//! Ports - traits the pipeline talks through.

pub mod chat;

pub use chat::{PartSender, ProgressSink};
