//! Domain layer - the transfer pipeline and its building blocks.

pub mod av;
pub mod fetch;
pub mod link;
pub mod media;
pub mod session;

pub use fetch::Fetcher;
pub use link::LinkPattern;
pub use media::{DeliverablePart, MediaFile, Segment};
pub use session::TransferSession;
