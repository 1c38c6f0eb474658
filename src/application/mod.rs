//! Application layer - services that drive the pipeline through ports.

pub mod transfer;

pub use transfer::{TransferReport, TransferService};
