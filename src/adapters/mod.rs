//! Adapters - concrete implementations of ports and external tools.

pub mod gallery_dl;
pub mod telegram;
