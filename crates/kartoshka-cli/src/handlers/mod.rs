//! Command handlers.

pub mod download;
pub mod info;
pub mod playlist;
