//! Utilities shared by the watch party packages.

pub mod logger;
pub mod time;
