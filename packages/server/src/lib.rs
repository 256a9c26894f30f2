//! Watch party server: rooms of participants watching the same video in
//! lock-step, with chat and peer-to-peer signaling relay.

pub mod config;
pub mod domain;
pub mod hub;
pub mod infrastructure;
pub mod ui;
pub mod usecase;
