//! Data Transfer Objects (DTOs) for the watch party server.
//!
//! DTOs are organized by protocol:
//! - `websocket`: WebSocket envelope and payload DTOs (the message codec)
//! - `http`: HTTP API request/response DTOs

pub mod conversion;
pub mod http;
pub mod websocket;
