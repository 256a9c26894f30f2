//! Infrastructure layer: wire DTOs, the in-memory room registry and media adapters.

pub mod dto;
pub mod media;
pub mod repository;
