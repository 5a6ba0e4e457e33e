//! Library crate for scoreboard-back, exposing modules for binaries and integration tests.

/// Runtime configuration.
pub mod config;
/// Remote participant table access.
pub mod dao;
/// Wire types exchanged over HTTP and SSE.
pub mod dto;
/// Service and HTTP error types.
pub mod error;
/// Axum routers.
pub mod routes;
/// Business operations and background tasks.
pub mod services;
/// Shared in-memory state.
pub mod state;
