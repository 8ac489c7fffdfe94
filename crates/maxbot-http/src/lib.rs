//! HTTP control endpoint (axum).
//!
//! A small authenticated surface for external tooling to trigger warn/mute/ban
//! actions directly: `POST /command` plus a `GET /` liveness probe.

mod routes;

pub use routes::{create_router, serve, CommandRequest, ControlState};
