//! Core domain + application logic for the MaximAI moderation bot.
//!
//! This crate is intentionally framework-agnostic. Telegram / the Cerebras
//! completion API / the HTTP control surface live behind ports (traits)
//! implemented in adapter crates.

pub mod chat;
pub mod classifier;
pub mod config;
pub mod domain;
pub mod errors;
pub mod ledger;
pub mod logging;
pub mod model;
pub mod moderation;
pub mod policy;
pub mod ports;
pub mod status;

pub use errors::{Error, Result};
