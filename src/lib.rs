//! Grokipedia CLI library
//!
//! Exposes the API client, response cache and command layer so the binary and
//! integration tests share one implementation.

pub mod api;
pub mod cache;
pub mod cli;
pub mod commands;
pub mod config;
pub mod logging;
pub mod render;
