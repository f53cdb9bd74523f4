//! HR Desk - administration portal server.
//!
//! - [`api`]: axum router, JWT sessions, JSON envelope
//! - [`cli`]: `serve`, `init`, `create-admin`, `status`
//! - [`config`]: server settings from flags and `HRDESK_*` variables

pub mod api;
pub mod cli;
pub mod config;

pub use hrdesk_core;
