//! HTTP API module.
//!
//! This module provides the HTTP server, its payload types, and the log
//! broadcaster shared with the rest of the crate.

pub mod logs;
pub mod server;
pub mod types;

pub use logs::*;
pub use server::{router, start_server, AppState};
pub use types::*;
