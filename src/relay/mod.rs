//! HTTP relay module.
//!
//! This module provides the HTTP surface that accepts prompt requests and
//! forwards them to the configured inference provider.

mod handlers;
mod server;
pub mod types;

pub use server::{create_router, run_server, AppState};
pub use types::{GenerateRequest, GenerateResponse};
