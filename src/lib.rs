//! imgrelay - prompt-to-image HTTP relay
//!
//! This library provides the core functionality for the imgrelay server:
//! configuration, error mapping, and the relay HTTP surface that forwards
//! prompts to a Hugging Face inference endpoint.

pub mod config;
pub mod error;
pub mod relay;

pub use config::Config;
pub use error::{Error, Result};
