//! Core types, configuration, and error handling for SmartStream.
//!
//! This crate provides the shared foundation used by the advisor pipeline and
//! the `smartstream` binary:
//! - [`SmartstreamError`]: unified error type using `thiserror`
//! - [`SmartstreamConfig`]: configuration loaded from `.smartstream.toml`
//!   and overlaid with environment variables
//! - Shared types: [`Backend`], [`LogSource`], [`TruncationDirection`],
//!   [`OutputFormat`]

mod config;
mod error;
mod types;

pub use config::{
    EndpointConfig, InputConfig, LlmConfig, OutputConfig, SlackConfig, SmartstreamConfig,
    DEFAULT_CONFIG_FILE,
};
pub use error::SmartstreamError;
pub use types::{Backend, LogSource, OutputFormat, TruncationDirection};

/// A convenience `Result` type for SmartStream operations.
pub type Result<T> = std::result::Result<T, SmartstreamError>;
