//! Build-log triage for SmartStream.
//!
//! Reads a failing build log, asks a language model for a fix, detects the
//! "no fix found" answer, persists the suggestion, and alerts Slack when a
//! human has to step in.

pub mod detect;
pub mod endpoint;
pub mod input;
pub mod llm;
pub mod output;
pub mod pipeline;
pub mod prompt;
pub mod sigv4;
pub mod slack;
