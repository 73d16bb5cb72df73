//! Error types for mockview.
//!
//! Each variant carries the one human-readable message that reaches the
//! presentation layer; raw internals stay in the logs.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    /// Microphone or speaker could not be acquired (denied or missing).
    #[error("Audio device unavailable: {0}")]
    Permission(String),

    /// The live endpoint rejected or never completed the connection.
    #[error("Could not reach the interview service: {0}")]
    TransportSetup(String),

    /// The live endpoint failed mid-session.
    #[error("Lost connection to the interview service: {0}")]
    TransportRuntime(String),

    /// A single inbound audio chunk could not be decoded. Local only: the
    /// chunk is dropped and the session continues.
    #[error("Failed to decode an audio chunk: {0}")]
    Decode(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}
