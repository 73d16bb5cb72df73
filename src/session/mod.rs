//! Live interview session management
//!
//! This module provides the `InterviewSession` abstraction that manages:
//! - Session lifecycle (idle → connecting → active → error/closed)
//! - Microphone capture → PCM encode → transport
//! - Inbound audio → decode → gapless playback scheduling
//! - Turn-based transcript aggregation
//! - Barge-in handling and full resource teardown

mod config;
mod session;
mod transcript;

pub use config::{InterviewConfig, SessionConfig};
pub use session::{InterviewSession, SessionState};
pub use transcript::{Speaker, TranscriptAggregator, TranscriptionItem};
