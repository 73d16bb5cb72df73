pub mod audio;
pub mod config;
pub mod error;
pub mod live;
pub mod session;

pub use audio::{
    AudioBuffer, AudioInput, AudioOutput, CaptureConfig, CaptureFrame, MicInput, PlaybackId,
    PlaybackScheduler, RodioOutput, Scheduled,
};
pub use config::Config;
pub use error::SessionError;
pub use live::{
    LiveConnectConfig, LiveHandle, LiveTransport, MediaChunk, ServerContent, ServerMessage,
    TransportEvent, WsLiveTransport,
};
pub use session::{
    InterviewConfig, InterviewSession, SessionConfig, SessionState, Speaker, TranscriptAggregator,
    TranscriptionItem,
};
