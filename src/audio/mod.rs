pub mod capture;
pub mod pcm;
pub mod playback;
pub mod speaker;

pub use capture::{AudioInput, CaptureConfig, CaptureFrame, MicInput};
pub use pcm::AudioBuffer;
pub use playback::{AudioOutput, PlaybackId, PlaybackScheduler, Scheduled};
pub use speaker::RodioOutput;
