use serde::{Deserialize, Serialize};

/// What the interview is about.
///
/// Supplied once at session start; read-only for the session's lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterviewConfig {
    /// Position being interviewed for (e.g. "Backend Engineer")
    pub role: String,

    /// Company conducting the interview
    pub company: String,

    /// Candidate's experience level (e.g. "junior", "senior")
    pub experience_level: String,
}

impl InterviewConfig {
    /// Instruction handed to the remote model at connect time.
    pub fn system_instruction(&self) -> String {
        format!(
            "You are a professional interviewer conducting a mock interview for a {} \
             position at {}. The candidate has {} experience. Ask one question at a \
             time, listen to the full answer, and follow up the way a real \
             interviewer would. Keep your responses concise and conversational.",
            self.role, self.company, self.experience_level
        )
    }
}

/// Configuration for a live session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Unique session identifier
    pub session_id: String,

    /// Remote model identifier
    pub model: String,

    /// Prebuilt synthesized voice name
    pub voice: String,

    /// Capture sample rate (the endpoint expects 16kHz input)
    pub input_sample_rate: u32,

    /// Rate the endpoint declares for returned audio
    pub output_sample_rate: u32,

    /// Number of audio channels (1 = mono)
    pub channels: u16,

    /// Samples per capture frame
    pub frame_size: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_id: format!("interview-{}", uuid::Uuid::new_v4()),
            model: "models/gemini-2.0-flash-exp".to_string(),
            voice: "Puck".to_string(),
            input_sample_rate: 16_000,
            output_sample_rate: 24_000, // Endpoint returns 24kHz audio
            channels: 1,                // Mono
            frame_size: 4096,
        }
    }
}
