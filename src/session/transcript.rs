// Turn-based transcript aggregation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who produced a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Model,
}

/// One finalized transcript entry.
///
/// Created only when a turn completes; never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionItem {
    pub speaker: Speaker,
    pub text: String,
    /// When the turn completed
    pub timestamp: DateTime<Utc>,
}

/// Accumulates streamed transcription fragments for the current turn.
///
/// User and model fragments grow in separate buffers and are never
/// interleaved. A turn-complete signal flushes both buffers together, user
/// entry first to reflect conversational order.
#[derive(Debug, Default)]
pub struct TranscriptAggregator {
    user: String,
    model: String,
}

impl TranscriptAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fragment of what the user said.
    pub fn append_user(&mut self, fragment: &str) {
        self.user.push_str(fragment);
    }

    /// Append a fragment of what the model said.
    pub fn append_model(&mut self, fragment: &str) {
        self.model.push_str(fragment);
    }

    /// Finalize the current turn.
    ///
    /// Emits one item per non-empty trimmed buffer, user before model, then
    /// clears both buffers regardless of whether anything was emitted.
    pub fn complete_turn(&mut self) -> Vec<TranscriptionItem> {
        let timestamp = Utc::now();
        let mut items = Vec::new();

        let user = self.user.trim();
        if !user.is_empty() {
            items.push(TranscriptionItem {
                speaker: Speaker::User,
                text: user.to_string(),
                timestamp,
            });
        }

        let model = self.model.trim();
        if !model.is_empty() {
            items.push(TranscriptionItem {
                speaker: Speaker::Model,
                text: model.to_string(),
                timestamp,
            });
        }

        self.user.clear();
        self.model.clear();

        items
    }

    /// Drop any partial fragments without emitting entries.
    pub fn clear(&mut self) {
        self.user.clear();
        self.model.clear();
    }
}
