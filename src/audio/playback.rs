// Playback scheduling: gapless back-to-back ordering with barge-in flush.

use std::collections::HashMap;
use tokio::sync::mpsc;

use crate::audio::pcm::AudioBuffer;
use crate::error::SessionError;

/// Identifier for one scheduled-but-unfinished output buffer.
pub type PlaybackId = u64;

/// Result of scheduling one decoded buffer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scheduled {
    pub id: PlaybackId,
    /// Start offset in seconds on the output clock
    pub start_time: f64,
}

/// Output device: a monotonic clock plus start/stop of scheduled buffers.
pub trait AudioOutput: Send + Sync {
    /// Acquire the device. The returned receiver yields the id of each
    /// buffer that finishes playing naturally.
    fn open(&self) -> Result<mpsc::UnboundedReceiver<PlaybackId>, SessionError>;

    /// Current time in seconds on the output clock.
    fn current_time(&self) -> f64;

    /// Begin playing `buffer` at `start_time` on the output clock.
    fn start(
        &self,
        id: PlaybackId,
        buffer: AudioBuffer,
        start_time: f64,
    ) -> Result<(), SessionError>;

    /// Force-stop one scheduled buffer. Unknown ids are ignored.
    fn stop(&self, id: PlaybackId);

    /// Release the device. Safe to call more than once.
    fn close(&self);
}

/// Tracks the playback cursor and the set of in-flight handles.
///
/// Buffers are scheduled back-to-back in arrival order: each start time is
/// the previous start plus the previous duration, clamped to the device
/// clock when the queue has drained. The clamp happens only at buffer
/// arrival, so unusually long decode latency can leave a short silent gap
/// before the next buffer; ordering stays gapless relative to earlier
/// buffers either way.
#[derive(Debug)]
pub struct PlaybackScheduler {
    next_start_time: f64,
    /// Live set: id → scheduled start time
    live: HashMap<PlaybackId, f64>,
    next_id: PlaybackId,
    epoch: u64,
}

impl PlaybackScheduler {
    pub fn new() -> Self {
        Self {
            next_start_time: 0.0,
            live: HashMap::new(),
            next_id: 0,
            epoch: 0,
        }
    }

    /// Epoch to capture before requesting a decode. Completions carrying a
    /// stale epoch are refused by [`PlaybackScheduler::schedule`]: an
    /// interrupt or teardown happened while the decode was in flight.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Schedule one decoded buffer of `duration_secs` against device time
    /// `now`. Returns the allocated handle and its start time, or `None`
    /// when `epoch` is stale.
    pub fn schedule(&mut self, duration_secs: f64, now: f64, epoch: u64) -> Option<Scheduled> {
        if epoch != self.epoch {
            return None;
        }

        // Never schedule in the past after an idle gap.
        if self.next_start_time < now {
            self.next_start_time = now;
        }

        let id = self.next_id;
        self.next_id += 1;

        let scheduled = Scheduled {
            id,
            start_time: self.next_start_time,
        };
        self.live.insert(id, scheduled.start_time);
        self.next_start_time += duration_secs;

        Some(scheduled)
    }

    /// Deregister a handle that finished playing naturally. Returns false
    /// if the handle was already removed (force-stopped by an interrupt);
    /// a handle leaves the live set exactly once.
    pub fn finished(&mut self, id: PlaybackId) -> bool {
        self.live.remove(&id).is_some()
    }

    /// Flush every in-flight handle: clears the live set, resets the cursor
    /// to zero and bumps the epoch so pending decode completions are
    /// discarded. Returns the ids that must be force-stopped on the device.
    pub fn interrupt(&mut self) -> Vec<PlaybackId> {
        self.epoch += 1;
        self.next_start_time = 0.0;
        let mut ids: Vec<PlaybackId> = self.live.drain().map(|(id, _)| id).collect();
        ids.sort_unstable();
        ids
    }

    /// Number of handles not yet finished or stopped.
    pub fn live_handles(&self) -> usize {
        self.live.len()
    }

    pub fn next_start_time(&self) -> f64 {
        self.next_start_time
    }
}

impl Default for PlaybackScheduler {
    fn default() -> Self {
        Self::new()
    }
}
