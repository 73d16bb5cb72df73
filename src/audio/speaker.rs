// Playback device backed by rodio, one sink per scheduled buffer.
//
// rodio's OutputStream is not Send, so the device lives on a dedicated
// thread driven by a command channel. Start-at-time is realized by
// prefixing the buffer with a silence source covering the delay; the
// thread polls its sinks and reports natural completion by id.

use rodio::buffer::SamplesBuffer;
use rodio::source::Zero;
use rodio::{OutputStream, Sink, Source};
use std::collections::HashMap;
use std::sync::mpsc as std_mpsc;
use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{error, info};

use crate::audio::pcm::AudioBuffer;
use crate::audio::playback::{AudioOutput, PlaybackId};
use crate::error::SessionError;

enum SpeakerCommand {
    Start {
        id: PlaybackId,
        buffer: AudioBuffer,
        delay: Duration,
    },
    Stop(PlaybackId),
    Close,
}

struct SpeakerThread {
    commands: std_mpsc::Sender<SpeakerCommand>,
    thread: thread::JoinHandle<()>,
}

/// Default-device rodio output.
pub struct RodioOutput {
    inner: Mutex<Option<SpeakerThread>>,
    started: Instant,
}

impl RodioOutput {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(None),
            started: Instant::now(),
        }
    }
}

impl Default for RodioOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioOutput for RodioOutput {
    fn open(&self) -> Result<mpsc::UnboundedReceiver<PlaybackId>, SessionError> {
        // A fresh open always restarts the playback thread so the caller
        // gets a receiver bound to the new device instance.
        self.close();

        let (command_tx, command_rx) = std_mpsc::channel();
        let (ready_tx, ready_rx) = std_mpsc::channel();
        let (ended_tx, ended_rx) = mpsc::unbounded_channel();

        let thread = thread::Builder::new()
            .name("speaker-playback".into())
            .spawn(move || run_speaker(command_rx, ready_tx, ended_tx))
            .map_err(|e| {
                SessionError::Permission(format!("failed to spawn playback thread: {}", e))
            })?;

        match ready_rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => {
                return Err(SessionError::Permission(
                    "playback thread exited before opening the device".to_string(),
                ))
            }
        }

        if let Ok(mut inner) = self.inner.lock() {
            *inner = Some(SpeakerThread {
                commands: command_tx,
                thread,
            });
        }

        info!("Audio output open");

        Ok(ended_rx)
    }

    fn current_time(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }

    fn start(
        &self,
        id: PlaybackId,
        buffer: AudioBuffer,
        start_time: f64,
    ) -> Result<(), SessionError> {
        let delay = (start_time - self.current_time()).max(0.0);

        let guard = self
            .inner
            .lock()
            .map_err(|_| SessionError::Permission("playback state poisoned".to_string()))?;
        match guard.as_ref() {
            Some(speaker) => speaker
                .commands
                .send(SpeakerCommand::Start {
                    id,
                    buffer,
                    delay: Duration::from_secs_f64(delay),
                })
                .map_err(|_| SessionError::Permission("playback thread is gone".to_string())),
            None => Err(SessionError::Permission(
                "audio output is not open".to_string(),
            )),
        }
    }

    fn stop(&self, id: PlaybackId) {
        if let Ok(guard) = self.inner.lock() {
            if let Some(speaker) = guard.as_ref() {
                let _ = speaker.commands.send(SpeakerCommand::Stop(id));
            }
        }
    }

    fn close(&self) {
        let speaker = match self.inner.lock() {
            Ok(mut inner) => inner.take(),
            Err(_) => None,
        };
        if let Some(speaker) = speaker {
            let _ = speaker.commands.send(SpeakerCommand::Close);
            let _ = speaker.thread.join();
            info!("Audio output closed");
        }
    }
}

impl Drop for RodioOutput {
    fn drop(&mut self) {
        self.close();
    }
}

/// Playback thread: owns the rodio stream and one sink per live buffer.
fn run_speaker(
    commands: std_mpsc::Receiver<SpeakerCommand>,
    ready: std_mpsc::Sender<Result<(), SessionError>>,
    ended: mpsc::UnboundedSender<PlaybackId>,
) {
    let (_stream, handle) = match OutputStream::try_default() {
        Ok(pair) => pair,
        Err(e) => {
            let _ = ready.send(Err(SessionError::Permission(format!(
                "failed to open audio output: {}",
                e
            ))));
            return;
        }
    };

    let _ = ready.send(Ok(()));

    let mut sinks: HashMap<PlaybackId, Sink> = HashMap::new();

    loop {
        // Short timeout so finished sinks are noticed promptly.
        match commands.recv_timeout(Duration::from_millis(50)) {
            Ok(SpeakerCommand::Start { id, buffer, delay }) => {
                let sink = match Sink::try_new(&handle) {
                    Ok(sink) => sink,
                    Err(e) => {
                        error!("Failed to create playback sink: {}", e);
                        continue;
                    }
                };
                if !delay.is_zero() {
                    let silence =
                        Zero::<f32>::new(buffer.channels, buffer.sample_rate).take_duration(delay);
                    sink.append(silence);
                }
                sink.append(SamplesBuffer::new(
                    buffer.channels,
                    buffer.sample_rate,
                    buffer.samples,
                ));
                sinks.insert(id, sink);
            }
            Ok(SpeakerCommand::Stop(id)) => {
                if let Some(sink) = sinks.remove(&id) {
                    sink.stop();
                }
            }
            Ok(SpeakerCommand::Close) | Err(std_mpsc::RecvTimeoutError::Disconnected) => break,
            Err(std_mpsc::RecvTimeoutError::Timeout) => {}
        }

        sinks.retain(|id, sink| {
            if sink.empty() {
                let _ = ended.send(*id);
                false
            } else {
                true
            }
        });
    }

    for (_, sink) in sinks.drain() {
        sink.stop();
    }
}
