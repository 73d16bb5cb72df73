use std::sync::Arc;

use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::audio::capture::{AudioInput, CaptureFrame};
use crate::audio::pcm::{self, AudioBuffer};
use crate::audio::playback::{AudioOutput, PlaybackId, PlaybackScheduler};
use crate::error::SessionError;
use crate::live::messages::{MediaChunk, ServerMessage};
use crate::live::transport::{LiveConnectConfig, LiveHandle, LiveTransport, TransportEvent};
use crate::session::config::{InterviewConfig, SessionConfig};
use crate::session::transcript::{TranscriptAggregator, TranscriptionItem};

/// Lifecycle of one interview session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Idle,
    /// Devices acquired, remote handshake in progress
    Connecting,
    /// Media is flowing both ways
    Active,
    /// A fatal fault, with its user-facing message
    Error(String),
}

/// A live interview session.
///
/// Owns the transport handle, both audio devices, the playback scheduler
/// and the transcript log. All pipeline state is mutated on a single
/// event-dispatch task; the public methods only signal it.
pub struct InterviewSession {
    config: SessionConfig,
    transport: Arc<dyn LiveTransport>,
    input: Arc<Mutex<Box<dyn AudioInput>>>,
    output: Arc<dyn AudioOutput>,

    /// Lifecycle state, observable via `subscribe_state`
    state: Arc<watch::Sender<SessionState>>,

    /// Finalized transcript entries, append-only
    transcript: Arc<std::sync::Mutex<Vec<TranscriptionItem>>>,

    /// Camera frames queued for the dispatch task while Active
    camera_tx: std::sync::Mutex<Option<mpsc::UnboundedSender<String>>>,

    shutdown: watch::Sender<bool>,

    /// Handle for the dispatch task
    run_task: Mutex<Option<JoinHandle<()>>>,
}

impl InterviewSession {
    pub fn new(
        config: SessionConfig,
        transport: Arc<dyn LiveTransport>,
        input: Box<dyn AudioInput>,
        output: Arc<dyn AudioOutput>,
    ) -> Self {
        let (state, _) = watch::channel(SessionState::Idle);
        let (shutdown, _) = watch::channel(false);

        Self {
            config,
            transport,
            input: Arc::new(Mutex::new(input)),
            output,
            state: Arc::new(state),
            transcript: Arc::new(std::sync::Mutex::new(Vec::new())),
            camera_tx: std::sync::Mutex::new(None),
            shutdown,
            run_task: Mutex::new(None),
        }
    }

    /// Start the session for the given interview.
    ///
    /// Acquires the microphone and the output device, then connects the
    /// transport. Any acquisition failure surfaces as `Error` state without
    /// the remote ever being contacted.
    pub async fn start(&self, interview: InterviewConfig) -> Result<(), SessionError> {
        let startable = matches!(
            &*self.state.borrow(),
            SessionState::Idle | SessionState::Error(_)
        );
        if !startable {
            warn!("Session already starting or active");
            return Ok(());
        }

        info!("Starting interview session: {}", self.config.session_id);
        self.state.send_replace(SessionState::Connecting);

        // Acquire both devices before any remote handshake.
        {
            let mut input = self.input.lock().await;
            if let Err(e) = input.open().await {
                self.state.send_replace(SessionState::Error(e.to_string()));
                return Err(e);
            }
        }
        let ended_rx = match self.output.open() {
            Ok(rx) => rx,
            Err(e) => {
                let mut input = self.input.lock().await;
                let _ = input.close().await;
                self.state.send_replace(SessionState::Error(e.to_string()));
                return Err(e);
            }
        };

        let connect_config = LiveConnectConfig {
            voice: self.config.voice.clone(),
            system_instruction: interview.system_instruction(),
            transcribe_input: true,
            transcribe_output: true,
        };

        let (handle, events) = match self
            .transport
            .connect(&self.config.model, connect_config)
            .await
        {
            Ok(pair) => pair,
            Err(e) => {
                // Both devices were already acquired; release them again.
                {
                    let mut input = self.input.lock().await;
                    let _ = input.close().await;
                }
                self.output.close();
                self.state.send_replace(SessionState::Error(e.to_string()));
                return Err(e);
            }
        };

        let (camera_tx, camera_rx) = mpsc::unbounded_channel();
        if let Ok(mut slot) = self.camera_tx.lock() {
            *slot = Some(camera_tx);
        }

        self.shutdown.send_replace(false);
        let shutdown_rx = self.shutdown.subscribe();

        let task = tokio::spawn(run_session(
            self.config.clone(),
            Arc::clone(&self.input),
            Arc::clone(&self.output),
            handle,
            events,
            ended_rx,
            camera_rx,
            Arc::clone(&self.state),
            Arc::clone(&self.transcript),
            shutdown_rx,
        ));
        *self.run_task.lock().await = Some(task);

        Ok(())
    }

    /// Stop the session: close the transport, release every resource.
    ///
    /// A no-op (with a warning) when no session is running.
    pub async fn stop(&self) -> Result<(), SessionError> {
        let running = matches!(
            &*self.state.borrow(),
            SessionState::Connecting | SessionState::Active
        );
        if !running {
            warn!("Session not active");
            return Ok(());
        }

        info!("Stopping interview session: {}", self.config.session_id);
        self.shutdown.send_replace(true);

        if let Some(task) = self.run_task.lock().await.take() {
            if let Err(e) = task.await {
                error!("Session task panicked: {}", e);
            }
        }

        Ok(())
    }

    /// Submit one camera frame (base64 JPEG) from the frame producer.
    ///
    /// Forwarded verbatim while the session is Active; silently dropped in
    /// every other state. The check happens here, at submission time, so a
    /// frame submitted before Active can never be forwarded late.
    pub fn submit_frame(&self, jpeg_base64: String) {
        if *self.state.borrow() != SessionState::Active {
            return;
        }
        if let Ok(slot) = self.camera_tx.lock() {
            if let Some(tx) = slot.as_ref() {
                let _ = tx.send(jpeg_base64);
            }
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Watch lifecycle transitions.
    pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Snapshot of the finalized transcript entries.
    pub fn transcript(&self) -> Vec<TranscriptionItem> {
        self.transcript
            .lock()
            .map(|log| log.clone())
            .unwrap_or_default()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }
}

/// The single event-dispatch task.
///
/// Every mutation of the scheduler, the aggregator and the lifecycle state
/// happens here, serialized through one `select!` loop.
#[allow(clippy::too_many_arguments)]
async fn run_session(
    config: SessionConfig,
    input: Arc<Mutex<Box<dyn AudioInput>>>,
    output: Arc<dyn AudioOutput>,
    handle: Box<dyn LiveHandle>,
    mut events: mpsc::UnboundedReceiver<TransportEvent>,
    mut ended_rx: mpsc::UnboundedReceiver<PlaybackId>,
    mut camera_rx: mpsc::UnboundedReceiver<String>,
    state: Arc<watch::Sender<SessionState>>,
    transcript: Arc<std::sync::Mutex<Vec<TranscriptionItem>>>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut scheduler = PlaybackScheduler::new();
    let mut aggregator = TranscriptAggregator::new();
    let mut capture_rx: Option<mpsc::UnboundedReceiver<CaptureFrame>> = None;

    // Decode completions come back with the epoch observed at request time.
    let (schedule_tx, mut schedule_rx) = mpsc::unbounded_channel::<(u64, AudioBuffer)>();

    let final_state = loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(TransportEvent::Open) => {
                    info!("Live session open, starting capture");
                    match input.lock().await.start().await {
                        Ok(rx) => {
                            capture_rx = Some(rx);
                            state.send_replace(SessionState::Active);
                        }
                        Err(e) => {
                            error!("Failed to start capture: {}", e);
                            break SessionState::Error(e.to_string());
                        }
                    }
                }
                Some(TransportEvent::Message(message)) => {
                    handle_server_message(
                        message,
                        &mut scheduler,
                        &mut aggregator,
                        &transcript,
                        output.as_ref(),
                        &schedule_tx,
                        config.output_sample_rate,
                        config.channels,
                    );
                }
                Some(TransportEvent::Error(message)) => {
                    error!("Transport error: {}", message);
                    break SessionState::Error(
                        SessionError::TransportRuntime(message).to_string(),
                    );
                }
                Some(TransportEvent::Closed) | None => {
                    info!("Remote closed the session");
                    break SessionState::Idle;
                }
            },

            frame = recv_capture(&mut capture_rx) => match frame {
                Some(frame) => {
                    let chunk = MediaChunk::pcm_audio(
                        pcm::encode_pcm16_base64(&frame.samples),
                        frame.sample_rate,
                    );
                    // Fire and forget: a lost frame never halts the tap.
                    if let Err(e) = handle.send_realtime(chunk).await {
                        warn!("Dropping capture frame: {}", e);
                    }
                }
                None => {
                    capture_rx = None;
                }
            },

            Some(jpeg) = camera_rx.recv() => {
                if let Err(e) = handle.send_realtime(MediaChunk::jpeg(jpeg)).await {
                    warn!("Dropping camera frame: {}", e);
                }
            }

            Some((epoch, buffer)) = schedule_rx.recv() => {
                let duration = buffer.duration_secs();
                if let Some(scheduled) =
                    scheduler.schedule(duration, output.current_time(), epoch)
                {
                    if let Err(e) = output.start(scheduled.id, buffer, scheduled.start_time) {
                        warn!("Failed to start playback: {}", e);
                        scheduler.finished(scheduled.id);
                    }
                }
            }

            Some(id) = ended_rx.recv() => {
                scheduler.finished(id);
            }

            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    info!("Stop requested, closing live session");
                    if let Err(e) = handle.close().await {
                        warn!("Error closing transport: {}", e);
                    }
                    break SessionState::Idle;
                }
            }
        }
    };

    teardown(&input, output.as_ref(), &mut scheduler).await;
    drop(handle);
    state.send_replace(final_state);
}

/// Dispatch one inbound message to the aggregator and the scheduler.
#[allow(clippy::too_many_arguments)]
fn handle_server_message(
    message: ServerMessage,
    scheduler: &mut PlaybackScheduler,
    aggregator: &mut TranscriptAggregator,
    transcript: &Arc<std::sync::Mutex<Vec<TranscriptionItem>>>,
    output: &dyn AudioOutput,
    schedule_tx: &mpsc::UnboundedSender<(u64, AudioBuffer)>,
    output_sample_rate: u32,
    channels: u16,
) {
    let Some(content) = message.server_content else {
        return;
    };

    if let Some(text) = content.input_transcription.and_then(|t| t.text) {
        aggregator.append_user(&text);
    }
    if let Some(text) = content.output_transcription.and_then(|t| t.text) {
        aggregator.append_model(&text);
    }

    if let Some(turn) = content.model_turn {
        for part in turn.parts {
            let Some(inline) = part.inline_data else {
                continue;
            };
            let epoch = scheduler.epoch();
            let schedule_tx = schedule_tx.clone();
            tokio::spawn(async move {
                match pcm::decode_base64(&inline.data) {
                    Ok(bytes) => {
                        match pcm::decode_audio_data(bytes, output_sample_rate, channels).await {
                            Ok(buffer) => {
                                let _ = schedule_tx.send((epoch, buffer));
                            }
                            // Local failure: drop this chunk, keep the session.
                            Err(e) => warn!("Dropping inbound audio chunk: {}", e),
                        }
                    }
                    Err(e) => warn!("Dropping inbound audio chunk: {}", e),
                }
            });
        }
    }

    if content.interrupted == Some(true) {
        let stopped = scheduler.interrupt();
        info!("Barge-in: flushing {} scheduled buffers", stopped.len());
        for id in stopped {
            output.stop(id);
        }
    }

    if content.turn_complete == Some(true) {
        let items = aggregator.complete_turn();
        if !items.is_empty() {
            if let Ok(mut log) = transcript.lock() {
                log.extend(items);
            }
        }
    }
}

/// Wait for a capture frame, or forever when the tap is not running.
async fn recv_capture(
    capture_rx: &mut Option<mpsc::UnboundedReceiver<CaptureFrame>>,
) -> Option<CaptureFrame> {
    match capture_rx.as_mut() {
        Some(rx) => rx.recv().await,
        None => futures::future::pending().await,
    }
}

/// Release every resource the session holds.
///
/// Safe to run more than once: each step tolerates an already-released
/// target, and a second pass finds nothing left to stop.
async fn teardown(
    input: &Arc<Mutex<Box<dyn AudioInput>>>,
    output: &dyn AudioOutput,
    scheduler: &mut PlaybackScheduler,
) {
    {
        let mut input = input.lock().await;
        if let Err(e) = input.stop().await {
            warn!("Error stopping capture: {}", e);
        }
        if let Err(e) = input.close().await {
            warn!("Error closing input device: {}", e);
        }
    }

    for id in scheduler.interrupt() {
        output.stop(id);
    }
    output.close();

    info!("Session resources released");
}
