// Microphone capture: fixed-size normalized frames over a channel.
//
// cpal streams are not Send, so the real device lives on a dedicated
// thread; the trait object only holds a command channel to it. The audio
// callback never blocks: finished frames go out on an unbounded channel and
// a frame that cannot be delivered is simply lost.

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::mpsc as std_mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::error::SessionError;

/// One fixed-size frame of normalized samples from the input device.
#[derive(Debug, Clone)]
pub struct CaptureFrame {
    /// Samples in [-1.0, 1.0], interleaved if multi-channel
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
}

/// Configuration for the capture device
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Capture sample rate (the endpoint expects 16kHz input)
    pub sample_rate: u32,
    /// Number of channels (1 = mono)
    pub channels: u16,
    /// Samples per frame handed to the session (also the encode unit)
    pub frame_size: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16_000,
            channels: 1,
            frame_size: 4096,
        }
    }
}

/// Audio input device.
///
/// `open` acquires the device (the permission step) without starting the
/// tap; `start` begins frame delivery. `stop` and `close` are safe to call
/// when the tap is not running.
#[async_trait]
pub trait AudioInput: Send {
    /// Acquire the device. Fails with `SessionError::Permission` when the
    /// microphone is denied or missing.
    async fn open(&mut self) -> Result<(), SessionError>;

    /// Begin the capture tap.
    ///
    /// Returns a channel receiver that will receive fixed-size frames.
    async fn start(&mut self) -> Result<mpsc::UnboundedReceiver<CaptureFrame>, SessionError>;

    /// Pause frame delivery. The device stays acquired.
    async fn stop(&mut self) -> Result<(), SessionError>;

    /// Release the device. Idempotent.
    async fn close(&mut self) -> Result<(), SessionError>;

    /// Check if the tap is currently running
    fn is_capturing(&self) -> bool;

    /// Get device name for logging
    fn name(&self) -> &str;
}

enum MicCommand {
    Start(mpsc::UnboundedSender<CaptureFrame>),
    Stop,
    Shutdown,
}

/// Default-host cpal microphone.
pub struct MicInput {
    config: CaptureConfig,
    commands: Option<std_mpsc::Sender<MicCommand>>,
    thread: Option<thread::JoinHandle<()>>,
    capturing: bool,
}

impl MicInput {
    pub fn new(config: CaptureConfig) -> Self {
        Self {
            config,
            commands: None,
            thread: None,
            capturing: false,
        }
    }
}

#[async_trait]
impl AudioInput for MicInput {
    async fn open(&mut self) -> Result<(), SessionError> {
        if self.commands.is_some() {
            return Ok(());
        }

        let (command_tx, command_rx) = std_mpsc::channel();
        let (ready_tx, ready_rx) = std_mpsc::channel();
        let config = self.config.clone();

        let thread = thread::Builder::new()
            .name("mic-capture".into())
            .spawn(move || run_device(config, command_rx, ready_tx))
            .map_err(|e| {
                SessionError::Permission(format!("failed to spawn capture thread: {}", e))
            })?;

        // The thread reports back once the stream is built (or not).
        let ready = tokio::task::spawn_blocking(move || ready_rx.recv())
            .await
            .map_err(|e| SessionError::Permission(format!("capture thread failed: {}", e)))?
            .map_err(|_| {
                SessionError::Permission("capture thread exited before opening the device".into())
            })?;
        ready?;

        self.commands = Some(command_tx);
        self.thread = Some(thread);

        info!(
            "Microphone open ({}Hz, {} channels)",
            self.config.sample_rate, self.config.channels
        );

        Ok(())
    }

    async fn start(&mut self) -> Result<mpsc::UnboundedReceiver<CaptureFrame>, SessionError> {
        let commands = self
            .commands
            .as_ref()
            .ok_or_else(|| SessionError::Permission("microphone is not open".to_string()))?;

        let (frame_tx, frame_rx) = mpsc::unbounded_channel();
        commands
            .send(MicCommand::Start(frame_tx))
            .map_err(|_| SessionError::Permission("capture thread is gone".to_string()))?;
        self.capturing = true;

        info!("Microphone capture started");

        Ok(frame_rx)
    }

    async fn stop(&mut self) -> Result<(), SessionError> {
        if !self.capturing {
            return Ok(());
        }

        if let Some(commands) = &self.commands {
            let _ = commands.send(MicCommand::Stop);
        }
        self.capturing = false;

        info!("Microphone capture stopped");

        Ok(())
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        if let Some(commands) = self.commands.take() {
            let _ = commands.send(MicCommand::Shutdown);
        }
        if let Some(thread) = self.thread.take() {
            let _ = tokio::task::spawn_blocking(move || thread.join()).await;
        }
        self.capturing = false;

        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing
    }

    fn name(&self) -> &str {
        "cpal microphone"
    }
}

impl Drop for MicInput {
    fn drop(&mut self) {
        if let Some(commands) = self.commands.take() {
            let _ = commands.send(MicCommand::Shutdown);
        }
    }
}

/// Device thread: owns the cpal stream, obeys start/stop/shutdown commands.
fn run_device(
    config: CaptureConfig,
    commands: std_mpsc::Receiver<MicCommand>,
    ready: std_mpsc::Sender<Result<(), SessionError>>,
) {
    let host = cpal::default_host();
    let device = match host.default_input_device() {
        Some(device) => device,
        None => {
            let _ = ready.send(Err(SessionError::Permission(
                "no input device available".to_string(),
            )));
            return;
        }
    };

    let stream_config = cpal::StreamConfig {
        channels: config.channels,
        sample_rate: config.sample_rate,
        buffer_size: cpal::BufferSize::Default,
    };

    // The tap sender is swapped in and out by the command loop; the callback
    // just accumulates and forwards full frames to whoever is listening.
    let sender: Arc<Mutex<Option<mpsc::UnboundedSender<CaptureFrame>>>> =
        Arc::new(Mutex::new(None));
    let pending: Arc<Mutex<Vec<f32>>> = Arc::new(Mutex::new(Vec::new()));

    let callback_sender = Arc::clone(&sender);
    let callback_pending = Arc::clone(&pending);
    let frame_size = config.frame_size;
    let sample_rate = config.sample_rate;
    let channels = config.channels;

    let stream = device.build_input_stream(
        &stream_config,
        move |data: &[f32], _: &cpal::InputCallbackInfo| {
            let Ok(mut buffer) = callback_pending.lock() else {
                return;
            };
            buffer.extend_from_slice(data);
            while buffer.len() >= frame_size {
                let samples: Vec<f32> = buffer.drain(..frame_size).collect();
                if let Ok(guard) = callback_sender.lock() {
                    if let Some(tx) = guard.as_ref() {
                        let _ = tx.send(CaptureFrame {
                            samples,
                            sample_rate,
                            channels,
                        });
                    }
                }
            }
        },
        |err| error!("Audio input stream error: {}", err),
        None,
    );

    let stream = match stream {
        Ok(stream) => stream,
        Err(e) => {
            let _ = ready.send(Err(SessionError::Permission(format!(
                "failed to open microphone: {}",
                e
            ))));
            return;
        }
    };

    // Some backends start streams on build; hold frames until Start.
    if let Err(e) = stream.pause() {
        warn!("Could not pause input stream after open: {}", e);
    }

    let _ = ready.send(Ok(()));

    while let Ok(command) = commands.recv() {
        match command {
            MicCommand::Start(tx) => {
                if let Ok(mut buffer) = pending.lock() {
                    buffer.clear();
                }
                if let Ok(mut guard) = sender.lock() {
                    *guard = Some(tx);
                }
                if let Err(e) = stream.play() {
                    error!("Failed to start input stream: {}", e);
                }
            }
            MicCommand::Stop => {
                if let Ok(mut guard) = sender.lock() {
                    *guard = None;
                }
                if let Err(e) = stream.pause() {
                    warn!("Failed to pause input stream: {}", e);
                }
            }
            MicCommand::Shutdown => break,
        }
    }
}
