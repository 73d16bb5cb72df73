// WebSocket client for the live endpoint.

use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex};
use tokio_tungstenite::{connect_async, tungstenite, MaybeTlsStream, WebSocketStream};
use tracing::{info, warn};

use super::messages::{
    Content, EmptyObject, GenerationConfig, MediaChunk, PrebuiltVoiceConfig, RealtimeInput,
    RealtimeInputMessage, ServerMessage, Setup, SetupMessage, SpeechConfig, TextPart, VoiceConfig,
};
use super::transport::{LiveConnectConfig, LiveHandle, LiveTransport, TransportEvent};
use crate::error::SessionError;

/// Bidirectional-generation endpoint of the Gemini API.
pub const DEFAULT_ENDPOINT: &str = "wss://generativelanguage.googleapis.com/ws/google.ai.generativelanguage.v1beta.GenerativeService.BidiGenerateContent";

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, tungstenite::Message>;
type WsStream = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

/// WebSocket implementation of [`LiveTransport`].
pub struct WsLiveTransport {
    endpoint: String,
    api_key: String,
}

impl WsLiveTransport {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        }
    }

    fn url(&self) -> String {
        format!("{}?key={}", self.endpoint, self.api_key)
    }
}

#[async_trait]
impl LiveTransport for WsLiveTransport {
    async fn connect(
        &self,
        model: &str,
        config: LiveConnectConfig,
    ) -> Result<(Box<dyn LiveHandle>, mpsc::UnboundedReceiver<TransportEvent>), SessionError> {
        info!("Connecting to live endpoint for model {}", model);

        let (socket, _) = connect_async(self.url())
            .await
            .map_err(|e| SessionError::TransportSetup(e.to_string()))?;
        let (mut sink, stream) = socket.split();

        let setup = SetupMessage {
            setup: Setup {
                model: model.to_string(),
                generation_config: GenerationConfig {
                    response_modalities: vec!["AUDIO".to_string()],
                    speech_config: SpeechConfig {
                        voice_config: VoiceConfig {
                            prebuilt_voice_config: PrebuiltVoiceConfig {
                                voice_name: config.voice.clone(),
                            },
                        },
                    },
                },
                system_instruction: Content {
                    parts: vec![TextPart {
                        text: config.system_instruction.clone(),
                    }],
                },
                input_audio_transcription: config.transcribe_input.then(|| EmptyObject {}),
                output_audio_transcription: config.transcribe_output.then(|| EmptyObject {}),
            },
        };

        let payload = serde_json::to_string(&setup)
            .map_err(|e| SessionError::TransportSetup(e.to_string()))?;
        sink.send(tungstenite::Message::Text(payload))
            .await
            .map_err(|e| SessionError::TransportSetup(format!("failed to send setup: {}", e)))?;

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        tokio::spawn(read_loop(stream, event_tx));

        info!("Live endpoint connected, awaiting setup acknowledgment");

        Ok((
            Box::new(WsHandle {
                sink: Mutex::new(sink),
            }),
            event_rx,
        ))
    }
}

struct WsHandle {
    sink: Mutex<WsSink>,
}

#[async_trait]
impl LiveHandle for WsHandle {
    async fn send_realtime(&self, chunk: MediaChunk) -> Result<(), SessionError> {
        let message = RealtimeInputMessage {
            realtime_input: RealtimeInput {
                media_chunks: vec![chunk],
            },
        };
        let payload = serde_json::to_string(&message)
            .map_err(|e| SessionError::TransportRuntime(e.to_string()))?;

        self.sink
            .lock()
            .await
            .send(tungstenite::Message::Text(payload))
            .await
            .map_err(|e| SessionError::TransportRuntime(format!("failed to send media: {}", e)))
    }

    async fn close(&self) -> Result<(), SessionError> {
        self.sink
            .lock()
            .await
            .close()
            .await
            .map_err(|e| SessionError::TransportRuntime(format!("failed to close socket: {}", e)))
    }
}

/// Map inbound socket frames to transport events until the socket ends.
async fn read_loop(mut stream: WsStream, events: mpsc::UnboundedSender<TransportEvent>) {
    while let Some(message) = stream.next().await {
        let message = match message {
            Ok(message) => message,
            Err(e) => {
                let _ = events.send(TransportEvent::Error(format!("socket error: {}", e)));
                return;
            }
        };

        let text = match message {
            tungstenite::Message::Text(text) => text,
            // The endpoint delivers JSON in binary frames as well.
            tungstenite::Message::Binary(bytes) => match String::from_utf8(bytes) {
                Ok(text) => text,
                Err(_) => {
                    warn!("Ignoring non-UTF-8 binary frame");
                    continue;
                }
            },
            tungstenite::Message::Close(_) => break,
            _ => continue,
        };

        match serde_json::from_str::<ServerMessage>(&text) {
            Ok(message) => {
                if message.setup_complete.is_some() {
                    let _ = events.send(TransportEvent::Open);
                } else {
                    let _ = events.send(TransportEvent::Message(message));
                }
            }
            Err(e) => {
                warn!("Failed to parse server message: {}", e);
            }
        }
    }

    let _ = events.send(TransportEvent::Closed);
}
