// Transport abstraction: the session's only view of the remote endpoint.

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::messages::{MediaChunk, ServerMessage};
use crate::error::SessionError;

/// Connection parameters derived from the interview setup.
#[derive(Debug, Clone)]
pub struct LiveConnectConfig {
    /// Prebuilt synthesized voice name
    pub voice: String,
    /// Instruction handed to the remote model
    pub system_instruction: String,
    /// Request a transcript stream of the user's speech
    pub transcribe_input: bool,
    /// Request a transcript stream of the model's speech
    pub transcribe_output: bool,
}

/// Events surfaced by a connected transport.
#[derive(Debug)]
pub enum TransportEvent {
    /// The remote acknowledged the session setup
    Open,
    Message(ServerMessage),
    Error(String),
    /// The remote ended the session gracefully
    Closed,
}

/// An established bidirectional session.
#[async_trait]
pub trait LiveHandle: Send + Sync {
    /// Forward one media chunk. Failures are per-chunk; the transport never
    /// retries.
    async fn send_realtime(&self, chunk: MediaChunk) -> Result<(), SessionError>;

    /// Close the session from this side.
    async fn close(&self) -> Result<(), SessionError>;
}

/// Factory for live sessions.
#[async_trait]
pub trait LiveTransport: Send + Sync {
    /// Establish a session for `model`.
    ///
    /// Returns the outbound handle and a channel receiver for inbound
    /// events; `TransportEvent::Open` arrives once the remote acknowledges
    /// the setup.
    async fn connect(
        &self,
        model: &str,
        config: LiveConnectConfig,
    ) -> Result<(Box<dyn LiveHandle>, mpsc::UnboundedReceiver<TransportEvent>), SessionError>;
}
