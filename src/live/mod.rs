pub mod messages;
pub mod transport;
pub mod ws;

pub use messages::{MediaChunk, ServerContent, ServerMessage};
pub use transport::{LiveConnectConfig, LiveHandle, LiveTransport, TransportEvent};
pub use ws::WsLiveTransport;
