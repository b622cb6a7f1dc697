//! WebSocket control-plane client.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use bytes::Bytes;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, trace, warn};

use super::ControlPlane;
use super::error::{ControlPlaneError, ControlResult};
use crate::core::constants::{CONNECT_TIMEOUT, CONTROL_EVENT_QUEUE, RELEASE_TIMEOUT};
use crate::core::{MessageCodec, UpMessage};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// What the controller says about itself in its first message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerIdentity {
    /// Device kind, when the codec exposes one.
    pub kind: Option<String>,
    /// Protocol major version the controller speaks.
    pub protocol_major_version: u32,
    /// Session id carried by the message, 0 if none yet.
    pub session_id: u64,
}

/// Byte-message pipe over a WebSocket connection.
///
/// A reader task owns the receiving half and keeps the connection serviced
/// (ping replies, close detection) whether or not anyone calls
/// [`recv`](ControlPlane::recv). In drain mode it discards application
/// payloads instead of queueing them; payloads arriving while the queue is
/// full are discarded too.
pub struct ControlPlaneClient {
    sink: SplitSink<WsStream, Message>,
    events: mpsc::Receiver<ControlResult<Bytes>>,
    drain: Arc<AtomicBool>,
    reader: Option<JoinHandle<()>>,
    closed: bool,
}

impl std::fmt::Debug for ControlPlaneClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlPlaneClient")
            .field("drain", &self.drain.load(Ordering::Relaxed))
            .field("closed", &self.closed)
            .finish()
    }
}

impl ControlPlaneClient {
    /// Connect to `url`, e.g. `ws://192.168.1.10:8439`.
    ///
    /// Gives up with [`ControlPlaneError::Timeout`] after `CONNECT_TIMEOUT`.
    pub async fn connect(url: &str) -> ControlResult<Self> {
        let (stream, _response) = timeout(CONNECT_TIMEOUT, connect_async(url))
            .await
            .map_err(|_| ControlPlaneError::Timeout)??;
        info!(%url, "control plane connected");

        match stream.get_ref() {
            MaybeTlsStream::Plain(tcp) => {
                if let Err(e) = tcp.set_nodelay(true) {
                    warn!(error = %e, "failed to set TCP_NODELAY");
                }
            }
            _ => warn!("TCP_NODELAY not set on a non-plain stream"),
        }

        Ok(Self::from_stream(stream))
    }

    /// Wrap an established WebSocket stream.
    ///
    /// Must be called inside a Tokio runtime; the reader task is spawned here.
    pub fn from_stream(stream: WsStream) -> Self {
        let (sink, stream) = stream.split();
        let (tx, events) = mpsc::channel(CONTROL_EVENT_QUEUE);
        let drain = Arc::new(AtomicBool::new(false));
        let reader = tokio::spawn(read_loop(stream, tx, Arc::clone(&drain)));

        Self {
            sink,
            events,
            drain,
            reader: Some(reader),
            closed: false,
        }
    }

    /// Read the next upstream message and report who the controller is.
    pub async fn identify<C: MessageCodec>(&mut self, codec: &C) -> ControlResult<PeerIdentity> {
        let payload = self.recv().await?;
        let message = codec.decode(&payload)?;
        Ok(PeerIdentity {
            kind: message.peer_kind().map(str::to_owned),
            protocol_major_version: message.protocol_major_version(),
            session_id: message.session_id(),
        })
    }

    /// Check if drain mode is on.
    pub fn is_draining(&self) -> bool {
        self.drain.load(Ordering::Relaxed)
    }
}

impl ControlPlane for ControlPlaneClient {
    async fn send(&mut self, payload: Vec<u8>) -> ControlResult<()> {
        if self.closed {
            return Err(ControlPlaneError::Closed);
        }
        trace!(len = payload.len(), "control payload out");
        self.sink.send(Message::Binary(Bytes::from(payload))).await?;
        Ok(())
    }

    async fn recv(&mut self) -> ControlResult<Bytes> {
        if self.closed {
            return Err(ControlPlaneError::Closed);
        }
        match self.events.recv().await {
            Some(event) => event,
            None => Err(ControlPlaneError::Closed),
        }
    }

    fn set_drain_mode(&mut self, drain: bool) {
        if self.drain.swap(drain, Ordering::Relaxed) != drain {
            debug!(drain, "control plane drain mode changed");
        }
    }

    async fn close(&mut self) -> ControlResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let sent = self.sink.close().await;
        if let Some(mut reader) = self.reader.take() {
            // The reader ends when the peer answers our close frame.
            if timeout(RELEASE_TIMEOUT, &mut reader).await.is_err() {
                debug!("control plane reader did not stop in time");
                reader.abort();
            }
        }
        info!("control plane closed");

        match sent.map_err(ControlPlaneError::from) {
            Ok(()) | Err(ControlPlaneError::Closed) => Ok(()),
            Err(e) => Err(e),
        }
    }
}

impl Drop for ControlPlaneClient {
    fn drop(&mut self) {
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
    }
}

async fn read_loop(
    mut stream: SplitStream<WsStream>,
    events: mpsc::Sender<ControlResult<Bytes>>,
    drain: Arc<AtomicBool>,
) {
    while let Some(next) = stream.next().await {
        let event = match next {
            Ok(Message::Binary(payload)) => {
                if drain.load(Ordering::Relaxed) {
                    trace!(len = payload.len(), "control payload drained");
                    continue;
                }
                Ok(payload)
            }
            Ok(Message::Close(frame)) => {
                info!(?frame, "control plane close received");
                break;
            }
            Ok(Message::Text(text)) => {
                warn!(len = text.len(), "ignoring text message on control plane");
                continue;
            }
            // Pings are answered by the protocol layer.
            Ok(_) => continue,
            Err(e) => Err(ControlPlaneError::from(e)),
        };

        let stop = event.is_err();
        // Keep polling the stream even when the consumer falls behind.
        match events.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => debug!("control event queue full, dropping payload"),
            Err(TrySendError::Closed(_)) => break,
        }
        if stop {
            break;
        }
    }
    debug!("control plane reader stopped");
}
