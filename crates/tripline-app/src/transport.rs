//! WebSocket transport.
//!
//! Events travel as CBOR in binary frames. Opening spawns one task that
//! performs the handshake and then splits the socket into a reader and a
//! writer. Lifecycle events (`connect`, `connect_error`, `disconnect`) are
//! synthesized here and delivered through the same channel as server events.
//!
//! Every event is stamped with the generation of the `open` that produced it.
//! [`WsEvents`] yields only events of the live generation, so a socket that is
//! still shutting down after `close` cannot disturb the next connection.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use futures_util::{SinkExt, StreamExt};
use tokio::{runtime::Handle, sync::mpsc};
use tokio_tungstenite::{
    connect_async,
    tungstenite::{
        Message,
        client::IntoClientRequest,
        http::{HeaderValue, header::AUTHORIZATION},
    },
};
use tripline_core::{Transport, TransportError};
use tripline_proto::{InboundEvent, OutboundEvent};

use crate::channel::EventSource;

type Stamped = (u64, InboundEvent);

/// Realtime transport over a WebSocket.
#[derive(Debug)]
pub struct WsTransport {
    events: mpsc::UnboundedSender<Stamped>,
    live: Arc<AtomicU64>,
    outgoing: Option<mpsc::UnboundedSender<Vec<u8>>>,
}

/// Inbound events of the live connection.
///
/// Events from a closed connection are discarded when read.
#[derive(Debug)]
pub struct WsEvents {
    rx: mpsc::UnboundedReceiver<Stamped>,
    live: Arc<AtomicU64>,
}

/// Sending half handed to one connection task.
#[derive(Debug, Clone)]
struct EventSink {
    generation: u64,
    tx: mpsc::UnboundedSender<Stamped>,
}

impl EventSink {
    fn send(&self, event: InboundEvent) {
        // The receiver is gone only when the session is; nothing left to tell.
        let _ = self.tx.send((self.generation, event));
    }
}

impl WsTransport {
    /// Transport plus the stream its inbound events arrive on.
    pub fn new() -> (Self, WsEvents) {
        let (events, rx) = mpsc::unbounded_channel();
        let live = Arc::new(AtomicU64::new(0));
        (Self { events, live: Arc::clone(&live), outgoing: None }, WsEvents { rx, live })
    }

    /// Retire the current generation and start a new one.
    fn begin(&mut self) -> EventSink {
        let generation = self.live.fetch_add(1, Ordering::SeqCst) + 1;
        EventSink { generation, tx: self.events.clone() }
    }
}

impl WsEvents {
    /// Next event of the live connection, or `None` once the transport is gone.
    pub async fn recv(&mut self) -> Option<InboundEvent> {
        loop {
            let (generation, event) = self.rx.recv().await?;
            if generation == self.live.load(Ordering::SeqCst) {
                return Some(event);
            }
            tracing::trace!(generation, event = %event.name(), "dropping event of closed connection");
        }
    }
}

impl EventSource for WsEvents {
    async fn recv(&mut self) -> Option<InboundEvent> {
        WsEvents::recv(self).await
    }
}

impl Transport for WsTransport {
    fn open(&mut self, endpoint: &str, credential: &str) -> Result<(), TransportError> {
        let runtime = Handle::try_current().map_err(|e| TransportError::Connection(e.to_string()))?;
        let mut request = endpoint
            .into_client_request()
            .map_err(|e| TransportError::Connection(e.to_string()))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {credential}"))
            .map_err(|e| TransportError::Connection(e.to_string()))?;
        request.headers_mut().insert(AUTHORIZATION, bearer);

        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Vec<u8>>();
        self.outgoing = Some(out_tx);
        let events = self.begin();

        runtime.spawn(async move {
            let stream = match connect_async(request).await {
                Ok((stream, _response)) => stream,
                Err(e) => {
                    events.send(InboundEvent::connect_error(e.to_string()));
                    return;
                },
            };
            events.send(InboundEvent::Connect);

            let (mut writer, mut reader) = stream.split();
            let reason = loop {
                tokio::select! {
                    outgoing = out_rx.recv() => match outgoing {
                        Some(bytes) => {
                            if let Err(e) = writer.send(Message::Binary(bytes.into())).await {
                                break e.to_string();
                            }
                        },
                        None => {
                            let _ = writer.close().await;
                            break "io client disconnect".to_string();
                        },
                    },
                    incoming = reader.next() => match incoming {
                        Some(Ok(Message::Binary(bytes))) => match InboundEvent::decode(&bytes) {
                            Ok(event) => events.send(event),
                            Err(e) => tracing::warn!(error = %e, "undecodable event"),
                        },
                        Some(Ok(Message::Close(_))) | None => break "io server disconnect".to_string(),
                        Some(Ok(_)) => {},
                        Some(Err(e)) => break e.to_string(),
                    },
                }
            };
            tracing::debug!(%reason, generation = events.generation, "websocket closed");
            events.send(InboundEvent::disconnect(reason));
        });

        Ok(())
    }

    fn send(&mut self, event: &OutboundEvent) -> Result<(), TransportError> {
        let bytes = event.encode()?;
        let outgoing = self.outgoing.as_ref().ok_or(TransportError::Closed)?;
        outgoing.send(bytes).map_err(|_| TransportError::Closed)
    }

    fn close(&mut self) {
        self.outgoing = None;
        self.live.fetch_add(1, Ordering::SeqCst);
    }
}
