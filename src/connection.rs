#![expect(
    clippy::module_name_repetitions,
    reason = "Connection types expose their domain in the name for clarity"
)]

use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use futures::{SinkExt as _, StreamExt as _};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::time::sleep;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};
use url::Url;

use crate::Result;
use crate::config::{Config, Origin};
use crate::error::WsError;
use crate::events::{EventKind, HandlerRegistry, MessageHandler};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Outgoing channel for the currently live transport handle, or `None` while
/// disconnected. Installed after the greeting, cleared on every close.
type OutboundSlot = Arc<RwLock<Option<mpsc::UnboundedSender<String>>>>;

/// Courtesy payload sent once per successful open, before anything else.
const GREETING: &str = "Hello Server!";

/// Connection state tracking.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not connected
    Disconnected,
    /// Attempting to connect
    Connecting,
    /// Successfully connected
    Connected {
        /// When the connection was established
        since: Instant,
    },
    /// Waiting out the fixed delay before dialing again
    Reconnecting {
        /// Consecutive attempts since the last successful open
        attempt: u32,
    },
}

impl ConnectionState {
    /// Check if the connection is currently active.
    #[must_use]
    pub const fn is_connected(self) -> bool {
        matches!(self, Self::Connected { .. })
    }
}

/// A WebSocket connection that keeps itself alive.
///
/// Owns at most one live transport handle at a time. Construction starts the
/// first connection attempt; from then on the wrapper drives itself: every
/// closure schedules exactly one retry after the configured fixed delay,
/// unconditionally and forever. Incoming text frames are fanned out to the
/// handlers registered via [`Client::on`], and [`Client::send`] forwards
/// messages only while connected.
///
/// Clones share the same underlying connection. There is no teardown: the
/// wrapper is designed to live as long as its owning process.
///
/// # Example
///
/// ```ignore
/// let client = Client::new(config, &origin)?;
///
/// client.on(EventKind::Message, Arc::new(|payload: &str| {
///     println!("received: {payload}");
/// }));
///
/// client.send("hello");
/// ```
#[derive(Clone)]
pub struct Client {
    /// Resolved connection target
    endpoint: Url,
    /// Watch channel sender for state changes (enables reconnection detection)
    state_tx: watch::Sender<ConnectionState>,
    /// Watch channel receiver for state changes (for reading the current state)
    state_rx: watch::Receiver<ConnectionState>,
    /// Sender channel slot for the live transport handle
    outbound: OutboundSlot,
    /// Registered message handlers
    handlers: Arc<HandlerRegistry>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("endpoint", &self.endpoint)
            .field("state", &*self.state_rx.borrow())
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Create the wrapper and immediately begin connecting.
    ///
    /// The target is resolved once up front: an explicit `config.url` is used
    /// verbatim, otherwise the address is derived from `origin` and
    /// `config.path`. The connection loop runs in a background task and
    /// reconnects after every closure with the configured fixed delay.
    pub fn new(config: Config, origin: &Origin) -> Result<Self> {
        let endpoint = config.endpoint(origin)?;

        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        let outbound: OutboundSlot = Arc::new(RwLock::new(None));
        let handlers = Arc::new(HandlerRegistry::new());

        let loop_endpoint = endpoint.clone();
        let loop_outbound = Arc::clone(&outbound);
        let loop_handlers = Arc::clone(&handlers);
        let loop_state_tx = state_tx.clone();
        let delay = config.reconnect_delay;

        tokio::spawn(async move {
            Self::connection_loop(
                loop_endpoint,
                delay,
                loop_outbound,
                loop_handlers,
                loop_state_tx,
            )
            .await;
        });

        Ok(Self {
            endpoint,
            state_tx,
            state_rx,
            outbound,
            handlers,
        })
    }

    /// Main connection loop. Retries are unconditional and unbounded: a lost
    /// connection and a failed dial are both followed by the same fixed-delay
    /// wait and a fresh attempt.
    #[expect(
        clippy::infinite_loop,
        reason = "Reconnection is deliberately unbounded; the loop lives as long as the process"
    )]
    async fn connection_loop(
        endpoint: Url,
        delay: Duration,
        outbound: OutboundSlot,
        handlers: Arc<HandlerRegistry>,
        state_tx: watch::Sender<ConnectionState>,
    ) {
        let mut attempt = 0_u32;

        loop {
            _ = state_tx.send(ConnectionState::Connecting);

            match connect_async(endpoint.as_str()).await {
                Ok((ws_stream, _)) => {
                    attempt = 0;
                    if let Err(e) =
                        Self::handle_connection(ws_stream, &outbound, &handlers, &state_tx).await
                    {
                        #[cfg(feature = "tracing")]
                        tracing::warn!(endpoint = %endpoint, error = %e, "connection lost");
                        #[cfg(not(feature = "tracing"))]
                        let _ = &e;
                    }
                }
                Err(e) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(endpoint = %endpoint, error = %e, "unable to connect");
                    #[cfg(not(feature = "tracing"))]
                    let _ = &e;
                }
            }

            attempt = attempt.saturating_add(1);
            _ = state_tx.send(ConnectionState::Reconnecting { attempt });
            sleep(delay).await;
        }
    }

    /// Drive one live transport handle until it closes.
    ///
    /// The greeting goes out before the state flips to connected, so it
    /// precedes anything a caller can send over this handle.
    async fn handle_connection(
        ws_stream: WsStream,
        outbound: &OutboundSlot,
        handlers: &HandlerRegistry,
        state_tx: &watch::Sender<ConnectionState>,
    ) -> Result<()> {
        let (mut write, mut read) = ws_stream.split();

        write.send(Message::Text(GREETING.into())).await?;

        let (sender_tx, mut sender_rx) = mpsc::unbounded_channel();
        *outbound.write().unwrap_or_else(PoisonError::into_inner) = Some(sender_tx);
        _ = state_tx.send(ConnectionState::Connected {
            since: Instant::now(),
        });

        #[cfg(feature = "tracing")]
        tracing::debug!("connected");

        let result = loop {
            tokio::select! {
                // Handle incoming frames
                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => handlers.dispatch(text.as_str()),
                        Some(Ok(Message::Close(_))) | None => {
                            break Err(WsError::ConnectionClosed.into());
                        }
                        Some(Err(e)) => break Err(WsError::Connection(e).into()),
                        Some(Ok(_)) => {
                            // Ignore binary and control frames.
                        }
                    }
                }

                // Forward caller sends accepted while connected
                Some(text) = sender_rx.recv() => {
                    if let Err(e) = write.send(Message::Text(text.into())).await {
                        break Err(WsError::Connection(e).into());
                    }
                }
            }
        };

        // The handle is gone: sends drop again and `connected` reads false
        // from the moment of close until the next successful open.
        *outbound.write().unwrap_or_else(PoisonError::into_inner) = None;
        _ = state_tx.send(ConnectionState::Disconnected);

        result
    }

    /// Register `handler` under `kind`.
    ///
    /// Registration is idempotent: adding the same handler twice results in
    /// one invocation per inbound message, not two.
    pub fn on(&self, kind: EventKind, handler: MessageHandler) {
        match kind {
            EventKind::Message => self.handlers.add(handler),
        }
    }

    /// Remove `handler` from the registry it was added to. Handlers that were
    /// never registered are ignored.
    pub fn off(&self, kind: EventKind, handler: &MessageHandler) {
        match kind {
            EventKind::Message => self.handlers.remove(handler),
        }
    }

    /// Forward `message` verbatim to the live transport handle, or drop it
    /// silently while disconnected.
    ///
    /// No queueing and no delivery guarantee: a message accepted here can
    /// still be lost if the connection closes before it is written out.
    pub fn send<S: Into<String>>(&self, message: S) {
        let guard = self.outbound.read().unwrap_or_else(PoisonError::into_inner);
        let Some(sender) = guard.as_ref() else {
            #[cfg(feature = "tracing")]
            tracing::debug!("send while disconnected, dropping message");
            return;
        };

        // A failed send means the connection task is already tearing this
        // handle down; the message is dropped like any disconnected send.
        _ = sender.send(message.into());
    }

    /// Whether the current transport handle has completed its open handshake
    /// and has not yet closed.
    #[must_use]
    pub fn connected(&self) -> bool {
        self.state().is_connected()
    }

    /// Get the current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    /// Subscribe to connection state changes.
    ///
    /// Returns a receiver that notifies on every transition. Useful for
    /// detecting reconnections without polling.
    #[must_use]
    pub fn state_receiver(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    /// The resolved connection target.
    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}
