//! One client connection: a reader applying client messages and a writer
//! broadcasting the registry on its own interval.
//!
//! The connection is written against plain `Stream`/`Sink` halves so it can
//! run over a websocket or, in tests, over in-memory channels.

use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use arscene_runtime::{InstanceId, Registry};
use arscene_value::Value;
use futures::{Sink, SinkExt, Stream, StreamExt};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::broadcast;
use crate::codec::WireFormat;
use crate::error::{Result, ServerError};
use crate::protocol::{ClientMessage, InstantiateRequest, NO_TAG};

/// An inbound frame, reduced to what the server cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Binary(Vec<u8>),
    /// Text, ping, pong: ignored.
    Other,
    Close,
}

/// Settings shared by every connection.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    pub format: WireFormat,
    pub broadcast_interval: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            format: WireFormat::default(),
            broadcast_interval: Duration::from_millis(100),
        }
    }
}

pub struct Connection {
    registry: Arc<Registry>,
    config: ConnectionConfig,
    peer: String,
}

impl Connection {
    pub fn new(registry: Arc<Registry>, config: ConnectionConfig, peer: impl Into<String>) -> Self {
        Self {
            registry,
            config,
            peer: peer.into(),
        }
    }

    /// Serve the client until either direction stops.
    ///
    /// Whichever of the reader and the writer finishes first ends the
    /// connection; the other is dropped.
    pub async fn run<St, E, Si>(self, inbound: St, outbound: Si)
    where
        St: Stream<Item = std::result::Result<Frame, E>>,
        E: Display,
        Si: Sink<Vec<u8>>,
        Si::Error: Display,
    {
        info!(peer = %self.peer, "client connected");

        let outcome = tokio::select! {
            r = self.read_loop(inbound) => r,
            w = self.write_loop(outbound) => w,
        };
        match outcome {
            Ok(()) => info!(peer = %self.peer, "client disconnected"),
            Err(e) => warn!(peer = %self.peer, error = %e, "connection closed"),
        }
    }

    async fn read_loop<St, E>(&self, inbound: St) -> Result<()>
    where
        St: Stream<Item = std::result::Result<Frame, E>>,
        E: Display,
    {
        let mut inbound = std::pin::pin!(inbound);
        while let Some(frame) = inbound.next().await {
            match frame.map_err(ServerError::transport)? {
                Frame::Binary(bytes) => self.handle_frame(&bytes).await,
                Frame::Other => debug!(peer = %self.peer, "ignoring non-binary frame"),
                Frame::Close => return Ok(()),
            }
        }
        Ok(())
    }

    async fn write_loop<Si>(&self, outbound: Si) -> Result<()>
    where
        Si: Sink<Vec<u8>>,
        Si::Error: Display,
    {
        let mut outbound = std::pin::pin!(outbound);
        let mut ticker = tokio::time::interval(self.config.broadcast_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            let messages = broadcast::round(&self.registry, self.config.format)?;
            for message in &messages {
                let bytes = self.config.format.encode(message)?;
                outbound.send(bytes).await.map_err(ServerError::transport)?;
            }
        }
    }

    /// Apply one client frame. Bad frames and refused requests are logged;
    /// the connection stays open.
    async fn handle_frame(&self, bytes: &[u8]) {
        let message = match self.config.format.decode::<ClientMessage>(bytes) {
            Ok(message) => message,
            Err(e) => {
                warn!(peer = %self.peer, error = %e, "bad frame from client");
                return;
            }
        };

        match message {
            ClientMessage::Tap {
                instance,
                entity_id,
            } => {
                debug!(peer = %self.peer, instance, entity = %entity_id, "tap");
                if let Err(e) = self.registry.tap(instance, entity_id) {
                    warn!(peer = %self.peer, error = %e, "ignoring tap");
                }
            }
            ClientMessage::Hover {
                instance,
                entity_id,
            } => {
                debug!(peer = %self.peer, instance, entity = %entity_id, "hover");
            }
            ClientMessage::Instantiate(request) => {
                let registry = Arc::clone(&self.registry);
                let format = self.config.format;
                let program = request.program.clone();
                let joined =
                    tokio::task::spawn_blocking(move || instantiate(&registry, format, request))
                        .await;
                match joined {
                    Ok(Ok(id)) => {
                        info!(peer = %self.peer, instance = id, program = %program, "instantiated")
                    }
                    Ok(Err(e)) => {
                        warn!(
                            peer = %self.peer,
                            program = %program,
                            error = %e,
                            "instantiate failed"
                        )
                    }
                    Err(e) => warn!(peer = %self.peer, error = %e, "instantiate task panicked"),
                }
            }
        }
    }
}

/// Create the instance a client asked for and bind its tag.
///
/// Empty `data` runs the program's init hook. Otherwise `data` is the
/// encoded state table and init is skipped.
pub fn instantiate(
    registry: &Registry,
    format: WireFormat,
    request: InstantiateRequest,
) -> Result<InstanceId> {
    let id = if request.data.is_empty() {
        registry.instantiate(&request.program, true)?
    } else {
        let state: Value = format.decode(&request.data)?;
        registry.instantiate_with_state(&request.program, state)?
    };
    if request.tag != NO_TAG {
        registry.bind(request.tag, id)?;
    }
    Ok(id)
}
