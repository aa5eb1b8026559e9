//! TCP transport: one encoded line per short-lived connection.
//!
//! The server replies `OK` to every connection as a flow-control ack and
//! closes; nothing semantic is attached to the ack. Delivery is at-most-once
//! and unordered across sends, which is all the engine asks of a
//! [`Transport`].

use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch};
use tokio_util::codec::{Framed, LinesCodec, LinesCodecError};
use tracing::{debug, info, warn};

use council_core::{ClusterConfig, MemberId, Message, codec};
use council_paxos::{SendError, Transport};

/// Fatal failure to bring the transport up.
#[derive(Debug)]
pub enum TransportError {
    /// The node's own id is not in the directory.
    UnknownSelf(MemberId),
    /// The configured listening port could not be bound.
    Bind { port: u16, source: io::Error },
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::UnknownSelf(id) => write!(f, "self id {id} is not configured"),
            TransportError::Bind { port, source } => {
                write!(f, "cannot listen on port {port}: {source}")
            }
        }
    }
}

impl std::error::Error for TransportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TransportError::UnknownSelf(_) => None,
            TransportError::Bind { source, .. } => Some(source),
        }
    }
}

/// Per-node TCP endpoint plus outbound client side.
pub struct TcpTransport {
    self_id: MemberId,
    port: u16,
    config: Arc<ClusterConfig>,
    shutdown: watch::Sender<bool>,
}

impl TcpTransport {
    /// # Errors
    ///
    /// Fails when `self_id` does not appear in the configuration.
    pub fn new(self_id: MemberId, config: Arc<ClusterConfig>) -> Result<Self, TransportError> {
        let Some(addr) = config.get(&self_id) else {
            return Err(TransportError::UnknownSelf(self_id));
        };
        let port = addr.port;
        let (shutdown, _) = watch::channel(false);
        Ok(Self {
            self_id,
            port,
            config,
            shutdown,
        })
    }

    /// Binds the listening socket and spawns the accept loop.
    ///
    /// Returns the inbound message stream; every decoded message is delivered
    /// to it exactly once. Each accepted connection is served on its own task.
    ///
    /// # Errors
    ///
    /// Fails synchronously when the configured port cannot be bound.
    pub async fn start(&self) -> Result<mpsc::UnboundedReceiver<Message>, TransportError> {
        let listener = TcpListener::bind(("0.0.0.0", self.port))
            .await
            .map_err(|source| TransportError::Bind {
                port: self.port,
                source,
            })?;

        // startup line is part of the scraped process contract
        println!("[{}] listening on {}", self.self_id, self.port);
        info!(member = %self.self_id, port = self.port, "transport started");

        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let mut shutdown = self.shutdown.subscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    accepted = listener.accept() => match accepted {
                        Ok((stream, peer)) => {
                            tokio::spawn(serve_connection(stream, peer, inbound_tx.clone()));
                        }
                        Err(error) => warn!(%error, "accept failed"),
                    },
                    _ = shutdown.changed() => {
                        debug!("accept loop stopping");
                        break;
                    }
                }
            }
        });
        Ok(inbound_rx)
    }

    /// Stops accepting connections. Idempotent; in-flight connection tasks
    /// are left to finish on their own.
    pub fn close(&self) {
        let _ = self.shutdown.send(true);
    }
}

/// Reads one line, feeds the decoded message inbound, acks with `OK`.
///
/// Connections that close before sending a line are tolerated; malformed
/// lines are dropped but still acked.
async fn serve_connection(
    stream: TcpStream,
    peer: SocketAddr,
    inbound: mpsc::UnboundedSender<Message>,
) {
    let mut framed = Framed::new(stream, LinesCodec::new());
    let Some(line) = framed.next().await else {
        return;
    };
    let line = match line {
        Ok(line) => line,
        Err(error) => {
            debug!(%peer, %error, "failed to read request line");
            return;
        }
    };
    match codec::decode(&line) {
        Ok(message) => {
            let _ = inbound.send(message);
        }
        Err(error) => warn!(%peer, %error, "dropping malformed message"),
    }
    if let Err(error) = framed.send("OK").await {
        debug!(%peer, %error, "failed to ack");
    }
}

fn into_io(error: LinesCodecError) -> io::Error {
    match error {
        LinesCodecError::Io(error) => error,
        other => io::Error::new(io::ErrorKind::InvalidData, other),
    }
}

impl Transport for TcpTransport {
    async fn send(&self, to: &MemberId, message: &Message) -> Result<(), SendError> {
        let Some(peer) = self.config.get(to) else {
            return Err(SendError::UnknownPeer(to.clone()));
        };
        let unreachable = |source: io::Error| SendError::Unreachable {
            peer: to.clone(),
            source,
        };

        let stream = TcpStream::connect((peer.host.as_str(), peer.port))
            .await
            .map_err(unreachable)?;
        let mut framed = Framed::new(stream, LinesCodec::new());
        framed
            .send(codec::encode(message))
            .await
            .map_err(|error| unreachable(into_io(error)))?;

        // wait for the ack before closing; a clean close without one is fine
        match framed.next().await {
            Some(Err(error)) => Err(unreachable(into_io(error))),
            _ => Ok(()),
        }
    }

    async fn broadcast(&self, message: &Message) {
        for peer in self.config.members() {
            if peer.id == self.self_id {
                continue;
            }
            if let Err(error) = self.send(&peer.id, message).await {
                warn!(peer = %peer.id, %error, "could not reach peer");
            }
        }
    }
}
