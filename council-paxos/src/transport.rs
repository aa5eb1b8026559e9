//! Abstract best-effort message bus the engine runs over.

use std::fmt;
use std::io;

use council_core::{MemberId, Message};
use tracing::warn;

use crate::node::{Outbound, Step};

/// Failure to deliver one message to one peer.
#[derive(Debug)]
pub enum SendError {
    /// The destination id is not in the directory.
    UnknownPeer(MemberId),
    /// Connecting, writing or reading the ack failed.
    Unreachable { peer: MemberId, source: io::Error },
}

impl fmt::Display for SendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SendError::UnknownPeer(peer) => write!(f, "unknown peer {peer}"),
            SendError::Unreachable { peer, source } => {
                write!(f, "peer {peer} unreachable: {source}")
            }
        }
    }
}

impl std::error::Error for SendError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SendError::UnknownPeer(_) => None,
            SendError::Unreachable { source, .. } => Some(source),
        }
    }
}

/// Best-effort message bus.
///
/// The engine relies on exactly these guarantees: at-most-once delivery per
/// [`Transport::send`], no ordering between distinct sends, and no delivery
/// at all under peer crash. Losses and reordering are the protocol's problem,
/// which is the point of Paxos.
#[expect(async_fn_in_trait)]
pub trait Transport {
    /// Delivers one message to one peer.
    ///
    /// # Errors
    ///
    /// Fails when the peer is unknown or unreachable; the failure concerns
    /// that one delivery only.
    async fn send(&self, to: &MemberId, message: &Message) -> Result<(), SendError>;

    /// Best-effort delivery to every configured peer except self. Per-peer
    /// failures are logged and swallowed.
    async fn broadcast(&self, message: &Message);
}

/// Performs the sends of one dispatch [`Step`] and announces a decision.
///
/// The announcement line is a public contract: test harnesses grep for it
/// verbatim. The learner latch guarantees `step.decided` is populated at most
/// once per process, so the line prints at most once.
pub async fn drive<T: Transport>(transport: &T, step: Step) {
    if let Some(value) = &step.decided {
        println!("CONSENSUS: {value} has been elected Council President!");
    }
    for outbound in step.outbound {
        match outbound {
            Outbound::To(peer, message) => {
                if let Err(error) = transport.send(&peer, &message).await {
                    warn!(peer = %peer, %error, "could not deliver reply");
                }
            }
            Outbound::Broadcast(message) => transport.broadcast(&message).await,
        }
    }
}
