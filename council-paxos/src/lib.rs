//! Single-decree Paxos engine for the council president election.
//!
//! Every node plays all three roles at once:
//!
//! - **Acceptor**: votes on proposals under the promise/accept rules
//! - **Proposer**: drives a two-phase attempt to get a candidate chosen
//! - **Learner**: detects a quorum of accepts and announces the decision
//!
//! The roles are pure with respect to I/O: handling a message returns the
//! messages to send as a [`Step`], and the caller performs the sends over an
//! abstract best-effort [`Transport`]. No lock is ever held across a network
//! call.
//!
//! # Quick start
//!
//! ```ignore
//! let node = Node::new(self_id, config);
//! let step = node.propose("M5")?;          // phase 1
//! drive(&transport, step).await;           // broadcast PREPARE
//! // ...for every inbound message:
//! drive(&transport, node.handle(&message)).await;
//! ```

#![warn(clippy::pedantic)]

mod acceptor;
mod learner;
mod node;
mod proposer;
pub mod state;
mod transport;

pub use acceptor::Acceptor;
pub use learner::Learner;
pub use node::{Node, Outbound, Step, UnknownCandidate};
pub use proposer::Proposer;
pub use transport::{SendError, Transport, drive};
