//! Per-node wiring: composes the three roles and fans inbound messages out.

use std::fmt;
use std::sync::Arc;

use council_core::{ClusterConfig, MemberId, Message, MessageKind};
use error_stack::Report;

use crate::{Acceptor, Learner, Proposer};

/// One message the caller must send after a dispatch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outbound {
    /// Deliver to a single peer.
    To(MemberId, Message),
    /// Best-effort delivery to every peer except self.
    Broadcast(Message),
}

/// Result of one dispatch: sends to perform, and the decided value when this
/// very dispatch completed the node's first decision.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Step {
    pub outbound: Vec<Outbound>,
    pub decided: Option<String>,
}

/// A proposed candidate that is not a configured member.
#[derive(Debug)]
pub struct UnknownCandidate;

impl fmt::Display for UnknownCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("candidate is not a member of the council")
    }
}

impl std::error::Error for UnknownCandidate {}

/// One council member: acceptor, proposer and learner over a shared
/// configuration.
///
/// The roles hold no references to each other; [`Node::handle`] is a pure
/// fan-out over the message type. Unknown types never reach it, they die in
/// the codec.
pub struct Node {
    self_id: MemberId,
    config: Arc<ClusterConfig>,
    acceptor: Acceptor,
    proposer: Proposer,
    learner: Learner,
}

impl Node {
    #[must_use]
    pub fn new(self_id: MemberId, config: Arc<ClusterConfig>) -> Self {
        let majority = config.majority();
        Self {
            acceptor: Acceptor::new(self_id.clone()),
            proposer: Proposer::new(self_id.clone(), majority),
            learner: Learner::new(majority),
            self_id,
            config,
        }
    }

    #[must_use]
    pub fn self_id(&self) -> &MemberId {
        &self.self_id
    }

    #[must_use]
    pub fn config(&self) -> &ClusterConfig {
        &self.config
    }

    #[must_use]
    pub fn acceptor(&self) -> &Acceptor {
        &self.acceptor
    }

    #[must_use]
    pub fn learner(&self) -> &Learner {
        &self.learner
    }

    /// Starts phase 1 for `candidate`.
    ///
    /// # Errors
    ///
    /// Rejects candidates outside the configured member set without touching
    /// any state.
    pub fn propose(&self, candidate: &str) -> Result<Step, Report<UnknownCandidate>> {
        if !self.config.contains(&MemberId::from(candidate)) {
            return Err(Report::new(UnknownCandidate)
                .attach_printable(format!("'{candidate}' is not in the configured member set")));
        }
        Ok(Step {
            outbound: vec![Outbound::Broadcast(self.proposer.start_prepare(candidate))],
            decided: None,
        })
    }

    /// Routes one inbound message to its roles.
    ///
    /// All role locks are released before this returns; the caller performs
    /// the sends afterwards, so no lock is ever held across the network.
    #[must_use]
    pub fn handle(&self, message: &Message) -> Step {
        let mut step = Step::default();
        match message.kind {
            MessageKind::Prepare => {
                if let Some(promise) = self.acceptor.on_prepare(message) {
                    step.outbound.push(Outbound::To(message.from.clone(), promise));
                }
            }
            MessageKind::Promise => {
                if let Some(request) = self.proposer.on_promise(message) {
                    step.outbound.push(Outbound::Broadcast(request));
                }
            }
            MessageKind::AcceptRequest => {
                if let Some(vote) = self.acceptor.on_accept_request(message) {
                    step.outbound.push(Outbound::To(message.from.clone(), vote));
                }
            }
            MessageKind::Accepted => {
                // proposer first, then this node's own learner
                if let Some(decide) = self.proposer.on_accepted(message) {
                    step.outbound.push(Outbound::Broadcast(decide));
                }
                step.decided = self.learner.on_accepted(message);
            }
            MessageKind::Decide => {
                step.decided = self.learner.on_decide(message);
            }
        }
        step
    }
}
