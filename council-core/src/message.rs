use std::collections::BTreeMap;

use crate::{MemberId, ProposalNumber};

/// Logical message types of single-decree Paxos.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// proposer -> acceptors: phase-1 request
    Prepare,
    /// acceptor -> proposer: phase-1 response, may carry the previously
    /// accepted `(n, v)` in the extras
    Promise,
    /// proposer -> acceptors: phase-2 request with the value to accept
    AcceptRequest,
    /// acceptor -> proposer (and observed by the proposer's learner):
    /// phase-2 response
    Accepted,
    /// decision announcement broadcast
    Decide,
}

impl MessageKind {
    /// Name used on the wire in the `type=` field.
    #[must_use]
    pub fn wire_name(self) -> &'static str {
        match self {
            Self::Prepare => "PREPARE",
            Self::Promise => "PROMISE",
            Self::AcceptRequest => "ACCEPT_REQUEST",
            Self::Accepted => "ACCEPTED",
            Self::Decide => "DECIDE",
        }
    }

    #[must_use]
    pub(crate) fn from_wire(name: &str) -> Option<Self> {
        match name {
            "PREPARE" => Some(Self::Prepare),
            "PROMISE" => Some(Self::Promise),
            "ACCEPT_REQUEST" => Some(Self::AcceptRequest),
            "ACCEPTED" => Some(Self::Accepted),
            "DECIDE" => Some(Self::Decide),
            _ => None,
        }
    }
}

/// Immutable envelope exchanged between roles.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    pub kind: MessageKind,
    pub from: MemberId,
    pub proposal: Option<ProposalNumber>,
    pub value: Option<String>,
    /// Extension fields; a PROMISE piggybacks the acceptor's previously
    /// accepted pair here under [`Message::ACC_NUM`] / [`Message::ACC_VAL`].
    pub extra: BTreeMap<String, String>,
}

impl Message {
    /// Extra key carrying a previously accepted proposal number.
    pub const ACC_NUM: &'static str = "accNum";
    /// Extra key carrying a previously accepted value.
    pub const ACC_VAL: &'static str = "accVal";

    #[must_use]
    pub fn new(
        kind: MessageKind,
        from: MemberId,
        proposal: Option<ProposalNumber>,
        value: Option<String>,
    ) -> Self {
        Self {
            kind,
            from,
            proposal,
            value,
            extra: BTreeMap::new(),
        }
    }

    /// Message without proposal, value or extras.
    #[must_use]
    pub fn simple(kind: MessageKind, from: MemberId) -> Self {
        Self::new(kind, from, None, None)
    }

    /// Adds one extension field.
    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}
