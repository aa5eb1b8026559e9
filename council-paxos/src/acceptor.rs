//! Acceptor role: phase-1 and phase-2 vote handling.

use council_core::{MemberId, Message, MessageKind};
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::state::{AcceptorState, PrepareOutcome};

/// Votes on proposals against this node's promise/accept record.
///
/// Both handlers lock the state for exactly the read-then-write region and
/// return the reply for the caller to send after the lock is released.
/// Rejections are silent: the protocol sends no NACK.
pub struct Acceptor {
    self_id: MemberId,
    state: Mutex<AcceptorState>,
}

impl Acceptor {
    #[must_use]
    pub fn new(self_id: MemberId) -> Self {
        Self {
            self_id,
            state: Mutex::new(AcceptorState::new()),
        }
    }

    /// Handles PREPARE(n). Returns the PROMISE for the sender, carrying the
    /// previously accepted pair in the extras when one exists.
    pub fn on_prepare(&self, prepare: &Message) -> Option<Message> {
        let Some(n) = prepare.proposal.as_ref() else {
            debug!(from = %prepare.from, "PREPARE without a proposal number, dropping");
            return None;
        };

        let outcome = self.state.lock().prepare(n);
        match outcome {
            PrepareOutcome::Promised { accepted } => {
                trace!(proposal = %n, from = %prepare.from, "promised");
                let mut promise = Message::new(
                    MessageKind::Promise,
                    self.self_id.clone(),
                    Some(n.clone()),
                    None,
                );
                if let Some((acc_num, acc_val)) = accepted {
                    promise = promise
                        .with_extra(Message::ACC_NUM, acc_num.to_string())
                        .with_extra(Message::ACC_VAL, acc_val);
                }
                Some(promise)
            }
            PrepareOutcome::Rejected => {
                trace!(proposal = %n, from = %prepare.from, "prepare below current promise, ignoring");
                None
            }
        }
    }

    /// Handles ACCEPT_REQUEST(n, v). Returns the ACCEPTED vote for the sender.
    pub fn on_accept_request(&self, request: &Message) -> Option<Message> {
        let (Some(n), Some(value)) = (request.proposal.as_ref(), request.value.as_deref()) else {
            debug!(from = %request.from, "ACCEPT_REQUEST without proposal or value, dropping");
            return None;
        };

        if self.state.lock().accept(n, value) {
            trace!(proposal = %n, value, from = %request.from, "accepted");
            Some(Message::new(
                MessageKind::Accepted,
                self.self_id.clone(),
                Some(n.clone()),
                Some(value.to_owned()),
            ))
        } else {
            trace!(proposal = %n, from = %request.from, "accept below current promise, ignoring");
            None
        }
    }

    /// Snapshot of the promise/accept record, for inspection in tests.
    #[must_use]
    pub fn snapshot(&self) -> AcceptorState {
        self.state.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use council_core::ProposalNumber;

    use super::*;

    fn pn(counter: u64, proposer: &str) -> ProposalNumber {
        ProposalNumber::new(counter, MemberId::from(proposer))
    }

    fn acceptor() -> Acceptor {
        Acceptor::new(MemberId::from("M2"))
    }

    fn prepare(counter: u64, proposer: &str) -> Message {
        Message::new(
            MessageKind::Prepare,
            MemberId::from(proposer),
            Some(pn(counter, proposer)),
            None,
        )
    }

    fn accept_request(counter: u64, proposer: &str, value: &str) -> Message {
        Message::new(
            MessageKind::AcceptRequest,
            MemberId::from(proposer),
            Some(pn(counter, proposer)),
            Some(value.to_owned()),
        )
    }

    #[test]
    fn fresh_prepare_gets_a_bare_promise() {
        let acceptor = acceptor();
        let promise = acceptor.on_prepare(&prepare(1, "M4")).expect("promised");
        assert_eq!(promise.kind, MessageKind::Promise);
        assert_eq!(promise.from, MemberId::from("M2"));
        assert_eq!(promise.proposal, Some(pn(1, "M4")));
        assert!(promise.extra.is_empty());
    }

    #[test]
    fn promise_carries_previously_accepted_pair() {
        let acceptor = acceptor();
        acceptor.on_prepare(&prepare(1, "M4"));
        acceptor.on_accept_request(&accept_request(1, "M4", "M5"));

        let promise = acceptor.on_prepare(&prepare(2, "M8")).expect("promised");
        assert_eq!(promise.extra.get(Message::ACC_NUM).map(String::as_str), Some("1.M4"));
        assert_eq!(promise.extra.get(Message::ACC_VAL).map(String::as_str), Some("M5"));
    }

    #[test]
    fn stale_prepare_is_silently_ignored() {
        let acceptor = acceptor();
        acceptor.on_prepare(&prepare(5, "M8"));
        assert_eq!(acceptor.on_prepare(&prepare(4, "M1")), None);
    }

    #[test]
    fn duplicate_prepare_is_answered_again() {
        let acceptor = acceptor();
        assert!(acceptor.on_prepare(&prepare(5, "M8")).is_some());
        assert!(acceptor.on_prepare(&prepare(5, "M8")).is_some());
    }

    #[test]
    fn accept_at_promise_level_votes() {
        let acceptor = acceptor();
        acceptor.on_prepare(&prepare(3, "M4"));
        let vote = acceptor
            .on_accept_request(&accept_request(3, "M4", "M5"))
            .expect("accepted");
        assert_eq!(vote.kind, MessageKind::Accepted);
        assert_eq!(vote.proposal, Some(pn(3, "M4")));
        assert_eq!(vote.value.as_deref(), Some("M5"));
    }

    #[test]
    fn stale_accept_request_is_silently_ignored() {
        let acceptor = acceptor();
        acceptor.on_prepare(&prepare(5, "M8"));
        assert_eq!(
            acceptor.on_accept_request(&accept_request(3, "M4", "M5")),
            None
        );
        assert_eq!(acceptor.snapshot().accepted(), None);
    }

    #[test]
    fn malformed_role_messages_are_dropped() {
        let acceptor = acceptor();
        assert_eq!(
            acceptor.on_prepare(&Message::simple(MessageKind::Prepare, MemberId::from("M4"))),
            None
        );
        let mut no_value = accept_request(1, "M4", "M5");
        no_value.value = None;
        assert_eq!(acceptor.on_accept_request(&no_value), None);
    }
}
