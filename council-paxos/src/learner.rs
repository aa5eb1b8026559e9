//! Learner role: detects a chosen value and latches it exactly once.

use std::collections::{BTreeMap, BTreeSet};

use council_core::{MemberId, Message, ProposalNumber};
use parking_lot::Mutex;
use tracing::{debug, info, trace};

#[derive(Debug, Default)]
struct Tally {
    decided: Option<String>,
    /// proposal -> value -> voters, deduplicated by acceptor id.
    votes: BTreeMap<ProposalNumber, BTreeMap<String, BTreeSet<MemberId>>>,
}

/// Counts ACCEPTED votes per `(proposal, value)` pair and latches the first
/// decision, whether it arrives as a quorum of votes or as a DECIDE.
///
/// The latch and the tally share one mutex, so two workers crossing the
/// threshold at once still produce a single decision.
pub struct Learner {
    majority: usize,
    tally: Mutex<Tally>,
}

impl Learner {
    #[must_use]
    pub fn new(majority: usize) -> Self {
        Self {
            majority,
            tally: Mutex::new(Tally::default()),
        }
    }

    /// Records one ACCEPTED vote. Returns the value when this vote completes
    /// the first quorum observed by this node.
    pub fn on_accepted(&self, accepted: &Message) -> Option<String> {
        let (Some(pn), Some(value)) = (accepted.proposal.as_ref(), accepted.value.as_ref()) else {
            debug!(from = %accepted.from, "ACCEPTED without proposal or value, dropping");
            return None;
        };

        let mut tally = self.tally.lock();
        let voters = tally
            .votes
            .entry(pn.clone())
            .or_default()
            .entry(value.clone())
            .or_default();
        voters.insert(accepted.from.clone());
        let quorum = voters.len() >= self.majority;

        if quorum && tally.decided.is_none() {
            tally.decided = Some(value.clone());
            info!(proposal = %pn, %value, "consensus learned from accepted votes");
            return Some(value.clone());
        }
        trace!(proposal = %pn, %value, from = %accepted.from, "vote recorded");
        None
    }

    /// Handles a DECIDE broadcast; idempotent after the first decision.
    pub fn on_decide(&self, decide: &Message) -> Option<String> {
        let Some(value) = decide.value.as_ref() else {
            debug!(from = %decide.from, "DECIDE without a value, dropping");
            return None;
        };

        let mut tally = self.tally.lock();
        if tally.decided.is_some() {
            trace!(from = %decide.from, "already decided, ignoring DECIDE");
            return None;
        }
        tally.decided = Some(value.clone());
        info!(%value, from = %decide.from, "consensus learned from decision broadcast");
        Some(value.clone())
    }

    /// The decided value, once one exists.
    #[must_use]
    pub fn decision(&self) -> Option<String> {
        self.tally.lock().decided.clone()
    }
}

#[cfg(test)]
mod tests {
    use council_core::MessageKind;

    use super::*;

    fn pn(counter: u64, proposer: &str) -> ProposalNumber {
        ProposalNumber::new(counter, MemberId::from(proposer))
    }

    fn accepted(counter: u64, proposer: &str, from: &str, value: &str) -> Message {
        Message::new(
            MessageKind::Accepted,
            MemberId::from(from),
            Some(pn(counter, proposer)),
            Some(value.to_owned()),
        )
    }

    fn decide(from: &str, value: &str) -> Message {
        Message::new(
            MessageKind::Decide,
            MemberId::from(from),
            Some(pn(1, from)),
            Some(value.to_owned()),
        )
    }

    #[test]
    fn quorum_of_identical_votes_decides() {
        let learner = Learner::new(3);
        assert_eq!(learner.on_accepted(&accepted(1, "M4", "M1", "M5")), None);
        assert_eq!(learner.on_accepted(&accepted(1, "M4", "M2", "M5")), None);
        assert_eq!(
            learner.on_accepted(&accepted(1, "M4", "M3", "M5")),
            Some("M5".to_owned())
        );
        assert_eq!(learner.decision().as_deref(), Some("M5"));
    }

    #[test]
    fn votes_deduplicate_by_sender() {
        let learner = Learner::new(3);
        for _ in 0..5 {
            assert_eq!(learner.on_accepted(&accepted(1, "M4", "M1", "M5")), None);
        }
        assert_eq!(learner.decision(), None);
    }

    #[test]
    fn votes_for_different_pairs_tally_separately() {
        let learner = Learner::new(3);
        learner.on_accepted(&accepted(1, "M4", "M1", "M5"));
        learner.on_accepted(&accepted(2, "M8", "M2", "M5"));
        learner.on_accepted(&accepted(1, "M4", "M3", "M8"));
        assert_eq!(learner.decision(), None);
    }

    #[test]
    fn announces_at_most_once() {
        let learner = Learner::new(2);
        learner.on_accepted(&accepted(1, "M4", "M1", "M5"));
        assert!(learner.on_accepted(&accepted(1, "M4", "M2", "M5")).is_some());
        assert_eq!(learner.on_accepted(&accepted(1, "M4", "M3", "M5")), None);
        assert_eq!(learner.on_decide(&decide("M4", "M5")), None);
    }

    #[test]
    fn decide_short_circuits_the_tally() {
        let learner = Learner::new(3);
        assert_eq!(learner.on_decide(&decide("M4", "M5")), Some("M5".to_owned()));
        assert_eq!(learner.decision().as_deref(), Some("M5"));
        assert_eq!(learner.on_decide(&decide("M8", "M5")), None);
    }
}
