//! Proposer role: drives the two-phase protocol for rounds this node owns.

use std::collections::{BTreeMap, BTreeSet};

use council_core::{MemberId, Message, MessageKind, ProposalNumber};
use parking_lot::Mutex;
use tracing::{debug, info, trace};

/// Book-keeping for one proposal number minted by this node.
#[derive(Debug, Default)]
struct Round {
    /// The candidate this node first intended to propose.
    original_value: String,
    /// Acceptors that promised this round.
    promises: BTreeSet<MemberId>,
    /// Previously accepted pairs reported with those promises.
    prior_accepted: BTreeMap<MemberId, (ProposalNumber, String)>,
    /// Acceptors that voted ACCEPTED for this round.
    accepteds: BTreeSet<MemberId>,
    /// Fires exactly once, when the promise quorum is first reached.
    accept_phase_started: bool,
    /// Fires exactly once, when the accept quorum is first reached.
    decided: bool,
}

impl Round {
    /// The Paxos value rule: adopt the value of the highest previously
    /// accepted proposal reported by the promise quorum, else keep the
    /// original candidate. Evaluated on the snapshot taken when the quorum
    /// latch fires; later promises do not change the phase-2 value.
    fn phase_two_value(&self) -> String {
        self.prior_accepted
            .values()
            .max_by(|(a, _), (b, _)| a.cmp(b))
            .map_or_else(|| self.original_value.clone(), |(_, value)| value.clone())
    }
}

/// Runs phase 1 and phase 2 for proposals minted by this node.
///
/// Rounds are superseded rather than cancelled; the per-round latches make
/// duplicate and late responses harmless.
pub struct Proposer {
    self_id: MemberId,
    majority: usize,
    counter: Mutex<u64>,
    rounds: Mutex<BTreeMap<ProposalNumber, Round>>,
}

impl Proposer {
    #[must_use]
    pub fn new(self_id: MemberId, majority: usize) -> Self {
        Self {
            self_id,
            majority,
            counter: Mutex::new(0),
            rounds: Mutex::new(BTreeMap::new()),
        }
    }

    /// Mints the next proposal number. Counter bump and construction happen
    /// under one lock, so numbers from this node never repeat.
    fn next_proposal_number(&self) -> ProposalNumber {
        let mut counter = self.counter.lock();
        *counter += 1;
        ProposalNumber::new(*counter, self.self_id.clone())
    }

    /// Phase 1: opens a round for `candidate` and returns the PREPARE to
    /// broadcast. The caller has already validated the candidate.
    pub fn start_prepare(&self, candidate: &str) -> Message {
        let pn = self.next_proposal_number();
        self.rounds.lock().insert(
            pn.clone(),
            Round {
                original_value: candidate.to_owned(),
                ..Round::default()
            },
        );
        info!(proposal = %pn, candidate, "PREPARE broadcast");
        Message::new(MessageKind::Prepare, self.self_id.clone(), Some(pn), None)
    }

    /// Handles PROMISE(n). Returns the ACCEPT_REQUEST to broadcast when this
    /// promise completes the quorum, exactly once per round.
    pub fn on_promise(&self, promise: &Message) -> Option<Message> {
        let Some(pn) = promise.proposal.as_ref() else {
            debug!(from = %promise.from, "PROMISE without a proposal number, dropping");
            return None;
        };

        // A bad accepted-number extra poisons the whole message.
        let prior = match prior_accepted_of(promise) {
            Ok(prior) => prior,
            Err(()) => return None,
        };

        let mut rounds = self.rounds.lock();
        let Some(round) = rounds.get_mut(pn) else {
            trace!(proposal = %pn, from = %promise.from, "promise for a round this node does not own");
            return None;
        };

        round.promises.insert(promise.from.clone());
        if let Some(pair) = prior {
            round.prior_accepted.insert(promise.from.clone(), pair);
        }

        if round.promises.len() >= self.majority && !round.accept_phase_started {
            round.accept_phase_started = true;
            let value = round.phase_two_value();
            info!(proposal = %pn, %value, "ACCEPT_REQUEST broadcast");
            return Some(Message::new(
                MessageKind::AcceptRequest,
                self.self_id.clone(),
                Some(pn.clone()),
                Some(value),
            ));
        }
        None
    }

    /// Handles ACCEPTED(n, v). Returns the DECIDE to broadcast when this vote
    /// completes the quorum; at most one DECIDE is ever emitted per round.
    pub fn on_accepted(&self, accepted: &Message) -> Option<Message> {
        let Some(pn) = accepted.proposal.as_ref() else {
            debug!(from = %accepted.from, "ACCEPTED without a proposal number, dropping");
            return None;
        };

        let mut rounds = self.rounds.lock();
        let Some(round) = rounds.get_mut(pn) else {
            trace!(proposal = %pn, from = %accepted.from, "vote for a round this node does not own");
            return None;
        };

        round.accepteds.insert(accepted.from.clone());
        if round.accepteds.len() >= self.majority && !round.decided {
            round.decided = true;
            info!(proposal = %pn, value = ?accepted.value, "DECIDE broadcast");
            return Some(Message::new(
                MessageKind::Decide,
                self.self_id.clone(),
                Some(pn.clone()),
                accepted.value.clone(),
            ));
        }
        None
    }
}

/// Parses the accepted pair piggybacked on a promise, if any.
///
/// `Err(())` means the extras were present but unusable and the whole
/// message must be dropped.
fn prior_accepted_of(promise: &Message) -> Result<Option<(ProposalNumber, String)>, ()> {
    let (Some(acc_num), Some(acc_val)) = (
        promise.extra.get(Message::ACC_NUM),
        promise.extra.get(Message::ACC_VAL),
    ) else {
        return Ok(None);
    };
    match acc_num.parse::<ProposalNumber>() {
        Ok(n) => Ok(Some((n, acc_val.clone()))),
        Err(error) => {
            debug!(
                from = %promise.from, %error,
                "promise carried an unparsable accepted number, dropping"
            );
            Err(())
        }
    }
}
