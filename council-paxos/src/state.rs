//! Pure acceptor state - no I/O, no locking.
//!
//! Keeping the transitions free of synchronization lets the same logic be
//! exercised directly by tests; the [`crate::Acceptor`] role wraps one
//! instance in a mutex whose critical section spans exactly one transition.

use council_core::ProposalNumber;

/// Decision predicates for the two acceptor transitions.
pub mod decision {
    use council_core::ProposalNumber;

    /// PREPARE(n) is promised when nothing was promised yet or `n >= promised`.
    ///
    /// `>=` rather than `>`: a duplicate PREPARE for the same n (a retry)
    /// must be re-promised, which is safe because the promise never moves
    /// backwards.
    #[must_use]
    pub fn should_promise(n: &ProposalNumber, promised: Option<&ProposalNumber>) -> bool {
        promised.is_none_or(|p| n >= p)
    }

    /// ACCEPT_REQUEST(n, v) is accepted under the same bound.
    ///
    /// Equality with the current promise is the normal phase-2 case: the
    /// only way to reach it is a PREPARE already promised for the same n.
    #[must_use]
    pub fn should_accept(n: &ProposalNumber, promised: Option<&ProposalNumber>) -> bool {
        promised.is_none_or(|p| n >= p)
    }
}

/// Result of a phase-1 transition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PrepareOutcome {
    /// Promised; carries a snapshot of the accepted pair taken in the same
    /// transition, for the PROMISE reply.
    Promised {
        accepted: Option<(ProposalNumber, String)>,
    },
    /// A higher proposal was already promised. The protocol stays silent.
    Rejected,
}

/// Per-node acceptor record: highest promise and last accepted pair.
///
/// The accepted number and value live in one field, so one is set exactly
/// when the other is. The promise is monotonic: both transitions only move
/// it under [`decision`], never backwards, and accepting raises it to the
/// accepted number, keeping `promised >= accepted`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AcceptorState {
    promised: Option<ProposalNumber>,
    accepted: Option<(ProposalNumber, String)>,
}

impl AcceptorState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn promised(&self) -> Option<&ProposalNumber> {
        self.promised.as_ref()
    }

    #[must_use]
    pub fn accepted(&self) -> Option<&(ProposalNumber, String)> {
        self.accepted.as_ref()
    }

    /// Phase 1: promise `n` or reject.
    pub fn prepare(&mut self, n: &ProposalNumber) -> PrepareOutcome {
        if decision::should_promise(n, self.promised.as_ref()) {
            self.promised = Some(n.clone());
            PrepareOutcome::Promised {
                accepted: self.accepted.clone(),
            }
        } else {
            PrepareOutcome::Rejected
        }
    }

    /// Phase 2: accept `(n, value)` or reject. Returns whether it accepted.
    pub fn accept(&mut self, n: &ProposalNumber, value: &str) -> bool {
        if decision::should_accept(n, self.promised.as_ref()) {
            self.promised = Some(n.clone());
            self.accepted = Some((n.clone(), value.to_owned()));
            true
        } else {
            false
        }
    }
}
