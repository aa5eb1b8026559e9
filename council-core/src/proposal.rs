use std::fmt;
use std::str::FromStr;

use crate::MemberId;
use crate::error::ParseProposalNumberError;

/// Proposal number `(counter, proposer)`, compared by counter first and by
/// proposer id to break ties.
///
/// Every proposer bumps its own counter and embeds its own id, so proposal
/// numbers are unique and totally ordered across the whole cluster. The
/// derived `Ord` matches that order because of the field order.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProposalNumber {
    pub counter: u64,
    pub proposer: MemberId,
}

impl ProposalNumber {
    #[must_use]
    pub fn new(counter: u64, proposer: MemberId) -> Self {
        Self { counter, proposer }
    }
}

impl fmt::Display for ProposalNumber {
    /// Text form `"<counter>.<id>"`, e.g. `7.M4`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.counter, self.proposer)
    }
}

impl FromStr for ProposalNumber {
    type Err = ParseProposalNumberError;

    /// Splits on the last `.`; everything before it must be the counter.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (counter, proposer) = s
            .rsplit_once('.')
            .ok_or(ParseProposalNumberError::MissingSeparator)?;
        let counter = counter
            .parse()
            .map_err(|_| ParseProposalNumberError::BadCounter)?;
        Ok(Self {
            counter,
            proposer: MemberId(proposer.to_owned()),
        })
    }
}
