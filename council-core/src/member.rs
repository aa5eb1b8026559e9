use std::fmt;
use std::str::FromStr;

use crate::error::ParseMemberIdError;

/// Opaque member identifier drawn from the configured cluster (e.g. `M4`).
///
/// Doubles as the proposer id inside a [`crate::ProposalNumber`] and as the
/// candidate payload of a proposal.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MemberId(pub String);

impl MemberId {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MemberId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl FromStr for MemberId {
    type Err = ParseMemberIdError;

    /// Any non-empty token is a valid id; membership is checked against the
    /// configuration, not here.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ParseMemberIdError);
        }
        Ok(Self(s.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_any_non_empty_token() {
        let id: MemberId = "M4".parse().expect("well formed");
        assert_eq!(id, MemberId::from("M4"));
        assert_eq!(id.to_string(), "M4");
    }

    #[test]
    fn rejects_the_empty_token() {
        assert_eq!("".parse::<MemberId>(), Err(ParseMemberIdError));
    }
}
