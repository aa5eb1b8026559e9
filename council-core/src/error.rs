//! Error kinds shared across the workspace.

use std::fmt;
use std::io;

/// The cluster configuration could not be loaded.
#[derive(Debug)]
pub enum ConfigError {
    /// The file could not be read at all.
    Io(io::Error),
    /// No well-formed member line survived parsing.
    Empty,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "cannot read configuration: {e}"),
            ConfigError::Empty => f.write_str("configuration contains no well-formed members"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Empty => None,
        }
    }
}

/// A member id token was empty.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParseMemberIdError;

impl fmt::Display for ParseMemberIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("member id must be a non-empty token")
    }
}

impl std::error::Error for ParseMemberIdError {}

/// A proposal number field did not parse.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParseProposalNumberError {
    /// The `.` separating counter from proposer id is absent.
    MissingSeparator,
    /// The counter is not a non-negative integer.
    BadCounter,
}

impl fmt::Display for ParseProposalNumberError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingSeparator => f.write_str("proposal number is missing the '.' separator"),
            Self::BadCounter => f.write_str("proposal number counter is not a non-negative integer"),
        }
    }
}

impl std::error::Error for ParseProposalNumberError {}

/// An inbound line could not be decoded into a [`crate::Message`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MalformedMessage {
    MissingType,
    UnknownType(String),
    MissingFrom,
    BadProposal(ParseProposalNumberError),
}

impl fmt::Display for MalformedMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingType => f.write_str("message has no type field"),
            Self::UnknownType(name) => write!(f, "unknown message type '{name}'"),
            Self::MissingFrom => f.write_str("message has no from field"),
            Self::BadProposal(e) => write!(f, "bad proposal number: {e}"),
        }
    }
}

impl std::error::Error for MalformedMessage {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::BadProposal(e) => Some(e),
            _ => None,
        }
    }
}
