//! Wire-level vocabulary shared by every council member process.
//!
//! This crate is deliberately free of I/O and protocol logic:
//!
//! - [`MemberId`] / [`ProposalNumber`]: the identifiers the protocol orders by
//! - [`Message`]: the envelope every role exchanges
//! - [`codec`]: the line-oriented textual encoding of [`Message`]
//! - [`ClusterConfig`]: the static member directory loaded at boot

#![warn(clippy::pedantic)]

pub mod codec;
mod config;
mod error;
mod member;
mod message;
mod proposal;

pub use config::{ClusterConfig, MemberAddr};
pub use error::{ConfigError, MalformedMessage, ParseMemberIdError, ParseProposalNumberError};
pub use member::MemberId;
pub use message::{Message, MessageKind};
pub use proposal::ProposalNumber;
