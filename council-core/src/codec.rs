//! Line codec: semicolon-separated `key=value` pairs.
//!
//! Reserved keys are `type`, `from`, `p` and `value`; extension fields are
//! written with an `x_` prefix which is stripped again on decode. One encoded
//! message fits on one line, which is what the transport frames by.

use std::collections::BTreeMap;

use crate::error::MalformedMessage;
use crate::{MemberId, Message, MessageKind};

const KEY_TYPE: &str = "type";
const KEY_FROM: &str = "from";
const KEY_PROPOSAL: &str = "p";
const KEY_VALUE: &str = "value";
const EXTRA_PREFIX: &str = "x_";

/// Encodes a message into a single line.
///
/// The `extra` map iterates in key order, so encoding is deterministic, but
/// nothing may rely on a particular pair order on the wire.
#[must_use]
pub fn encode(message: &Message) -> String {
    let mut pairs = vec![
        format!("{KEY_TYPE}={}", message.kind.wire_name()),
        format!("{KEY_FROM}={}", message.from),
    ];
    if let Some(proposal) = &message.proposal {
        pairs.push(format!("{KEY_PROPOSAL}={proposal}"));
    }
    if let Some(value) = &message.value {
        pairs.push(format!("{KEY_VALUE}={value}"));
    }
    for (key, value) in &message.extra {
        pairs.push(format!("{EXTRA_PREFIX}{key}={value}"));
    }
    pairs.join(";")
}

/// Decodes one line back into a [`Message`].
///
/// Segments without a `=` and keys outside the reserved/extension set are
/// ignored, so the format is forward compatible with new fields.
///
/// # Errors
///
/// Fails when `type` is missing or unknown, `from` is missing, or a present
/// `p=` field does not parse.
pub fn decode(line: &str) -> Result<Message, MalformedMessage> {
    let mut fields = BTreeMap::new();
    for segment in line.split(';') {
        if let Some((key, value)) = segment.split_once('=') {
            if !key.is_empty() {
                fields.insert(key, value);
            }
        }
    }

    let kind = match fields.get(KEY_TYPE) {
        None => return Err(MalformedMessage::MissingType),
        Some(name) => MessageKind::from_wire(name)
            .ok_or_else(|| MalformedMessage::UnknownType((*name).to_owned()))?,
    };
    let from = fields.get(KEY_FROM).ok_or(MalformedMessage::MissingFrom)?;
    let proposal = fields
        .get(KEY_PROPOSAL)
        .map(|p| p.parse())
        .transpose()
        .map_err(MalformedMessage::BadProposal)?;
    let value = fields.get(KEY_VALUE).map(|v| (*v).to_owned());
    let extra = fields
        .iter()
        .filter_map(|(key, value)| {
            key.strip_prefix(EXTRA_PREFIX)
                .map(|key| (key.to_owned(), (*value).to_owned()))
        })
        .collect();

    Ok(Message {
        kind,
        from: MemberId((*from).to_owned()),
        proposal,
        value,
        extra,
    })
}
