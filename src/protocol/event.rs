//! Event records
//!
//! One record per line from the event source:
//!
//! ```text
//! seq|B                 Broadcast
//! seq|S|from            StatusUpdate
//! seq|F|from|to         Follow
//! seq|U|from|to         Unfollow
//! seq|P|from|to         PrivateMessage
//! ```
//!
//! The field count picks Broadcast and StatusUpdate; the type letter only
//! matters for records with four or more fields, and fields past the fourth
//! are ignored. The raw line is kept untouched so recipients receive exactly
//! what the source sent.
//!
//! Only the sequence field has to be text. IDs are sliced out of the raw
//! line as bytes and never decoded.

use bytes::Bytes;

use super::constants::*;
use super::id::SubscriberId;
use crate::error::ParseError;

/// What an event asks the registry to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// Deliver to every connected subscriber
    Broadcast,
    /// Deliver to the followers of `actor`
    StatusUpdate { actor: SubscriberId },
    /// `actor` starts following `target`; `target` is notified
    Follow {
        actor: SubscriberId,
        target: SubscriberId,
    },
    /// `actor` stops following `target`; nobody is notified
    Unfollow {
        actor: SubscriberId,
        target: SubscriberId,
    },
    /// Deliver to `target` only
    PrivateMessage {
        actor: SubscriberId,
        target: SubscriberId,
    },
}

impl EventKind {
    /// Wire type letter for this kind
    pub fn type_letter(&self) -> &'static str {
        match self {
            EventKind::Broadcast => TYPE_BROADCAST,
            EventKind::StatusUpdate { .. } => TYPE_STATUS_UPDATE,
            EventKind::Follow { .. } => TYPE_FOLLOW,
            EventKind::Unfollow { .. } => TYPE_UNFOLLOW,
            EventKind::PrivateMessage { .. } => TYPE_PRIVATE_MESSAGE,
        }
    }
}

/// A parsed event with its original bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    /// Total-order key
    pub sequence: u64,
    /// Decoded kind, `None` when the field layout matches no known kind
    pub kind: Option<EventKind>,
    /// Original line including its terminator
    pub raw: Bytes,
}

impl EventRecord {
    /// Parse a record from one raw line
    ///
    /// Only an unreadable sequence field is an error. A record with a valid
    /// sequence but an unknown layout still parses, with `kind == None`, so
    /// that it can occupy its slot in the delivery order.
    pub fn parse(raw: Bytes) -> Result<Self, ParseError> {
        let fields: Vec<&[u8]> = trim_terminator(&raw)
            .split(|b| *b == FIELD_SEPARATOR)
            .collect();

        let sequence = std::str::from_utf8(fields[0])
            .ok()
            .and_then(|field| field.parse::<u64>().ok())
            .filter(|seq| *seq > 0)
            .ok_or_else(|| {
                ParseError::InvalidSequence(String::from_utf8_lossy(fields[0]).into_owned())
            })?;

        // IDs share the record's buffer
        let id = |field: &[u8]| SubscriberId::new(raw.slice_ref(field));

        let kind = match fields.as_slice() {
            [_, _] => Some(EventKind::Broadcast),
            [_, _, actor] => Some(EventKind::StatusUpdate { actor: id(*actor) }),
            [_, letter, actor, target, ..] => {
                let actor = id(*actor);
                let target = id(*target);
                match std::str::from_utf8(*letter) {
                    Ok(TYPE_FOLLOW) => Some(EventKind::Follow { actor, target }),
                    Ok(TYPE_UNFOLLOW) => Some(EventKind::Unfollow { actor, target }),
                    Ok(TYPE_PRIVATE_MESSAGE) => Some(EventKind::PrivateMessage { actor, target }),
                    _ => None,
                }
            }
            _ => None,
        };

        Ok(Self {
            sequence,
            kind,
            raw,
        })
    }

    /// Subscriber the event originates from, if any
    pub fn actor_id(&self) -> Option<&SubscriberId> {
        match &self.kind {
            Some(EventKind::StatusUpdate { actor })
            | Some(EventKind::Follow { actor, .. })
            | Some(EventKind::Unfollow { actor, .. })
            | Some(EventKind::PrivateMessage { actor, .. }) => Some(actor),
            _ => None,
        }
    }

    /// Subscriber the event is addressed to, if any
    pub fn target_id(&self) -> Option<&SubscriberId> {
        match &self.kind {
            Some(EventKind::Follow { target, .. })
            | Some(EventKind::Unfollow { target, .. })
            | Some(EventKind::PrivateMessage { target, .. }) => Some(target),
            _ => None,
        }
    }
}

/// Strip CR/LF from both ends of a line
pub(crate) fn trim_terminator(line: &[u8]) -> &[u8] {
    let is_terminator = |b: &u8| *b == b'\r' || *b == LINE_TERMINATOR;
    let start = line.iter().position(|b| !is_terminator(b)).unwrap_or(line.len());
    let end = line.iter().rposition(|b| !is_terminator(b)).map_or(start, |i| i + 1);
    &line[start..end]
}
