use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::quote::QuoteStatus;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteOperation {
    Update,
    Remove,
    Send,
    Approve,
    Reject,
    Cancel,
    Convert,
}

impl QuoteOperation {
    pub const ALL: [QuoteOperation; 7] = [
        QuoteOperation::Update,
        QuoteOperation::Remove,
        QuoteOperation::Send,
        QuoteOperation::Approve,
        QuoteOperation::Reject,
        QuoteOperation::Cancel,
        QuoteOperation::Convert,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QuoteOperation::Update => "update",
            QuoteOperation::Remove => "remove",
            QuoteOperation::Send => "send",
            QuoteOperation::Approve => "approve",
            QuoteOperation::Reject => "reject",
            QuoteOperation::Cancel => "cancel",
            QuoteOperation::Convert => "convert",
        }
    }

    /// Audit event type recorded when the operation succeeds.
    pub fn event_type(&self) -> &'static str {
        match self {
            QuoteOperation::Update => "quote.updated",
            QuoteOperation::Remove => "quote.removed",
            QuoteOperation::Send => "quote.sent",
            QuoteOperation::Approve => "quote.approved",
            QuoteOperation::Reject => "quote.rejected",
            QuoteOperation::Cancel => "quote.cancelled",
            QuoteOperation::Convert => "quote.converted",
        }
    }
}

impl fmt::Display for QuoteOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransitionTarget {
    Status(QuoteStatus),
    Deleted,
}

impl TransitionTarget {
    pub fn status(&self) -> Option<QuoteStatus> {
        match self {
            TransitionTarget::Status(status) => Some(*status),
            TransitionTarget::Deleted => None,
        }
    }
}

impl fmt::Display for TransitionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransitionTarget::Status(status) => status.fmt(f),
            TransitionTarget::Deleted => f.write_str("DELETED"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub from: QuoteStatus,
    pub to: TransitionTarget,
    pub operation: QuoteOperation,
}
