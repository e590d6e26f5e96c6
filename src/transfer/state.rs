//! Transfer workflow states.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Workflow state of a transfer.
///
/// Terminal states: Completed, Rejected, Cancelled. Cancelled is reserved:
/// no transition in the workflow reaches it, but stored records may carry it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferState {
    Requested,
    Approved,
    InTransit,
    Completed,
    Rejected,
    Cancelled,
}

impl TransferState {
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransferState::Completed | TransferState::Rejected | TransferState::Cancelled
        )
    }

    /// Approve and reject share the same source state.
    #[inline]
    pub fn can_review(&self) -> bool {
        matches!(self, TransferState::Requested)
    }

    #[inline]
    pub fn can_confirm_departure(&self) -> bool {
        matches!(self, TransferState::Approved)
    }

    #[inline]
    pub fn can_confirm_receipt(&self) -> bool {
        matches!(self, TransferState::InTransit)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransferState::Requested => "requested",
            TransferState::Approved => "approved",
            TransferState::InTransit => "in_transit",
            TransferState::Completed => "completed",
            TransferState::Rejected => "rejected",
            TransferState::Cancelled => "cancelled",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "requested" => Some(TransferState::Requested),
            "approved" => Some(TransferState::Approved),
            "in_transit" => Some(TransferState::InTransit),
            "completed" => Some(TransferState::Completed),
            "rejected" => Some(TransferState::Rejected),
            "cancelled" => Some(TransferState::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for TransferState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [TransferState; 6] = [
        TransferState::Requested,
        TransferState::Approved,
        TransferState::InTransit,
        TransferState::Completed,
        TransferState::Rejected,
        TransferState::Cancelled,
    ];

    #[test]
    fn test_terminal_states() {
        assert!(TransferState::Completed.is_terminal());
        assert!(TransferState::Rejected.is_terminal());
        assert!(TransferState::Cancelled.is_terminal());

        assert!(!TransferState::Requested.is_terminal());
        assert!(!TransferState::Approved.is_terminal());
        assert!(!TransferState::InTransit.is_terminal());
    }

    #[test]
    fn test_each_action_has_exactly_one_source_state() {
        assert_eq!(ALL.iter().filter(|s| s.can_review()).count(), 1);
        assert_eq!(ALL.iter().filter(|s| s.can_confirm_departure()).count(), 1);
        assert_eq!(ALL.iter().filter(|s| s.can_confirm_receipt()).count(), 1);
    }

    #[test]
    fn test_str_roundtrip() {
        for state in ALL {
            assert_eq!(TransferState::from_str(state.as_str()), Some(state));
        }
        assert_eq!(TransferState::from_str("pending"), None);
    }
}
