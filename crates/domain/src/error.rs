// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use crate::types::{ItemStatus, UnitValue};

/// Errors that can occur during domain validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A session requires at least one item.
    EmptyItems,
    /// A session requires at least one admitted participant.
    EmptyParticipants,
    /// Session configuration is invalid.
    InvalidConfig {
        /// Description of the invalid configuration.
        reason: String,
    },
    /// A status string could not be parsed.
    InvalidStatus(String),
    /// A dispute mode string could not be parsed.
    InvalidDisputeMode(String),
    /// A monetary value must be strictly positive.
    InvalidValue {
        /// The offending amount in centavos.
        centavos: i64,
    },
    /// An item quantity must be strictly positive.
    InvalidQuantity {
        /// The item sequence number.
        item_number: u32,
    },
    /// The item is not accepting bids.
    ClosedItem {
        /// The item sequence number.
        item_number: u32,
        /// The item's current status.
        status: ItemStatus,
    },
    /// The bid does not improve on the participant's own previous best.
    NotImproved {
        /// The attempted unit value.
        attempted: UnitValue,
        /// The participant's current best unit value on the item.
        own_best: UnitValue,
    },
    /// The improvement over the participant's own previous bid is below
    /// the configured minimum decrement.
    DecrementTooSmall {
        /// The attempted unit value.
        attempted: UnitValue,
        /// The participant's previous best unit value.
        previous: UnitValue,
        /// The configured minimum decrement in basis points.
        min_decrement_bps: u32,
    },
    /// An opening bid exceeds the published reference value.
    AboveReferenceCeiling {
        /// The attempted unit value.
        attempted: UnitValue,
        /// The item's reference unit value.
        reference: UnitValue,
    },
    /// The participant bid again before the minimum self-interval.
    BidIntervalTooShort {
        /// The configured minimum interval in seconds.
        min_interval_secs: u32,
        /// Seconds elapsed since the participant's previous bid.
        elapsed_secs: i64,
    },
    /// The submitter is not in the session's participant list.
    UnknownParticipant {
        /// The unknown participant identifier.
        participant_id: String,
    },
    /// The item does not belong to the session.
    UnknownItem {
        /// The unknown item identifier.
        item_id: String,
    },
    /// Two proposals mapped to the same participant.
    DuplicateParticipant {
        /// The duplicated participant identifier.
        participant_id: String,
    },
    /// A referenced bid does not exist in the item history.
    BidNotFound {
        /// The bid sequence number.
        sequence: u64,
    },
    /// A cancellation requires a justification.
    MissingJustification,
}

impl std::fmt::Display for DomainError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyItems => write!(f, "Session requires at least one item"),
            Self::EmptyParticipants => {
                write!(f, "Session requires at least one classified participant")
            }
            Self::InvalidConfig { reason } => write!(f, "Invalid session configuration: {reason}"),
            Self::InvalidStatus(s) => write!(f, "Invalid status: {s}"),
            Self::InvalidDisputeMode(s) => write!(f, "Invalid dispute mode: {s}"),
            Self::InvalidValue { centavos } => {
                write!(f, "Value must be greater than zero, got {centavos} centavos")
            }
            Self::InvalidQuantity { item_number } => {
                write!(f, "Item {item_number} quantity must be greater than zero")
            }
            Self::ClosedItem {
                item_number,
                status,
            } => {
                write!(f, "Item {item_number} is not accepting bids ({status})")
            }
            Self::NotImproved { attempted, own_best } => {
                write!(
                    f,
                    "Bid of {attempted} must be lower than your previous bid of {own_best}"
                )
            }
            Self::DecrementTooSmall {
                attempted,
                previous,
                min_decrement_bps,
            } => {
                write!(
                    f,
                    "Bid of {attempted} improves on {previous} by less than the minimum decrement of {}.{:02}%",
                    min_decrement_bps / 100,
                    min_decrement_bps % 100
                )
            }
            Self::AboveReferenceCeiling {
                attempted,
                reference,
            } => {
                write!(
                    f,
                    "Opening bid of {attempted} exceeds the reference value of {reference}"
                )
            }
            Self::BidIntervalTooShort {
                min_interval_secs,
                elapsed_secs,
            } => {
                write!(
                    f,
                    "Bids must be at least {min_interval_secs}s apart; only {elapsed_secs}s elapsed since your previous bid"
                )
            }
            Self::UnknownParticipant { participant_id } => {
                write!(f, "Participant '{participant_id}' is not admitted to this session")
            }
            Self::UnknownItem { item_id } => {
                write!(f, "Item '{item_id}' does not belong to this session")
            }
            Self::DuplicateParticipant { participant_id } => {
                write!(f, "Participant '{participant_id}' appears more than once")
            }
            Self::BidNotFound { sequence } => {
                write!(f, "Bid #{sequence} not found in the item history")
            }
            Self::MissingJustification => {
                write!(f, "A justification is required to cancel a bid")
            }
        }
    }
}

impl std::error::Error for DomainError {}
