// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Bid and session-input validation.
//!
//! Validation is pure: it reads an immutable view of the item, the
//! configuration and the bid history, and either rejects the request or
//! returns the accepted [`Bid`] ready for commit. Nothing here mutates
//! state, so many submissions can be validated concurrently and only
//! the commit step needs to be serialized.
//!
//! ## Rules
//!
//! - Bids are only accepted while the item is `Open` or `RandomWindow`.
//! - A bid must be strictly lower than the participant's own previous
//!   best on the item. It does NOT need to beat the global best.
//! - The first bid has no own floor. When the item publishes a
//!   reference value and the reference is not sealed, the first bid
//!   must not exceed it.
//! - The minimum-decrement rule applies to self-improvement only; the
//!   first bid on an item is exempt.
//! - A participant may not bid again within the configured minimum
//!   interval of its own previous accepted bid.

use crate::error::DomainError;
use crate::types::{Bid, Item, Participant, ParticipantId, SessionConfig, UnitValue};
use time::OffsetDateTime;

/// Validates the inputs a session is created from.
///
/// # Errors
///
/// Returns an error if:
/// - the item list or participant list is empty
/// - an item has zero quantity
/// - a participant id appears more than once
pub fn validate_session_inputs(
    items: &[Item],
    participants: &[Participant],
) -> Result<(), DomainError> {
    if items.is_empty() {
        return Err(DomainError::EmptyItems);
    }
    if participants.is_empty() {
        return Err(DomainError::EmptyParticipants);
    }

    for item in items {
        if item.quantity == 0 {
            return Err(DomainError::InvalidQuantity {
                item_number: item.number,
            });
        }
    }

    for (i, participant) in participants.iter().enumerate() {
        if participants[..i].iter().any(|p| p.id == participant.id) {
            return Err(DomainError::DuplicateParticipant {
                participant_id: participant.id.value().to_string(),
            });
        }
    }

    Ok(())
}

/// Validates a bid submission against the item's current history.
///
/// On success returns the accepted [`Bid`], ready for the serialized
/// commit step. This function never mutates anything.
///
/// # Arguments
///
/// * `item` - The item the bid targets
/// * `config` - The session configuration in force
/// * `history` - The item's full append-only bid history
/// * `participant_id` - The submitting participant
/// * `unit_centavos` - The offered unit value in centavos
/// * `now` - The submission instant
///
/// # Errors
///
/// Returns an error if:
/// - the item is not accepting bids (`ClosedItem`)
/// - the value is not strictly positive (`InvalidValue`)
/// - the participant rebids within the minimum interval
///   (`BidIntervalTooShort`)
/// - an opening bid exceeds an unsealed reference value
///   (`AboveReferenceCeiling`)
/// - the bid does not strictly improve the participant's own best
///   (`NotImproved`)
/// - the improvement is below the minimum decrement
///   (`DecrementTooSmall`)
pub fn validate_bid(
    item: &Item,
    config: &SessionConfig,
    history: &[Bid],
    participant_id: &ParticipantId,
    unit_centavos: i64,
    now: OffsetDateTime,
) -> Result<Bid, DomainError> {
    if !item.status.accepts_bids() {
        return Err(DomainError::ClosedItem {
            item_number: item.number,
            status: item.status,
        });
    }

    let unit_value: UnitValue = UnitValue::from_centavos(unit_centavos)?;

    let own_bids: Vec<&Bid> = history
        .iter()
        .filter(|b| b.is_active() && &b.participant_id == participant_id)
        .collect();

    if config.min_bid_interval_secs > 0
        && let Some(last) = own_bids.iter().map(|b| b.submitted_at_unix).max()
    {
        let elapsed_secs: i64 = now.unix_timestamp() - last;
        if elapsed_secs < i64::from(config.min_bid_interval_secs) {
            return Err(DomainError::BidIntervalTooShort {
                min_interval_secs: config.min_bid_interval_secs,
                elapsed_secs,
            });
        }
    }

    match own_bids.iter().map(|b| b.unit_value).min() {
        None => {
            // First bid: no own floor, but the published reference value
            // caps the opening bid unless the budget is sealed.
            if !item.sealed_reference
                && let Some(reference) = item.reference_value
                && unit_value > reference
            {
                return Err(DomainError::AboveReferenceCeiling {
                    attempted: unit_value,
                    reference,
                });
            }
        }
        Some(own_best) => {
            if unit_value >= own_best {
                return Err(DomainError::NotImproved {
                    attempted: unit_value,
                    own_best,
                });
            }
            if config.min_decrement_bps > 0 {
                let improvement: i128 =
                    i128::from(own_best.centavos() - unit_value.centavos()) * 10_000;
                let required: i128 =
                    i128::from(own_best.centavos()) * i128::from(config.min_decrement_bps);
                if improvement < required {
                    return Err(DomainError::DecrementTooSmall {
                        attempted: unit_value,
                        previous: own_best,
                        min_decrement_bps: config.min_decrement_bps,
                    });
                }
            }
        }
    }

    let sequence: u64 = history.len() as u64 + 1;
    Ok(Bid::new(
        sequence,
        item.id.clone(),
        participant_id.clone(),
        unit_value,
        item.quantity,
        now,
    ))
}
