// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use super::{at, create_test_item, create_test_participant, uv};
use crate::{
    Bid, DomainError, Item, ItemStatus, Participant, ParticipantId, SessionConfig,
    validate_bid, validate_session_inputs,
};

/// Config with interval and decrement checks disabled, for tests that
/// exercise a single rule in isolation.
fn bare_config() -> SessionConfig {
    SessionConfig {
        min_bid_interval_secs: 0,
        min_decrement_bps: 0,
        ..SessionConfig::default()
    }
}

fn open_item() -> Item {
    let mut item: Item = create_test_item();
    item.status = ItemStatus::Open;
    item
}

#[test]
fn test_session_inputs_reject_empty_items() {
    let participants: Vec<Participant> = vec![create_test_participant("f-1", 0)];

    let result = validate_session_inputs(&[], &participants);
    assert!(matches!(result, Err(DomainError::EmptyItems)));
}

#[test]
fn test_session_inputs_reject_empty_participants() {
    let items: Vec<Item> = vec![create_test_item()];

    let result = validate_session_inputs(&items, &[]);
    assert!(matches!(result, Err(DomainError::EmptyParticipants)));
}

#[test]
fn test_session_inputs_reject_duplicate_participant() {
    let items: Vec<Item> = vec![create_test_item()];
    let participants: Vec<Participant> = vec![
        create_test_participant("f-1", 0),
        create_test_participant("f-1", 1),
    ];

    let result = validate_session_inputs(&items, &participants);
    assert!(matches!(
        result,
        Err(DomainError::DuplicateParticipant { .. })
    ));
}

#[test]
fn test_session_inputs_reject_zero_quantity_item() {
    let mut item: Item = create_test_item();
    item.quantity = 0;
    let participants: Vec<Participant> = vec![create_test_participant("f-1", 0)];

    let result = validate_session_inputs(&[item], &participants);
    assert!(matches!(
        result,
        Err(DomainError::InvalidQuantity { item_number: 1 })
    ));
}

#[test]
fn test_first_bid_accepted_with_no_floor() {
    let item: Item = open_item();
    let supplier: ParticipantId = ParticipantId::new("f-1");

    let bid: Bid =
        validate_bid(&item, &bare_config(), &[], &supplier, 95_000, at(1_000)).unwrap();

    assert_eq!(bid.sequence, 1);
    assert_eq!(bid.unit_value, uv(95_000));
    assert_eq!(bid.total_value, 95_000 * 50);
}

#[test]
fn test_bid_rejected_on_pending_item() {
    let item: Item = create_test_item();
    let supplier: ParticipantId = ParticipantId::new("f-1");

    let result = validate_bid(&item, &bare_config(), &[], &supplier, 95_000, at(1_000));
    assert!(matches!(
        result,
        Err(DomainError::ClosedItem {
            item_number: 1,
            status: ItemStatus::Pending,
        })
    ));
}

#[test]
fn test_bid_rejected_on_closed_item() {
    let mut item: Item = create_test_item();
    item.status = ItemStatus::Closed;
    let supplier: ParticipantId = ParticipantId::new("f-1");

    let result = validate_bid(&item, &bare_config(), &[], &supplier, 95_000, at(1_000));
    assert!(matches!(result, Err(DomainError::ClosedItem { .. })));
}

#[test]
fn test_bid_accepted_during_random_window() {
    let mut item: Item = create_test_item();
    item.status = ItemStatus::RandomWindow;
    let supplier: ParticipantId = ParticipantId::new("f-1");

    let result = validate_bid(&item, &bare_config(), &[], &supplier, 95_000, at(1_000));
    assert!(result.is_ok());
}

#[test]
fn test_bid_rejects_non_positive_value() {
    let item: Item = open_item();
    let supplier: ParticipantId = ParticipantId::new("f-1");

    let result = validate_bid(&item, &bare_config(), &[], &supplier, 0, at(1_000));
    assert!(matches!(
        result,
        Err(DomainError::InvalidValue { centavos: 0 })
    ));

    let result = validate_bid(&item, &bare_config(), &[], &supplier, -500, at(1_000));
    assert!(matches!(result, Err(DomainError::InvalidValue { .. })));
}

#[test]
fn test_opening_bid_capped_by_reference_value() {
    // Reference is R$ 4500,00; an opening bid above it is rejected.
    let item: Item = open_item();
    let supplier: ParticipantId = ParticipantId::new("f-1");

    let result = validate_bid(&item, &bare_config(), &[], &supplier, 460_000, at(1_000));
    assert!(matches!(
        result,
        Err(DomainError::AboveReferenceCeiling { .. })
    ));

    let result = validate_bid(&item, &bare_config(), &[], &supplier, 450_000, at(1_000));
    assert!(result.is_ok());
}

#[test]
fn test_sealed_reference_skips_ceiling_check() {
    let mut item: Item = open_item();
    item.sealed_reference = true;
    let supplier: ParticipantId = ParticipantId::new("f-1");

    let result = validate_bid(&item, &bare_config(), &[], &supplier, 460_000, at(1_000));
    assert!(result.is_ok());
}

#[test]
fn test_bid_must_beat_own_previous_not_global_best() {
    // A bids 950, B bids 960: B's first bid stands even though it is
    // worse than the global best.
    let item: Item = open_item();
    let a: ParticipantId = ParticipantId::new("f-a");
    let b: ParticipantId = ParticipantId::new("f-b");

    let first: Bid = validate_bid(&item, &bare_config(), &[], &a, 95_000, at(1_000)).unwrap();
    let history: Vec<Bid> = vec![first];

    let result = validate_bid(&item, &bare_config(), &history, &b, 96_000, at(1_010));
    assert!(result.is_ok());
}

#[test]
fn test_equal_rebid_rejected_as_not_improved() {
    let item: Item = open_item();
    let supplier: ParticipantId = ParticipantId::new("f-1");

    let first: Bid =
        validate_bid(&item, &bare_config(), &[], &supplier, 95_000, at(1_000)).unwrap();
    let history: Vec<Bid> = vec![first];

    let result = validate_bid(&item, &bare_config(), &history, &supplier, 95_000, at(1_010));
    assert!(matches!(result, Err(DomainError::NotImproved { .. })));
}

#[test]
fn test_worse_rebid_rejected_as_not_improved() {
    // A bids 950, then 951: rejected, 951 is not lower than 950.
    let item: Item = open_item();
    let supplier: ParticipantId = ParticipantId::new("f-1");

    let first: Bid =
        validate_bid(&item, &bare_config(), &[], &supplier, 95_000, at(1_000)).unwrap();
    let history: Vec<Bid> = vec![first];

    let result = validate_bid(&item, &bare_config(), &history, &supplier, 95_100, at(1_010));
    assert!(matches!(
        result,
        Err(DomainError::NotImproved { attempted, own_best })
            if attempted == uv(95_100) && own_best == uv(95_000)
    ));
}

#[test]
fn test_minimum_decrement_enforced_on_self_improvement() {
    // Previous bid R$ 1000,00 with 1% minimum decrement: 999 is a 0.1%
    // improvement (rejected), 985 is 1.5% (accepted).
    let item: Item = open_item();
    let supplier: ParticipantId = ParticipantId::new("f-1");
    let config: SessionConfig = SessionConfig {
        min_bid_interval_secs: 0,
        min_decrement_bps: 100,
        ..SessionConfig::default()
    };

    let first: Bid = validate_bid(&item, &config, &[], &supplier, 100_000, at(1_000)).unwrap();
    let history: Vec<Bid> = vec![first];

    let result = validate_bid(&item, &config, &history, &supplier, 99_900, at(1_010));
    assert!(matches!(
        result,
        Err(DomainError::DecrementTooSmall {
            min_decrement_bps: 100,
            ..
        })
    ));

    let result = validate_bid(&item, &config, &history, &supplier, 98_500, at(1_010));
    assert!(result.is_ok());
}

#[test]
fn test_minimum_decrement_exempts_first_bid() {
    // The decrement rule measures improvement over the participant's
    // own previous bid; the first bid has none and is exempt.
    let item: Item = open_item();
    let supplier: ParticipantId = ParticipantId::new("f-1");
    let config: SessionConfig = SessionConfig {
        min_bid_interval_secs: 0,
        min_decrement_bps: 100,
        ..SessionConfig::default()
    };

    let result = validate_bid(&item, &config, &[], &supplier, 449_999, at(1_000));
    assert!(result.is_ok());
}

#[test]
fn test_exact_minimum_decrement_accepted() {
    // 1% of R$ 1000,00 is exactly R$ 10,00; a bid of 990 meets the bar.
    let item: Item = open_item();
    let supplier: ParticipantId = ParticipantId::new("f-1");
    let config: SessionConfig = SessionConfig {
        min_bid_interval_secs: 0,
        min_decrement_bps: 100,
        ..SessionConfig::default()
    };

    let first: Bid = validate_bid(&item, &config, &[], &supplier, 100_000, at(1_000)).unwrap();
    let history: Vec<Bid> = vec![first];

    let result = validate_bid(&item, &config, &history, &supplier, 99_000, at(1_010));
    assert!(result.is_ok());
}

#[test]
fn test_minimum_interval_rejects_rapid_rebid() {
    let item: Item = open_item();
    let supplier: ParticipantId = ParticipantId::new("f-1");
    let config: SessionConfig = SessionConfig {
        min_bid_interval_secs: 3,
        min_decrement_bps: 0,
        ..SessionConfig::default()
    };

    let first: Bid = validate_bid(&item, &config, &[], &supplier, 95_000, at(1_000)).unwrap();
    let history: Vec<Bid> = vec![first];

    let result = validate_bid(&item, &config, &history, &supplier, 94_000, at(1_001));
    assert!(matches!(
        result,
        Err(DomainError::BidIntervalTooShort {
            min_interval_secs: 3,
            elapsed_secs: 1,
        })
    ));

    let result = validate_bid(&item, &config, &history, &supplier, 94_000, at(1_003));
    assert!(result.is_ok());
}

#[test]
fn test_minimum_interval_does_not_block_rival_bid() {
    let item: Item = open_item();
    let a: ParticipantId = ParticipantId::new("f-a");
    let b: ParticipantId = ParticipantId::new("f-b");
    let config: SessionConfig = SessionConfig {
        min_bid_interval_secs: 3,
        min_decrement_bps: 0,
        ..SessionConfig::default()
    };

    let first: Bid = validate_bid(&item, &config, &[], &a, 95_000, at(1_000)).unwrap();
    let history: Vec<Bid> = vec![first];

    // B's first bid one second later is unaffected by A's interval.
    let result = validate_bid(&item, &config, &history, &b, 96_000, at(1_001));
    assert!(result.is_ok());
}

#[test]
fn test_canceled_bid_does_not_serve_as_floor() {
    let item: Item = open_item();
    let supplier: ParticipantId = ParticipantId::new("f-1");

    let mut first: Bid =
        validate_bid(&item, &bare_config(), &[], &supplier, 90_000, at(1_000)).unwrap();
    first.canceled = true;
    first.cancel_reason = Some(String::from("valor inexequível"));
    let history: Vec<Bid> = vec![first];

    // With the canceled bid out of the way this counts as a first bid:
    // 95_000 would not improve on 90_000, but is accepted here.
    let result = validate_bid(&item, &bare_config(), &history, &supplier, 95_000, at(1_010));
    assert!(result.is_ok());
}

#[test]
fn test_bid_sequence_follows_history_length() {
    let item: Item = open_item();
    let a: ParticipantId = ParticipantId::new("f-a");
    let b: ParticipantId = ParticipantId::new("f-b");

    let first: Bid = validate_bid(&item, &bare_config(), &[], &a, 95_000, at(1_000)).unwrap();
    assert_eq!(first.sequence, 1);

    let history: Vec<Bid> = vec![first];
    let second: Bid =
        validate_bid(&item, &bare_config(), &history, &b, 96_000, at(1_010)).unwrap();
    assert_eq!(second.sequence, 2);
}
