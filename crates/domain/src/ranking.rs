// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Standing computation for an item's bid history.
//!
//! Standings are a pure function of the history: one entry per
//! participant with at least one active bid, ordered by best unit value
//! ascending. Ties break on the earlier submission timestamp of the
//! tying bid (first to reach the value is favored), then on bid
//! sequence as a deterministic last resort.
//!
//! Recomputed after every committed bid; O(n log n) is fine for the
//! expected participant counts (tens, not thousands).

use crate::types::{Bid, Item, ParticipantId, UnitValue};

/// Tolerance for the ME/EPP fictional-tie check (LC 123/2006): the
/// runner-up is entitled to preference when within 5% of the leader.
pub const FICTIONAL_TIE_TOLERANCE_BPS: u32 = 500;

/// One participant's position in an item's standings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Standing {
    /// The participant.
    pub participant_id: ParticipantId,
    /// The participant's best unit value on the item.
    pub best_unit_value: UnitValue,
    /// The corresponding total value (unit × item quantity).
    pub best_total_value: i64,
    /// Submission timestamp of the best bid (unix seconds).
    pub best_bid_at_unix: i64,
    /// Sequence number of the best bid within the history.
    pub best_bid_sequence: u64,
    /// 1-based rank; rank 1 holds the melhor lance.
    pub rank: usize,
}

/// Computes the standings for an item from its bid history.
///
/// Canceled bids are ignored. Re-running on an unchanged history yields
/// an identical result.
#[must_use]
pub fn rank_for(item: &Item, history: &[Bid]) -> Vec<Standing> {
    let mut best: Vec<Standing> = Vec::new();

    for bid in history.iter().filter(|b| b.is_active()) {
        match best
            .iter_mut()
            .find(|s| s.participant_id == bid.participant_id)
        {
            Some(standing) => {
                if bid.unit_value < standing.best_unit_value {
                    standing.best_unit_value = bid.unit_value;
                    standing.best_total_value = bid.unit_value.total_for(item.quantity);
                    standing.best_bid_at_unix = bid.submitted_at_unix;
                    standing.best_bid_sequence = bid.sequence;
                }
            }
            None => {
                best.push(Standing {
                    participant_id: bid.participant_id.clone(),
                    best_unit_value: bid.unit_value,
                    best_total_value: bid.unit_value.total_for(item.quantity),
                    best_bid_at_unix: bid.submitted_at_unix,
                    best_bid_sequence: bid.sequence,
                    rank: 0,
                });
            }
        }
    }

    best.sort_by(|a, b| {
        a.best_unit_value
            .cmp(&b.best_unit_value)
            .then(a.best_bid_at_unix.cmp(&b.best_bid_at_unix))
            .then(a.best_bid_sequence.cmp(&b.best_bid_sequence))
    });

    for (index, standing) in best.iter_mut().enumerate() {
        standing.rank = index + 1;
    }

    best
}

/// Returns the leading standing (melhor lance), if any bid was placed.
#[must_use]
pub fn best_standing(standings: &[Standing]) -> Option<&Standing> {
    standings.first()
}

/// Detects a fictional tie (empate ficto) between the leader and the
/// runner-up: the runner-up's best value is within `tolerance_bps` of
/// the leader's.
///
/// The downstream ME/EPP preference workflow decides what to do with a
/// detected tie; this core only reports it.
#[must_use]
pub fn fictional_tie(standings: &[Standing], tolerance_bps: u32) -> bool {
    let (Some(first), Some(second)) = (standings.first(), standings.get(1)) else {
        return false;
    };

    let spread: i128 =
        i128::from(second.best_unit_value.centavos() - first.best_unit_value.centavos()) * 10_000;
    let allowed: i128 = i128::from(first.best_unit_value.centavos()) * i128::from(tolerance_bps);
    spread <= allowed
}
