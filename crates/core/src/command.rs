// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use pregao_domain::{ItemId, ParticipantId, SenderKind};

/// A command represents participant, auctioneer or timer intent as data
/// only.
///
/// Commands are the only way to request state changes, and every
/// command for a given session is applied by a single serialized owner
/// so near-simultaneous submissions commit in a strict, auditable
/// order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Open the public session and put the first item in dispute.
    Start,
    /// A supplier submits a bid on an item.
    SubmitBid {
        /// The item the bid targets.
        item_id: ItemId,
        /// The submitting participant.
        participant_id: ParticipantId,
        /// Offered unit value in centavos.
        unit_centavos: i64,
    },
    /// The auctioneer cancels a bid, with a mandatory justification.
    CancelBid {
        /// The item whose history holds the bid.
        item_id: ItemId,
        /// The bid's sequence number within that history.
        sequence: u64,
        /// Why the bid was canceled (e.g. valor inexequível).
        justification: String,
    },
    /// Append a chat message. Chat never affects auction state.
    SendChat {
        /// Who is sending.
        sender: SenderKind,
        /// The participant behind the message, when sent by a supplier.
        participant_id: Option<ParticipantId>,
        /// Message body.
        text: String,
    },
    /// The inactivity countdown for the current item lapsed.
    ///
    /// The closing delay is drawn by the runtime, uniformly within the
    /// configured random window, and carried here as data so the
    /// transition itself stays deterministic.
    InactivityElapsed {
        /// Drawn delay until the item closes, in seconds.
        closing_delay_secs: u32,
    },
    /// The drawn random-window instant arrived with no further bid.
    ClosingElapsed,
    /// The auctioneer closes the current item without waiting for the
    /// random window.
    CloseItem,
    /// The auctioneer suspends the session, freezing all timers.
    Pause {
        /// Why the session was suspended.
        reason: String,
    },
    /// Resume a suspended session, restoring the frozen countdown.
    Resume,
    /// Administrative cancellation. Terminal and irreversible.
    Abort {
        /// Why the session was canceled.
        reason: String,
    },
    /// A participant's live connection was established.
    ConnectParticipant {
        /// The participant that connected.
        participant_id: ParticipantId,
    },
    /// A participant's live connection dropped.
    DisconnectParticipant {
        /// The participant that disconnected.
        participant_id: ParticipantId,
    },
}
