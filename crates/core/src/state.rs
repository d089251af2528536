// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use pregao_audit::{EventKind, EventLog, SessionEvent};
use pregao_domain::{
    Bid, ChatMessage, DomainError, Item, ItemId, ItemStatus, Participant, SessionConfig,
    SessionId, SessionStatus, validate_session_inputs,
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Timer state for the current item.
///
/// Deadlines are authoritative server-side instants; clients only ever
/// see a derived remaining-seconds value. The random-window deadline is
/// never disclosed at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TimerState {
    /// No timer armed (not started, or session over).
    #[default]
    Idle,
    /// Inactivity countdown running for the current item.
    Inactivity {
        /// Instant the countdown lapses (unix seconds, UTC).
        deadline_unix: i64,
    },
    /// Random closing window running; the deadline was drawn uniformly
    /// within the configured window and is not disclosed.
    RandomWindow {
        /// Instant the item closes (unix seconds, UTC).
        deadline_unix: i64,
    },
    /// Session paused: remaining time frozen, to be restored on resume.
    Frozen {
        /// Seconds that remained on the active countdown at pause.
        remaining_secs: i64,
        /// Whether the frozen countdown was a random window.
        in_random_window: bool,
    },
}

/// The complete authoritative state of one dispute session.
///
/// All mutations go through [`crate::apply`]; reads take immutable
/// snapshots (a `Session` clone). Sessions are fully independent of one
/// another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Session identifier.
    pub id: SessionId,
    /// The bidding process this session disputes.
    pub bidding_id: String,
    /// Name of the pregoeiro conducting the session.
    pub auctioneer_name: String,
    /// Configuration in force for the dispute.
    pub config: SessionConfig,
    /// Lifecycle status.
    pub status: SessionStatus,
    /// Admitted participants, in proposal order (label order).
    pub participants: Vec<Participant>,
    /// Items in dispute order.
    pub items: Vec<Item>,
    /// Index into `items` of the current item while running.
    pub current_item_index: Option<usize>,
    /// Append-only bid history per item, indexed like `items`.
    pub bids: Vec<Vec<Bid>>,
    /// Session chat log, append-only.
    pub chat: Vec<ChatMessage>,
    /// Session event log (the minutes of the dispute).
    pub events: EventLog,
    /// Monotonic revision, incremented by every accepted mutation.
    /// Used by the broadcaster to coalesce redundant pushes.
    pub revision: u64,
    /// Timer state for the current item.
    pub timer: TimerState,
    /// Reason recorded at suspension or abort, if any.
    pub hold_reason: Option<String>,
}

impl Session {
    /// Creates a session in `NotStarted` from prepared inputs.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, the item or
    /// participant list is empty, an item has zero quantity, or a
    /// participant appears twice.
    pub fn create(
        id: SessionId,
        bidding_id: String,
        auctioneer_name: String,
        config: SessionConfig,
        participants: Vec<Participant>,
        items: Vec<Item>,
        now: OffsetDateTime,
    ) -> Result<Self, DomainError> {
        config.validate()?;
        validate_session_inputs(&items, &participants)?;

        let mut events: EventLog = EventLog::new();
        events.record(
            now.unix_timestamp(),
            EventKind::SessionCreated,
            format!("Sessão criada para a licitação {bidding_id}"),
            None,
            None,
            true,
        );

        let bids: Vec<Vec<Bid>> = items.iter().map(|_| Vec::new()).collect();

        Ok(Self {
            id,
            bidding_id,
            auctioneer_name,
            config,
            status: SessionStatus::NotStarted,
            participants,
            items,
            current_item_index: None,
            bids,
            chat: Vec::new(),
            events,
            revision: 0,
            timer: TimerState::Idle,
            hold_reason: None,
        })
    }

    /// Returns the current item while one is in dispute.
    #[must_use]
    pub fn current_item(&self) -> Option<&Item> {
        self.current_item_index.and_then(|i| self.items.get(i))
    }

    /// Returns the index of an item within the session.
    #[must_use]
    pub fn item_index(&self, item_id: &ItemId) -> Option<usize> {
        self.items.iter().position(|i| &i.id == item_id)
    }

    /// Returns the bid history of an item by index.
    #[must_use]
    pub fn bids_for(&self, index: usize) -> &[Bid] {
        self.bids.get(index).map_or(&[], Vec::as_slice)
    }

    /// Looks up a participant by id.
    #[must_use]
    pub fn participant(&self, id: &pregao_domain::ParticipantId) -> Option<&Participant> {
        self.participants.iter().find(|p| &p.id == id)
    }

    /// Returns the next armed deadline, for the runtime scheduler.
    ///
    /// `None` while idle or paused.
    #[must_use]
    pub const fn next_deadline_unix(&self) -> Option<i64> {
        match self.timer {
            TimerState::Inactivity { deadline_unix } | TimerState::RandomWindow { deadline_unix } => {
                Some(deadline_unix)
            }
            TimerState::Idle | TimerState::Frozen { .. } => None,
        }
    }

    /// The remaining-seconds value disclosed to participants.
    ///
    /// While the random window runs this is always zero: broadcasting
    /// the drawn remaining time would reveal the closing instant.
    #[must_use]
    pub fn disclosed_remaining_secs(&self, now: OffsetDateTime) -> i64 {
        match self.timer {
            TimerState::Inactivity { deadline_unix } => {
                (deadline_unix - now.unix_timestamp()).max(0)
            }
            TimerState::Frozen {
                remaining_secs,
                in_random_window,
            } => {
                if in_random_window {
                    0
                } else {
                    remaining_secs.max(0)
                }
            }
            TimerState::RandomWindow { .. } | TimerState::Idle => 0,
        }
    }

    /// Returns whether the current item is in its random closing window
    /// (including frozen-while-paused).
    #[must_use]
    pub const fn in_random_window(&self) -> bool {
        matches!(
            self.timer,
            TimerState::RandomWindow { .. }
                | TimerState::Frozen {
                    in_random_window: true,
                    ..
                }
        )
    }

    /// Returns whether all items have closed.
    #[must_use]
    pub fn all_items_closed(&self) -> bool {
        self.items.iter().all(|i| i.status == ItemStatus::Closed)
    }
}

/// The result of a successful state transition.
///
/// Transitions are atomic: they either succeed completely or fail
/// without side effects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionResult {
    /// The new session state after the transition.
    pub new_session: Session,
    /// The audit events recorded by this transition, in order.
    pub events: Vec<SessionEvent>,
    /// The bid accepted by this transition, if it was a submission.
    pub accepted_bid: Option<Bid>,
    /// Chat messages appended by this transition (user or system).
    pub chat_messages: Vec<ChatMessage>,
}
