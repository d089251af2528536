// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

#![deny(
    clippy::pedantic,
    clippy::cargo,
    clippy::nursery,
    clippy::style,
    clippy::correctness,
    clippy::all
)]

use pregao_domain::{ItemId, ParticipantId};
use serde::{Deserialize, Serialize};

/// The kind of fact recorded by a session event.
///
/// Events describe what happened in the session, in order. They are the
/// minutes ("ata") of the dispute and feed the habilitação and
/// adjudication workflows downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    /// Session created from the preparation workflow.
    SessionCreated,
    /// Public session opened by the auctioneer.
    SessionStarted,
    /// An item entered dispute.
    ItemOpened,
    /// A bid was accepted into the item history.
    BidAccepted,
    /// The auctioneer canceled a bid with a justification.
    BidCanceled,
    /// Inactivity elapsed; the random closing window began.
    RandomWindowEntered,
    /// A bid arrived during the random window and reopened the item.
    RandomWindowCanceled,
    /// The item dispute ended.
    ItemClosed,
    /// All items done; final standings frozen.
    SessionClosed,
    /// The auctioneer suspended the session.
    SessionPaused,
    /// The auctioneer resumed a suspended session.
    SessionResumed,
    /// Administrative cancellation of the session.
    SessionAborted,
}

impl EventKind {
    /// Converts this kind to its string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::SessionCreated => "SessionCreated",
            Self::SessionStarted => "SessionStarted",
            Self::ItemOpened => "ItemOpened",
            Self::BidAccepted => "BidAccepted",
            Self::BidCanceled => "BidCanceled",
            Self::RandomWindowEntered => "RandomWindowEntered",
            Self::RandomWindowCanceled => "RandomWindowCanceled",
            Self::ItemClosed => "ItemClosed",
            Self::SessionClosed => "SessionClosed",
            Self::SessionPaused => "SessionPaused",
            Self::SessionResumed => "SessionResumed",
            Self::SessionAborted => "SessionAborted",
        }
    }
}

/// An immutable record of one session fact.
///
/// Every successful state transition produces at least one event.
/// Events are append-only and never edited or deleted; closure of a
/// session freezes the log but preserves it in full.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionEvent {
    /// Position in the session's event log (1-based).
    pub sequence: u64,
    /// When the fact was recorded (unix seconds, UTC).
    pub at_unix: i64,
    /// What kind of fact this is.
    pub kind: EventKind,
    /// Human-readable description, as shown in the session minutes.
    pub description: String,
    /// The item involved, when the fact is item-scoped.
    pub item_id: Option<ItemId>,
    /// The participant involved, when the fact is participant-scoped.
    pub participant_id: Option<ParticipantId>,
    /// Whether the fact was produced by the engine rather than a person.
    pub system: bool,
}

impl SessionEvent {
    /// Creates a new `SessionEvent`.
    ///
    /// Once created, an event is immutable.
    #[must_use]
    pub const fn new(
        sequence: u64,
        at_unix: i64,
        kind: EventKind,
        description: String,
        item_id: Option<ItemId>,
        participant_id: Option<ParticipantId>,
        system: bool,
    ) -> Self {
        Self {
            sequence,
            at_unix,
            kind,
            description,
            item_id,
            participant_id,
            system,
        }
    }
}

/// The append-only event log of one session.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EventLog {
    events: Vec<SessionEvent>,
}

impl EventLog {
    /// Creates an empty log.
    #[must_use]
    pub const fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Appends a fact, assigning it the next sequence number.
    ///
    /// Returns the recorded event.
    pub fn record(
        &mut self,
        at_unix: i64,
        kind: EventKind,
        description: String,
        item_id: Option<ItemId>,
        participant_id: Option<ParticipantId>,
        system: bool,
    ) -> &SessionEvent {
        let sequence: u64 = self.events.len() as u64 + 1;
        self.events.push(SessionEvent::new(
            sequence,
            at_unix,
            kind,
            description,
            item_id,
            participant_id,
            system,
        ));
        // Just pushed, so the log is non-empty.
        &self.events[self.events.len() - 1]
    }

    /// Returns all recorded events in order.
    #[must_use]
    pub fn events(&self) -> &[SessionEvent] {
        &self.events
    }

    /// Returns the number of recorded events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns whether the log is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Returns the most recent event, if any.
    #[must_use]
    pub fn last(&self) -> Option<&SessionEvent> {
        self.events.last()
    }
}
