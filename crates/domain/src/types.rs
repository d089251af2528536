// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use crate::error::DomainError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use time::OffsetDateTime;

/// Represents the lifecycle state of a dispute session.
///
/// Explicit lifecycle states govern which operations are permitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SessionStatus {
    /// Created but not yet opened by the auctioneer.
    #[default]
    NotStarted,
    /// Live dispute in progress. Exactly one item is current.
    Running,
    /// Suspended by the auctioneer. All timers frozen.
    Paused,
    /// Normal completion. Session is read-only from here on.
    Closed,
    /// Administrative cancellation. Terminal and distinct from `Closed`.
    Aborted,
}

impl FromStr for SessionStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NotStarted" => Ok(Self::NotStarted),
            "Running" => Ok(Self::Running),
            "Paused" => Ok(Self::Paused),
            "Closed" => Ok(Self::Closed),
            "Aborted" => Ok(Self::Aborted),
            _ => Err(DomainError::InvalidStatus(s.to_string())),
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl SessionStatus {
    /// Converts this status to its string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "NotStarted",
            Self::Running => "Running",
            Self::Paused => "Paused",
            Self::Closed => "Closed",
            Self::Aborted => "Aborted",
        }
    }

    /// Checks if a transition from this status to another is valid.
    ///
    /// Valid transitions are:
    /// - `NotStarted` → Running
    /// - Running → Paused
    /// - Paused → Running
    /// - Running → Closed
    /// - `NotStarted` | Running | Paused → Aborted
    #[must_use]
    pub const fn can_transition_to(&self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::NotStarted, Self::Running)
                | (Self::Running, Self::Paused)
                | (Self::Paused, Self::Running)
                | (Self::Running, Self::Closed)
                | (
                    Self::NotStarted | Self::Running | Self::Paused,
                    Self::Aborted
                )
        )
    }

    /// Returns whether this status is terminal.
    ///
    /// Terminal sessions are read-only; nothing is physically deleted.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed | Self::Aborted)
    }
}

/// Represents the dispute state of a single item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ItemStatus {
    /// Waiting its turn. Items are processed strictly in listed order.
    #[default]
    Pending,
    /// Open for bids with the inactivity countdown running.
    Open,
    /// Inactivity elapsed; closing at an undisclosed instant.
    RandomWindow,
    /// Dispute over. Bid history frozen.
    Closed,
}

impl FromStr for ItemStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Open" => Ok(Self::Open),
            "RandomWindow" => Ok(Self::RandomWindow),
            "Closed" => Ok(Self::Closed),
            _ => Err(DomainError::InvalidStatus(s.to_string())),
        }
    }
}

impl std::fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl ItemStatus {
    /// Converts this status to its string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Open => "Open",
            Self::RandomWindow => "RandomWindow",
            Self::Closed => "Closed",
        }
    }

    /// Checks if a transition from this status to another is valid.
    ///
    /// Valid transitions are:
    /// - Pending → Open
    /// - Open → `RandomWindow` (inactivity elapsed)
    /// - `RandomWindow` → Open (a bid arrived before the drawn instant)
    /// - Open | `RandomWindow` → Closed
    #[must_use]
    pub const fn can_transition_to(&self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Pending, Self::Open)
                | (Self::Open, Self::RandomWindow)
                | (Self::RandomWindow, Self::Open)
                | (Self::Open | Self::RandomWindow, Self::Closed)
        )
    }

    /// Returns whether bids are accepted in this status.
    #[must_use]
    pub const fn accepts_bids(&self) -> bool {
        matches!(self, Self::Open | Self::RandomWindow)
    }
}

/// Dispute mode per art. 56 of Lei 14.133/2021.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DisputeMode {
    /// Open mode: successive public bids.
    #[default]
    Aberto,
    /// Closed mode: single sealed bid. Carried as configuration; the
    /// live loop only drives `Aberto` disputes.
    Fechado,
}

impl DisputeMode {
    /// Parses a dispute mode from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the string does not match a valid mode.
    pub fn parse(s: &str) -> Result<Self, DomainError> {
        match s {
            "ABERTO" => Ok(Self::Aberto),
            "FECHADO" => Ok(Self::Fechado),
            _ => Err(DomainError::InvalidDisputeMode(s.to_string())),
        }
    }

    /// Returns the string representation of this mode.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Aberto => "ABERTO",
            Self::Fechado => "FECHADO",
        }
    }
}

/// A monetary unit value in centavos.
///
/// Integer centavos keep comparisons and decrement arithmetic exact;
/// floating point is never used for money.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UnitValue {
    centavos: i64,
}

impl UnitValue {
    /// Creates a `UnitValue` from centavos.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidValue` if the amount is not strictly
    /// positive.
    pub const fn from_centavos(centavos: i64) -> Result<Self, DomainError> {
        if centavos > 0 {
            Ok(Self { centavos })
        } else {
            Err(DomainError::InvalidValue { centavos })
        }
    }

    /// Returns the amount in centavos.
    #[must_use]
    pub const fn centavos(&self) -> i64 {
        self.centavos
    }

    /// Computes the total value for a quantity of this unit value.
    #[must_use]
    pub const fn total_for(&self, quantity: u32) -> i64 {
        self.centavos * quantity as i64
    }
}

impl std::fmt::Display for UnitValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "R$ {},{:02}", self.centavos / 100, self.centavos % 100)
    }
}

/// Session configuration for the dispute phase.
///
/// Defaults follow the values the preparation workflow hands the
/// session screen: 180s inactivity, 2-30 minute random window, 3s
/// minimum self-interval, 0.50% minimum decrement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Dispute mode (open or sealed).
    pub dispute_mode: DisputeMode,
    /// Inactivity countdown per item, in seconds.
    pub inactivity_timeout_secs: u32,
    /// Lower bound of the random closing window, in minutes.
    pub random_window_min_minutes: u32,
    /// Upper bound of the random closing window, in minutes.
    pub random_window_max_minutes: u32,
    /// Minimum interval between a participant's own bids, in seconds.
    /// Zero disables the check.
    pub min_bid_interval_secs: u32,
    /// Minimum improvement over the participant's own previous bid, in
    /// basis points (50 = 0.50%). Zero disables the check.
    pub min_decrement_bps: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            dispute_mode: DisputeMode::Aberto,
            inactivity_timeout_secs: 180,
            random_window_min_minutes: 2,
            random_window_max_minutes: 30,
            min_bid_interval_secs: 3,
            min_decrement_bps: 50,
        }
    }
}

impl SessionConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidConfig` if:
    /// - the inactivity timeout is zero
    /// - the random window bounds are zero or inverted
    /// - the minimum decrement is 100% or more
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.inactivity_timeout_secs == 0 {
            return Err(DomainError::InvalidConfig {
                reason: String::from("inactivity timeout must be greater than zero"),
            });
        }
        if self.random_window_min_minutes == 0 || self.random_window_max_minutes == 0 {
            return Err(DomainError::InvalidConfig {
                reason: String::from("random window bounds must be greater than zero"),
            });
        }
        if self.random_window_min_minutes > self.random_window_max_minutes {
            return Err(DomainError::InvalidConfig {
                reason: format!(
                    "random window lower bound ({} min) exceeds upper bound ({} min)",
                    self.random_window_min_minutes, self.random_window_max_minutes
                ),
            });
        }
        if self.min_decrement_bps >= 10_000 {
            return Err(DomainError::InvalidConfig {
                reason: format!(
                    "minimum decrement of {} bps is 100% or more",
                    self.min_decrement_bps
                ),
            });
        }
        Ok(())
    }
}

/// Opaque identifier for a dispute session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    /// Creates a new `SessionId`.
    #[must_use]
    pub fn new(value: &str) -> Self {
        Self(value.to_string())
    }

    /// Returns the identifier value.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque identifier for a supplier participating in a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParticipantId(String);

impl ParticipantId {
    /// Creates a new `ParticipantId`.
    #[must_use]
    pub fn new(value: &str) -> Self {
        Self(value.to_string())
    }

    /// Returns the identifier value.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque identifier for an item under dispute.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemId(String);

impl ItemId {
    /// Creates a new `ItemId`.
    #[must_use]
    pub fn new(value: &str) -> Self {
        Self(value.to_string())
    }

    /// Returns the identifier value.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Computes the stable anonymized label for a participant index.
///
/// Labels run "Fornecedor A" through "Fornecedor Z", then "Fornecedor
/// AA", "Fornecedor AB" and so on. Assignment happens once at session
/// creation, in proposal order, and never changes for the lifetime of
/// the session.
#[must_use]
pub fn anonymized_label(index: usize) -> String {
    let mut letters = String::new();
    let mut n = index;
    loop {
        let letter = char::from(b'A' + (n % 26) as u8);
        letters.insert(0, letter);
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }
    format!("Fornecedor {letters}")
}

/// A supplier admitted to the session from a classified proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    /// Canonical identifier (from the procurement workflow).
    pub id: ParticipantId,
    /// Real company name. Withheld from other participants until the
    /// session reaches a post-dispute phase.
    pub name: String,
    /// CNPJ registration number.
    pub cnpj: String,
    /// Stable anonymized label (e.g. "Fornecedor A").
    pub label: String,
    /// Whether the participant currently holds a live connection.
    pub online: bool,
}

impl Participant {
    /// Creates a new `Participant` with its stable anonymized label.
    #[must_use]
    pub fn new(id: ParticipantId, name: String, cnpj: String, label_index: usize) -> Self {
        Self {
            id,
            name,
            cnpj,
            label: anonymized_label(label_index),
            online: false,
        }
    }
}

/// An item under dispute within a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Canonical identifier (from the procurement workflow).
    pub id: ItemId,
    /// Sequence number within the bidding process (1-based).
    pub number: u32,
    /// Short description.
    pub description: String,
    /// Quantity being procured.
    pub quantity: u32,
    /// Unit of measure (e.g. "UN").
    pub unit: String,
    /// Estimated reference unit value, if published. Acts as the
    /// opening-bid ceiling unless the reference is sealed.
    pub reference_value: Option<UnitValue>,
    /// Sigilo de orçamento: when true the reference value is withheld
    /// from bidders and the opening ceiling does not apply.
    pub sealed_reference: bool,
    /// Current dispute status.
    pub status: ItemStatus,
}

impl Item {
    /// Creates a new `Item` in `Pending` status.
    #[must_use]
    pub fn new(
        id: ItemId,
        number: u32,
        description: String,
        quantity: u32,
        unit: String,
        reference_value: Option<UnitValue>,
        sealed_reference: bool,
    ) -> Self {
        Self {
            id,
            number,
            description,
            quantity,
            unit,
            reference_value,
            sealed_reference,
            status: ItemStatus::Pending,
        }
    }

    /// Total estimated value (quantity × reference unit value).
    #[must_use]
    pub fn total_reference_value(&self) -> Option<i64> {
        self.reference_value.map(|v| v.total_for(self.quantity))
    }
}

/// A bid ("lance") on an item.
///
/// Bids are immutable once accepted. Auctioneer cancellation flags the
/// bid and records a justification; the record itself is never edited
/// or removed from the history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bid {
    /// Sequence number within the item's history (1-based).
    pub sequence: u64,
    /// The item this bid belongs to.
    pub item_id: ItemId,
    /// The participant who submitted it.
    pub participant_id: ParticipantId,
    /// Unit value offered.
    pub unit_value: UnitValue,
    /// Total value (unit × item quantity), fixed at submission.
    pub total_value: i64,
    /// Submission timestamp (unix seconds, UTC).
    pub submitted_at_unix: i64,
    /// Whether the auctioneer canceled this bid.
    pub canceled: bool,
    /// Justification recorded at cancellation.
    pub cancel_reason: Option<String>,
}

impl Bid {
    /// Creates a new accepted `Bid`.
    #[must_use]
    pub fn new(
        sequence: u64,
        item_id: ItemId,
        participant_id: ParticipantId,
        unit_value: UnitValue,
        quantity: u32,
        submitted_at: OffsetDateTime,
    ) -> Self {
        Self {
            sequence,
            item_id,
            participant_id,
            unit_value,
            total_value: unit_value.total_for(quantity),
            submitted_at_unix: submitted_at.unix_timestamp(),
            canceled: false,
            cancel_reason: None,
        }
    }

    /// Returns whether this bid counts for floors and standings.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        !self.canceled
    }
}

/// The kind of sender behind a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SenderKind {
    /// Automated session notice.
    System,
    /// The pregoeiro conducting the session.
    Auctioneer,
    /// A supplier. Displayed under its anonymized label during the
    /// dispute.
    Participant,
}

impl SenderKind {
    /// Returns the string representation of this sender kind.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::System => "SISTEMA",
            Self::Auctioneer => "PREGOEIRO",
            Self::Participant => "FORNECEDOR",
        }
    }
}

/// A chat message within a session. Observational only; chat never
/// affects auction state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Sequence number within the session chat log (1-based).
    pub sequence: u64,
    /// Who sent it.
    pub sender: SenderKind,
    /// Display label of the sender at the time of sending.
    pub sender_label: String,
    /// Message body.
    pub text: String,
    /// Timestamp (unix seconds, UTC).
    pub sent_at_unix: i64,
}

impl ChatMessage {
    /// Creates a new `ChatMessage`.
    #[must_use]
    pub fn new(
        sequence: u64,
        sender: SenderKind,
        sender_label: String,
        text: String,
        sent_at: OffsetDateTime,
    ) -> Self {
        Self {
            sequence,
            sender,
            sender_label,
            text,
            sent_at_unix: sent_at.unix_timestamp(),
        }
    }
}
