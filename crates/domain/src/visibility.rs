// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Participant identity visibility.
//!
//! Visibility is a session-level policy derived from the session
//! status, never a field on the participant record. Historical
//! snapshots can therefore reconstruct exactly what was visible at any
//! phase by re-deriving the policy for that phase.

use crate::types::{Participant, SessionStatus};

/// What a projection may show about participant identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisibilityPolicy {
    /// Dispute in progress: only stable anonymized labels.
    Anonymized,
    /// Post-dispute: real names and CNPJ may be shown.
    Revealed,
}

impl VisibilityPolicy {
    /// Derives the policy for a session status.
    ///
    /// Identities reveal only on normal completion. An aborted session
    /// never discloses who was behind each label.
    #[must_use]
    pub const fn for_status(status: SessionStatus) -> Self {
        match status {
            SessionStatus::Closed => Self::Revealed,
            SessionStatus::NotStarted
            | SessionStatus::Running
            | SessionStatus::Paused
            | SessionStatus::Aborted => Self::Anonymized,
        }
    }

    /// Returns whether real identities may be disclosed.
    #[must_use]
    pub const fn can_reveal(&self) -> bool {
        matches!(self, Self::Revealed)
    }

    /// The display name for a participant under this policy.
    #[must_use]
    pub fn display_name<'a>(&self, participant: &'a Participant) -> &'a str {
        match self {
            Self::Anonymized => &participant.label,
            Self::Revealed => &participant.name,
        }
    }
}
