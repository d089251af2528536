// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use pregao_domain::{DomainError, SessionStatus};

/// Errors produced by applying a command to a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// A domain rule was violated.
    DomainViolation(DomainError),
    /// The command is not valid in the session's current status.
    InvalidState {
        /// The attempted action.
        action: &'static str,
        /// The session's current status.
        status: SessionStatus,
    },
    /// A running session has no current item (internal invariant).
    NoCurrentItem,
    /// A timer command arrived for a deadline that no longer holds
    /// (a bid or a pause superseded it). The racing timer loses.
    StaleDeadline {
        /// The attempted timer action.
        action: &'static str,
    },
    /// The drawn closing delay falls outside the configured window.
    InvalidClosingDraw {
        /// The drawn delay in seconds.
        delay_secs: u32,
        /// The configured lower bound in seconds.
        min_secs: u32,
        /// The configured upper bound in seconds.
        max_secs: u32,
    },
}

impl std::fmt::Display for CoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DomainViolation(err) => write!(f, "{err}"),
            Self::InvalidState { action, status } => {
                write!(f, "'{action}' is not valid while the session is {status}")
            }
            Self::NoCurrentItem => {
                write!(f, "Session is running but has no current item")
            }
            Self::StaleDeadline { action } => {
                write!(f, "Timer action '{action}' superseded by a newer commit")
            }
            Self::InvalidClosingDraw {
                delay_secs,
                min_secs,
                max_secs,
            } => {
                write!(
                    f,
                    "Closing delay of {delay_secs}s outside the configured window [{min_secs}s, {max_secs}s]"
                )
            }
        }
    }
}

impl std::error::Error for CoreError {}

impl From<DomainError> for CoreError {
    fn from(err: DomainError) -> Self {
        Self::DomainViolation(err)
    }
}
