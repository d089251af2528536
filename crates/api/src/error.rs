// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Error types for the API layer.
//!
//! Business rejections carry a stable machine-readable code so clients
//! can distinguish "your bid was rejected for reason X" from transport
//! failures; the two are never conflated in the interface contract.

use pregao::CoreError;
use pregao_domain::DomainError;
use thiserror::Error;

/// API-level errors.
///
/// These are distinct from domain/core errors and represent the API
/// contract.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// Malformed request or configuration.
    #[error("Validation failed: {message}")]
    Validation {
        /// A human-readable description of the problem.
        message: String,
    },
    /// The action is not valid in the current session state.
    #[error("'{action}' is not valid in the current session state: {message}")]
    InvalidState {
        /// The attempted action.
        action: String,
        /// A human-readable description.
        message: String,
    },
    /// The item is not accepting bids.
    #[error("{message}")]
    ClosedItem {
        /// A human-readable description.
        message: String,
    },
    /// The bid does not improve on the submitter's own previous best
    /// (or breaches the opening-bid ceiling).
    #[error("{message}")]
    NotImproved {
        /// A human-readable description.
        message: String,
    },
    /// The improvement is below the configured minimum decrement.
    #[error("{message}")]
    DecrementTooSmall {
        /// A human-readable description.
        message: String,
    },
    /// The caller is not admitted to the session.
    #[error("Forbidden: {message}")]
    Forbidden {
        /// A human-readable description.
        message: String,
    },
    /// The request lost a commit race; the caller should re-read the
    /// snapshot and decide whether to resubmit.
    #[error("Conflict: {message}")]
    Conflict {
        /// A human-readable description.
        message: String,
    },
    /// A requested resource was not found.
    #[error("{resource} not found: {message}")]
    NotFound {
        /// The type of resource that was not found.
        resource: String,
        /// A human-readable description.
        message: String,
    },
    /// An internal error occurred.
    #[error("Internal error: {message}")]
    Internal {
        /// A description of the internal error.
        message: String,
    },
}

impl ApiError {
    /// Stable machine-readable error code for the wire contract.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "VALIDATION",
            Self::InvalidState { .. } => "INVALID_STATE",
            Self::ClosedItem { .. } => "CLOSED_ITEM",
            Self::NotImproved { .. } => "NOT_IMPROVED",
            Self::DecrementTooSmall { .. } => "DECREMENT_TOO_SMALL",
            Self::Forbidden { .. } => "FORBIDDEN",
            Self::Conflict { .. } => "CONFLICT",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Internal { .. } => "INTERNAL",
        }
    }
}

/// Translates a domain error into an API error.
///
/// This translation is explicit and ensures domain errors are not
/// leaked directly.
#[must_use]
pub fn translate_domain_error(err: DomainError) -> ApiError {
    match err {
        DomainError::EmptyItems
        | DomainError::EmptyParticipants
        | DomainError::InvalidConfig { .. }
        | DomainError::InvalidStatus(_)
        | DomainError::InvalidDisputeMode(_)
        | DomainError::InvalidValue { .. }
        | DomainError::InvalidQuantity { .. }
        | DomainError::BidIntervalTooShort { .. }
        | DomainError::DuplicateParticipant { .. }
        | DomainError::MissingJustification => ApiError::Validation {
            message: err.to_string(),
        },
        DomainError::ClosedItem { .. } => ApiError::ClosedItem {
            message: err.to_string(),
        },
        // The opening-bid ceiling is part of the improvement rules.
        DomainError::NotImproved { .. } | DomainError::AboveReferenceCeiling { .. } => {
            ApiError::NotImproved {
                message: err.to_string(),
            }
        }
        DomainError::DecrementTooSmall { .. } => ApiError::DecrementTooSmall {
            message: err.to_string(),
        },
        DomainError::UnknownParticipant { .. } => ApiError::Forbidden {
            message: err.to_string(),
        },
        DomainError::UnknownItem { item_id } => ApiError::NotFound {
            resource: String::from("Item"),
            message: format!("Item '{item_id}' does not belong to this session"),
        },
        DomainError::BidNotFound { sequence } => ApiError::NotFound {
            resource: String::from("Bid"),
            message: format!("Bid #{sequence} not found in the item history"),
        },
    }
}

/// Translates a core error into an API error.
///
/// This translation is explicit and ensures core errors are not leaked
/// directly.
#[must_use]
pub fn translate_core_error(err: CoreError) -> ApiError {
    match err {
        CoreError::DomainViolation(domain_err) => translate_domain_error(domain_err),
        CoreError::InvalidState { action, status } => ApiError::InvalidState {
            action: action.to_string(),
            message: format!("session is {status}"),
        },
        CoreError::StaleDeadline { .. } => ApiError::Conflict {
            message: String::from("the request arrived too late; re-read the session snapshot"),
        },
        CoreError::NoCurrentItem => ApiError::Internal {
            message: String::from("session is running but has no current item"),
        },
        CoreError::InvalidClosingDraw { .. } => ApiError::Internal {
            message: err.to_string(),
        },
    }
}
