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

mod error;
mod handlers;
mod request_response;

#[cfg(test)]
mod tests;

pub use error::{ApiError, translate_core_error, translate_domain_error};
pub use handlers::{prepare_session, project_message, project_snapshot, session_outcome};
pub use request_response::{
    FinalRankingEntry, ItemOutcome, ItemView, LanceView, MensagemView, ParticipanteView,
    PrepareSessionRequest, PreparedItem, PreparedProposal, SessaoSnapshot, SessionConfigDto,
    SessionOutcome,
};
