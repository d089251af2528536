// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Pure state transitions for the dispute session.
//!
//! `apply` never performs I/O and never consults the wall clock or an
//! RNG: the current instant and the drawn random-window delay arrive as
//! inputs. The serialized runtime owner calls `apply` for every command
//! — participant bids and timer expiries alike — so a last-moment bid
//! and an expiring timer commit in a strict order and the stale side
//! loses with [`CoreError::StaleDeadline`].

use crate::command::Command;
use crate::error::CoreError;
use crate::state::{Session, TimerState, TransitionResult};
use pregao_audit::EventKind;
use pregao_domain::{
    Bid, ChatMessage, DomainError, ItemId, ItemStatus, ParticipantId, SenderKind, SessionStatus,
    best_standing, rank_for, validate_bid,
};
use time::OffsetDateTime;

/// Working buffer for one transition: the cloned session plus the
/// events and chat messages appended so far.
struct Transition {
    session: Session,
    event_indices: Vec<usize>,
    chat_indices: Vec<usize>,
}

impl Transition {
    fn new(session: &Session) -> Self {
        Self {
            session: session.clone(),
            event_indices: Vec::new(),
            chat_indices: Vec::new(),
        }
    }

    fn record(
        &mut self,
        now: OffsetDateTime,
        kind: EventKind,
        description: String,
        item_id: Option<ItemId>,
        participant_id: Option<ParticipantId>,
        system: bool,
    ) {
        self.session.events.record(
            now.unix_timestamp(),
            kind,
            description,
            item_id,
            participant_id,
            system,
        );
        self.event_indices.push(self.session.events.len() - 1);
    }

    fn system_chat(&mut self, now: OffsetDateTime, text: String) {
        let sequence: u64 = self.session.chat.len() as u64 + 1;
        self.session.chat.push(ChatMessage::new(
            sequence,
            SenderKind::System,
            String::from(SenderKind::System.as_str()),
            text,
            now,
        ));
        self.chat_indices.push(self.session.chat.len() - 1);
    }

    fn chat(&mut self, now: OffsetDateTime, sender: SenderKind, label: String, text: String) {
        let sequence: u64 = self.session.chat.len() as u64 + 1;
        self.session
            .chat
            .push(ChatMessage::new(sequence, sender, label, text, now));
        self.chat_indices.push(self.session.chat.len() - 1);
    }

    fn finish(mut self, accepted_bid: Option<Bid>) -> TransitionResult {
        self.session.revision += 1;
        let events = self
            .event_indices
            .iter()
            .map(|&i| self.session.events.events()[i].clone())
            .collect();
        let chat_messages = self
            .chat_indices
            .iter()
            .map(|&i| self.session.chat[i].clone())
            .collect();
        TransitionResult {
            new_session: self.session,
            events,
            accepted_bid,
            chat_messages,
        }
    }
}

/// Opens the item at `index` and arms a fresh inactivity countdown.
fn open_item(t: &mut Transition, index: usize, now: OffsetDateTime) {
    let deadline: i64 = now.unix_timestamp() + i64::from(t.session.config.inactivity_timeout_secs);
    t.session.items[index].status = ItemStatus::Open;
    t.session.current_item_index = Some(index);
    t.session.timer = TimerState::Inactivity {
        deadline_unix: deadline,
    };

    let (number, description, item_id) = {
        let item = &t.session.items[index];
        (item.number, item.description.clone(), item.id.clone())
    };
    t.record(
        now,
        EventKind::ItemOpened,
        format!("Disputa iniciada para o Item {number}: {description}"),
        Some(item_id),
        None,
        true,
    );
    t.system_chat(now, format!("Item {number} em disputa. Envie seus lances."));
}

/// Closes the current item, then advances to the next pending item or
/// closes the session when none remain.
fn close_current_and_advance(t: &mut Transition, now: OffsetDateTime) -> Result<(), CoreError> {
    let index: usize = t.session.current_item_index.ok_or(CoreError::NoCurrentItem)?;

    t.session.items[index].status = ItemStatus::Closed;

    let (number, item_id) = {
        let item = &t.session.items[index];
        (item.number, item.id.clone())
    };
    let standings = rank_for(&t.session.items[index], t.session.bids_for(index));
    let (description, winner) = match best_standing(&standings) {
        Some(leader) => {
            let label: String = t
                .session
                .participant(&leader.participant_id)
                .map_or_else(|| leader.participant_id.to_string(), |p| p.label.clone());
            (
                format!(
                    "Disputa do Item {number} encerrada. Melhor lance: {} - {label}",
                    leader.best_unit_value
                ),
                Some(leader.participant_id.clone()),
            )
        }
        None => (
            format!("Disputa do Item {number} encerrada sem lances"),
            None,
        ),
    };

    t.record(
        now,
        EventKind::ItemClosed,
        description.clone(),
        Some(item_id),
        winner,
        true,
    );
    t.system_chat(now, description);

    let next: Option<usize> = t
        .session
        .items
        .iter()
        .position(|i| i.status == ItemStatus::Pending);

    match next {
        Some(next_index) => open_item(t, next_index, now),
        None => {
            t.session.status = SessionStatus::Closed;
            t.session.current_item_index = None;
            t.session.timer = TimerState::Idle;
            t.record(
                now,
                EventKind::SessionClosed,
                String::from("Sessão pública encerrada. Classificação final registrada."),
                None,
                None,
                true,
            );
            t.system_chat(
                now,
                String::from("Sessão encerrada. Classificação final registrada."),
            );
        }
    }

    Ok(())
}

/// Applies a command to the session, producing the new state and the
/// audit events recorded by the transition.
///
/// # Errors
///
/// Returns an error if the command is not valid in the current state,
/// violates a domain rule, or carries a stale deadline. On error the
/// input session is untouched.
#[allow(clippy::too_many_lines)]
pub fn apply(
    session: &Session,
    command: Command,
    now: OffsetDateTime,
) -> Result<TransitionResult, CoreError> {
    match command {
        Command::Start => {
            if session.status != SessionStatus::NotStarted {
                return Err(CoreError::InvalidState {
                    action: "Start",
                    status: session.status,
                });
            }

            let mut t: Transition = Transition::new(session);
            t.session.status = SessionStatus::Running;
            t.record(
                now,
                EventKind::SessionStarted,
                String::from("Sessão pública iniciada pelo Pregoeiro"),
                None,
                None,
                true,
            );
            t.system_chat(
                now,
                format!(
                    "Sessão de disputa iniciada. Pregoeiro: {}",
                    t.session.auctioneer_name
                ),
            );
            open_item(&mut t, 0, now);

            Ok(t.finish(None))
        }

        Command::SubmitBid {
            item_id,
            participant_id,
            unit_centavos,
        } => {
            if session.status != SessionStatus::Running {
                return Err(CoreError::InvalidState {
                    action: "SubmitBid",
                    status: session.status,
                });
            }
            if session.participant(&participant_id).is_none() {
                return Err(CoreError::DomainViolation(DomainError::UnknownParticipant {
                    participant_id: participant_id.to_string(),
                }));
            }
            let index: usize =
                session
                    .item_index(&item_id)
                    .ok_or(CoreError::DomainViolation(DomainError::UnknownItem {
                        item_id: item_id.to_string(),
                    }))?;

            let bid: Bid = validate_bid(
                &session.items[index],
                &session.config,
                session.bids_for(index),
                &participant_id,
                unit_centavos,
                now,
            )?;

            let mut t: Transition = Transition::new(session);
            let was_random_window: bool =
                t.session.items[index].status == ItemStatus::RandomWindow;

            t.session.bids[index].push(bid.clone());

            // Every accepted bid restarts the full inactivity countdown
            // and cancels a running random window.
            if was_random_window {
                t.session.items[index].status = ItemStatus::Open;
                t.record(
                    now,
                    EventKind::RandomWindowCanceled,
                    String::from("Lance recebido durante o tempo aleatório; contagem reiniciada"),
                    Some(item_id.clone()),
                    Some(participant_id.clone()),
                    true,
                );
            }
            t.session.timer = TimerState::Inactivity {
                deadline_unix: now.unix_timestamp()
                    + i64::from(t.session.config.inactivity_timeout_secs),
            };

            t.record(
                now,
                EventKind::BidAccepted,
                format!("Lance de {} registrado", bid.unit_value),
                Some(item_id),
                Some(participant_id),
                false,
            );

            Ok(t.finish(Some(bid)))
        }

        Command::CancelBid {
            item_id,
            sequence,
            justification,
        } => {
            if session.status != SessionStatus::Running {
                return Err(CoreError::InvalidState {
                    action: "CancelBid",
                    status: session.status,
                });
            }
            if justification.trim().is_empty() {
                return Err(CoreError::DomainViolation(DomainError::MissingJustification));
            }
            let index: usize =
                session
                    .item_index(&item_id)
                    .ok_or(CoreError::DomainViolation(DomainError::UnknownItem {
                        item_id: item_id.to_string(),
                    }))?;
            if !session.items[index].status.accepts_bids() {
                return Err(CoreError::DomainViolation(DomainError::ClosedItem {
                    item_number: session.items[index].number,
                    status: session.items[index].status,
                }));
            }
            let position: usize = session
                .bids_for(index)
                .iter()
                .position(|b| b.sequence == sequence && b.is_active())
                .ok_or(CoreError::DomainViolation(DomainError::BidNotFound {
                    sequence,
                }))?;

            let mut t: Transition = Transition::new(session);
            let participant_id: ParticipantId = {
                let entry = &mut t.session.bids[index][position];
                entry.canceled = true;
                entry.cancel_reason = Some(justification.clone());
                entry.participant_id.clone()
            };

            t.record(
                now,
                EventKind::BidCanceled,
                format!("Lance #{sequence} cancelado pelo Pregoeiro. Motivo: {justification}"),
                Some(item_id),
                Some(participant_id),
                false,
            );
            t.system_chat(
                now,
                format!("Lance cancelado pelo Pregoeiro. Motivo: {justification}"),
            );

            Ok(t.finish(None))
        }

        Command::SendChat {
            sender,
            participant_id,
            text,
        } => {
            if !matches!(
                session.status,
                SessionStatus::Running | SessionStatus::Paused
            ) {
                return Err(CoreError::InvalidState {
                    action: "SendChat",
                    status: session.status,
                });
            }

            let label: String = match sender {
                SenderKind::System => String::from(SenderKind::System.as_str()),
                SenderKind::Auctioneer => String::from(SenderKind::Auctioneer.as_str()),
                SenderKind::Participant => {
                    let id: &ParticipantId = participant_id.as_ref().ok_or(
                        CoreError::DomainViolation(DomainError::UnknownParticipant {
                            participant_id: String::from("(ausente)"),
                        }),
                    )?;
                    session
                        .participant(id)
                        .map(|p| p.label.clone())
                        .ok_or(CoreError::DomainViolation(DomainError::UnknownParticipant {
                            participant_id: id.to_string(),
                        }))?
                }
            };

            let mut t: Transition = Transition::new(session);
            t.chat(now, sender, label, text);

            Ok(t.finish(None))
        }

        Command::InactivityElapsed { closing_delay_secs } => {
            if session.status != SessionStatus::Running {
                return Err(CoreError::InvalidState {
                    action: "InactivityElapsed",
                    status: session.status,
                });
            }
            let TimerState::Inactivity { deadline_unix } = session.timer else {
                return Err(CoreError::StaleDeadline {
                    action: "InactivityElapsed",
                });
            };
            if now.unix_timestamp() < deadline_unix {
                return Err(CoreError::StaleDeadline {
                    action: "InactivityElapsed",
                });
            }

            let min_secs: u32 = session.config.random_window_min_minutes * 60;
            let max_secs: u32 = session.config.random_window_max_minutes * 60;
            if closing_delay_secs < min_secs || closing_delay_secs > max_secs {
                return Err(CoreError::InvalidClosingDraw {
                    delay_secs: closing_delay_secs,
                    min_secs,
                    max_secs,
                });
            }

            let index: usize = session.current_item_index.ok_or(CoreError::NoCurrentItem)?;

            let mut t: Transition = Transition::new(session);
            t.session.items[index].status = ItemStatus::RandomWindow;
            // The drawn deadline stays server-side; only the fact that
            // the window is active is ever disclosed.
            t.session.timer = TimerState::RandomWindow {
                deadline_unix: now.unix_timestamp() + i64::from(closing_delay_secs),
            };

            let item_id: ItemId = t.session.items[index].id.clone();
            t.record(
                now,
                EventKind::RandomWindowEntered,
                String::from("Tempo aleatório de encerramento iniciado"),
                Some(item_id),
                None,
                true,
            );
            t.system_chat(
                now,
                String::from(
                    "ATENÇÃO: iniciado o tempo aleatório de encerramento. O item pode encerrar a qualquer momento. Envie lances para prorrogar.",
                ),
            );

            Ok(t.finish(None))
        }

        Command::ClosingElapsed => {
            if session.status != SessionStatus::Running {
                return Err(CoreError::InvalidState {
                    action: "ClosingElapsed",
                    status: session.status,
                });
            }
            let TimerState::RandomWindow { deadline_unix } = session.timer else {
                return Err(CoreError::StaleDeadline {
                    action: "ClosingElapsed",
                });
            };
            if now.unix_timestamp() < deadline_unix {
                return Err(CoreError::StaleDeadline {
                    action: "ClosingElapsed",
                });
            }

            let mut t: Transition = Transition::new(session);
            close_current_and_advance(&mut t, now)?;
            Ok(t.finish(None))
        }

        Command::CloseItem => {
            if session.status != SessionStatus::Running {
                return Err(CoreError::InvalidState {
                    action: "CloseItem",
                    status: session.status,
                });
            }
            let index: usize = session.current_item_index.ok_or(CoreError::NoCurrentItem)?;
            if !session.items[index].status.accepts_bids() {
                return Err(CoreError::DomainViolation(DomainError::ClosedItem {
                    item_number: session.items[index].number,
                    status: session.items[index].status,
                }));
            }

            let mut t: Transition = Transition::new(session);
            close_current_and_advance(&mut t, now)?;
            Ok(t.finish(None))
        }

        Command::Pause { reason } => {
            if session.status != SessionStatus::Running {
                return Err(CoreError::InvalidState {
                    action: "Pause",
                    status: session.status,
                });
            }

            let mut t: Transition = Transition::new(session);
            t.session.status = SessionStatus::Paused;
            t.session.hold_reason = Some(reason.clone());
            // Freeze the active countdown; resume restores the
            // remaining time, never a full reset.
            t.session.timer = match session.timer {
                TimerState::Inactivity { deadline_unix } => TimerState::Frozen {
                    remaining_secs: (deadline_unix - now.unix_timestamp()).max(0),
                    in_random_window: false,
                },
                TimerState::RandomWindow { deadline_unix } => TimerState::Frozen {
                    remaining_secs: (deadline_unix - now.unix_timestamp()).max(0),
                    in_random_window: true,
                },
                other @ (TimerState::Idle | TimerState::Frozen { .. }) => other,
            };

            t.record(
                now,
                EventKind::SessionPaused,
                format!("Sessão suspensa. Motivo: {reason}"),
                None,
                None,
                false,
            );
            t.system_chat(now, format!("Sessão suspensa pelo Pregoeiro. Motivo: {reason}"));

            Ok(t.finish(None))
        }

        Command::Resume => {
            if session.status != SessionStatus::Paused {
                return Err(CoreError::InvalidState {
                    action: "Resume",
                    status: session.status,
                });
            }

            let mut t: Transition = Transition::new(session);
            t.session.status = SessionStatus::Running;
            t.session.hold_reason = None;
            t.session.timer = match session.timer {
                TimerState::Frozen {
                    remaining_secs,
                    in_random_window: false,
                } => TimerState::Inactivity {
                    deadline_unix: now.unix_timestamp() + remaining_secs,
                },
                TimerState::Frozen {
                    remaining_secs,
                    in_random_window: true,
                } => TimerState::RandomWindow {
                    deadline_unix: now.unix_timestamp() + remaining_secs,
                },
                other @ (TimerState::Idle
                | TimerState::Inactivity { .. }
                | TimerState::RandomWindow { .. }) => other,
            };

            t.record(
                now,
                EventKind::SessionResumed,
                String::from("Sessão retomada pelo Pregoeiro"),
                None,
                None,
                false,
            );
            t.system_chat(now, String::from("Sessão retomada. Contagem restaurada."));

            Ok(t.finish(None))
        }

        Command::Abort { reason } => {
            if !session.status.can_transition_to(SessionStatus::Aborted) {
                return Err(CoreError::InvalidState {
                    action: "Abort",
                    status: session.status,
                });
            }

            let mut t: Transition = Transition::new(session);
            t.session.status = SessionStatus::Aborted;
            t.session.hold_reason = Some(reason.clone());
            t.session.timer = TimerState::Idle;

            t.record(
                now,
                EventKind::SessionAborted,
                format!("Sessão cancelada. Motivo: {reason}"),
                None,
                None,
                false,
            );
            t.system_chat(now, format!("Sessão cancelada. Motivo: {reason}"));

            Ok(t.finish(None))
        }

        Command::ConnectParticipant { participant_id } => {
            if session.status.is_terminal() {
                return Err(CoreError::InvalidState {
                    action: "ConnectParticipant",
                    status: session.status,
                });
            }

            let mut t: Transition = Transition::new(session);
            let found = t
                .session
                .participants
                .iter_mut()
                .find(|p| p.id == participant_id);
            match found {
                Some(participant) => participant.online = true,
                None => {
                    return Err(CoreError::DomainViolation(DomainError::UnknownParticipant {
                        participant_id: participant_id.to_string(),
                    }));
                }
            }

            Ok(t.finish(None))
        }

        Command::DisconnectParticipant { participant_id } => {
            if session.status.is_terminal() {
                return Err(CoreError::InvalidState {
                    action: "DisconnectParticipant",
                    status: session.status,
                });
            }

            let mut t: Transition = Transition::new(session);
            let found = t
                .session
                .participants
                .iter_mut()
                .find(|p| p.id == participant_id);
            match found {
                Some(participant) => participant.online = false,
                None => {
                    return Err(CoreError::DomainViolation(DomainError::UnknownParticipant {
                        participant_id: participant_id.to_string(),
                    }));
                }
            }

            Ok(t.finish(None))
        }
    }
}
