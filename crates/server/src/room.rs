// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Per-session room tasks and the room registry.
//!
//! One tokio task owns each session: every mutation — participant bids,
//! chat, auctioneer actions and timer expiries — flows through the
//! room's command queue and commits in strict arrival order. Validation
//! against a stale snapshot is answered with a `CONFLICT` rejection
//! ("your bid arrived too late"); the caller re-reads the snapshot.
//!
//! Broadcasting is fire-and-forget relative to the commit: slow or
//! disconnected subscribers fall behind on a lossy broadcast channel
//! and re-sync by pulling a full snapshot on reconnect.

use crate::live::LiveEvent;
use pregao::{Command, Session, TimerState, apply};
use pregao_api::{
    ApiError, SessaoSnapshot, SessionOutcome, project_snapshot, session_outcome,
    translate_core_error,
};
use pregao_audit::SessionEvent;
use pregao_domain::{Bid, ItemId, ParticipantId, SessionStatus};
use pregao_persistence::{CheckpointStore, SessionCheckpoint};
use std::collections::HashMap;
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::sync::{Mutex, broadcast, mpsc, oneshot};
use tracing::{debug, error, info, warn};

/// Depth of a room's inbound command queue.
const COMMAND_QUEUE_SIZE: usize = 256;

/// Maximum number of live events buffered per subscriber. Slow clients
/// drop older events and must re-sync via snapshot.
const EVENT_BUFFER_SIZE: usize = 100;

/// Acknowledgement for a committed command.
#[derive(Debug, Clone)]
pub struct CommandAck {
    /// Session revision after the commit.
    pub revision: u64,
    /// The accepted bid, when the command was a submission.
    pub accepted_bid: Option<Bid>,
}

/// Requests handled by a room task.
enum RoomRequest {
    /// Apply a command through the serialized commit path.
    Execute {
        command: Command,
        /// Revision the caller last observed; used to answer lost
        /// commit races with `CONFLICT` instead of a bare rejection.
        observed_revision: Option<u64>,
        reply: oneshot::Sender<Result<CommandAck, ApiError>>,
    },
    /// Bid on whichever item is currently in dispute.
    BidOnCurrentItem {
        participant_id: ParticipantId,
        unit_centavos: i64,
        observed_revision: Option<u64>,
        reply: oneshot::Sender<Result<CommandAck, ApiError>>,
    },
    /// Full snapshot for rehydration/reconnect.
    Snapshot {
        reply: oneshot::Sender<SessaoSnapshot>,
    },
    /// Final per-item ranking of a closed session.
    Outcome {
        reply: oneshot::Sender<Result<SessionOutcome, ApiError>>,
    },
    /// The session's full event log.
    Events {
        reply: oneshot::Sender<Vec<SessionEvent>>,
    },
}

/// Handle to a running room task.
#[derive(Clone)]
pub struct RoomHandle {
    tx: mpsc::Sender<RoomRequest>,
    live: broadcast::Sender<LiveEvent>,
}

impl RoomHandle {
    /// Applies a command through the room's serialized commit path.
    ///
    /// # Errors
    ///
    /// Returns the command's business rejection, or `Internal` if the
    /// room task is gone.
    pub async fn execute(
        &self,
        command: Command,
        observed_revision: Option<u64>,
    ) -> Result<CommandAck, ApiError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(RoomRequest::Execute {
                command,
                observed_revision,
                reply,
            })
            .await
            .map_err(|_| room_gone())?;
        rx.await.map_err(|_| room_gone())?
    }

    /// Submits a bid on the item currently in dispute.
    ///
    /// # Errors
    ///
    /// Returns the validator's rejection, `CONFLICT` when the bid lost
    /// a commit race, or `Internal` if the room task is gone.
    pub async fn bid_on_current_item(
        &self,
        participant_id: ParticipantId,
        unit_centavos: i64,
        observed_revision: Option<u64>,
    ) -> Result<CommandAck, ApiError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(RoomRequest::BidOnCurrentItem {
                participant_id,
                unit_centavos,
                observed_revision,
                reply,
            })
            .await
            .map_err(|_| room_gone())?;
        rx.await.map_err(|_| room_gone())?
    }

    /// Pulls a full authoritative snapshot.
    ///
    /// # Errors
    ///
    /// Returns `Internal` if the room task is gone.
    pub async fn snapshot(&self) -> Result<SessaoSnapshot, ApiError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(RoomRequest::Snapshot { reply })
            .await
            .map_err(|_| room_gone())?;
        rx.await.map_err(|_| room_gone())
    }

    /// Extracts the final ranking of a closed session.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` while the session is not closed, or
    /// `Internal` if the room task is gone.
    pub async fn outcome(&self) -> Result<SessionOutcome, ApiError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(RoomRequest::Outcome { reply })
            .await
            .map_err(|_| room_gone())?;
        rx.await.map_err(|_| room_gone())?
    }

    /// Reads the session's event log.
    ///
    /// # Errors
    ///
    /// Returns `Internal` if the room task is gone.
    pub async fn events(&self) -> Result<Vec<SessionEvent>, ApiError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(RoomRequest::Events { reply })
            .await
            .map_err(|_| room_gone())?;
        rx.await.map_err(|_| room_gone())
    }

    /// Subscribes to the room's live event stream.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<LiveEvent> {
        self.live.subscribe()
    }
}

fn room_gone() -> ApiError {
    ApiError::Internal {
        message: String::from("session room is no longer running"),
    }
}

/// The room task state.
struct Room {
    session: Session,
    store: Arc<dyn CheckpointStore>,
    live: broadcast::Sender<LiveEvent>,
}

impl Room {
    /// Applies a command, checkpoints the new state and fans out the
    /// resulting events. Returns the acknowledgement for the caller.
    fn commit(
        &mut self,
        command: Command,
        observed_revision: Option<u64>,
        now: OffsetDateTime,
    ) -> Result<CommandAck, ApiError> {
        let is_bid: bool = matches!(command, Command::SubmitBid { .. });
        let result = apply(&self.session, command, now);

        let transition = match result {
            Ok(transition) => transition,
            Err(err) => {
                let api_err: ApiError = translate_core_error(err);
                // A bid validated against an older revision that now
                // finds the item closed did not break a rule: it lost
                // the race against the closing commit.
                if is_bid
                    && matches!(api_err, ApiError::ClosedItem { .. })
                    && observed_revision.is_some_and(|r| r < self.session.revision)
                {
                    return Err(ApiError::Conflict {
                        message: String::from(
                            "your bid arrived after the item closed; re-read the snapshot",
                        ),
                    });
                }
                return Err(api_err);
            }
        };

        self.session = transition.new_session;
        self.checkpoint(now);

        for message in &transition.chat_messages {
            self.broadcast(LiveEvent::nova_mensagem(message));
        }
        self.broadcast(LiveEvent::EstadoSessao {
            estado: project_snapshot(&self.session, now),
        });

        Ok(CommandAck {
            revision: self.session.revision,
            accepted_bid: transition.accepted_bid,
        })
    }

    /// Persists the current state. A checkpoint failure is logged and
    /// does not fail the commit; the in-memory state remains
    /// authoritative.
    fn checkpoint(&self, now: OffsetDateTime) {
        let checkpoint: SessionCheckpoint = SessionCheckpoint::capture(&self.session, now);
        if let Err(e) = self.store.save(&checkpoint) {
            error!(
                session_id = %self.session.id,
                error = %e,
                "Failed to persist session checkpoint"
            );
        }
    }

    fn broadcast(&self, event: LiveEvent) {
        match self.live.send(event) {
            Ok(count) => debug!(receivers = count, "Broadcast live event"),
            Err(_) => debug!("No receivers for live event"),
        }
    }

    /// Returns the timer command due at `now`, with the random closing
    /// delay drawn here so the state machine stays deterministic.
    fn due_timer_command(&self, now: OffsetDateTime) -> Option<Command> {
        if self.session.status != SessionStatus::Running {
            return None;
        }
        match self.session.timer {
            TimerState::Inactivity { deadline_unix } if now.unix_timestamp() >= deadline_unix => {
                let min_secs: u32 = self.session.config.random_window_min_minutes * 60;
                let max_secs: u32 = self.session.config.random_window_max_minutes * 60;
                Some(Command::InactivityElapsed {
                    closing_delay_secs: rand::random_range(min_secs..=max_secs),
                })
            }
            TimerState::RandomWindow { deadline_unix } if now.unix_timestamp() >= deadline_unix => {
                Some(Command::ClosingElapsed)
            }
            TimerState::Inactivity { .. }
            | TimerState::RandomWindow { .. }
            | TimerState::Frozen { .. }
            | TimerState::Idle => None,
        }
    }

    async fn run(mut self, mut rx: mpsc::Receiver<RoomRequest>) {
        let mut tick = tokio::time::interval(std::time::Duration::from_secs(1));
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        info!(session_id = %self.session.id, "Session room started");

        loop {
            tokio::select! {
                maybe_request = rx.recv() => {
                    match maybe_request {
                        Some(request) => self.handle_request(request),
                        None => break,
                    }
                }
                _ = tick.tick() => {
                    let now: OffsetDateTime = OffsetDateTime::now_utc();

                    // Deadlines commit through the same serialized path
                    // as bids; a last-moment bid that already committed
                    // makes the expiry stale and it is simply skipped.
                    if let Some(command) = self.due_timer_command(now) {
                        match self.commit(command, None, now) {
                            Ok(ack) => {
                                debug!(
                                    session_id = %self.session.id,
                                    revision = ack.revision,
                                    "Timer transition committed"
                                );
                            }
                            Err(e) => {
                                warn!(session_id = %self.session.id, error = %e, "Timer transition rejected");
                            }
                        }
                    }

                    if !self.session.status.is_terminal() {
                        self.broadcast(LiveEvent::Tick {
                            tempo_restante: self.session.disclosed_remaining_secs(now),
                            em_tempo_aleatorio: self.session.in_random_window(),
                        });
                    }
                }
            }
        }

        info!(session_id = %self.session.id, "Session room stopped");
    }

    fn handle_request(&mut self, request: RoomRequest) {
        let now: OffsetDateTime = OffsetDateTime::now_utc();
        match request {
            RoomRequest::Execute {
                command,
                observed_revision,
                reply,
            } => {
                let result = self.commit(command, observed_revision, now);
                let _ = reply.send(result);
            }
            RoomRequest::BidOnCurrentItem {
                participant_id,
                unit_centavos,
                observed_revision,
                reply,
            } => {
                let current: Option<ItemId> = self.session.current_item().map(|i| i.id.clone());
                let result = match current {
                    Some(item_id) => self.commit(
                        Command::SubmitBid {
                            item_id,
                            participant_id,
                            unit_centavos,
                        },
                        observed_revision,
                        now,
                    ),
                    None => Err(ApiError::ClosedItem {
                        message: String::from("no item is in dispute"),
                    }),
                };
                let _ = reply.send(result);
            }
            RoomRequest::Snapshot { reply } => {
                let _ = reply.send(project_snapshot(&self.session, now));
            }
            RoomRequest::Outcome { reply } => {
                let _ = reply.send(session_outcome(&self.session));
            }
            RoomRequest::Events { reply } => {
                let _ = reply.send(self.session.events.events().to_vec());
            }
        }
    }
}

/// Registry of running rooms. Sessions are fully independent; the map
/// only hands out room handles.
pub struct RoomRegistry {
    rooms: Mutex<HashMap<String, RoomHandle>>,
    store: Arc<dyn CheckpointStore>,
}

impl RoomRegistry {
    /// Creates an empty registry over a checkpoint store.
    #[must_use]
    pub fn new(store: Arc<dyn CheckpointStore>) -> Self {
        Self {
            rooms: Mutex::new(HashMap::new()),
            store,
        }
    }

    /// Spawns a room for a freshly prepared session.
    ///
    /// # Errors
    ///
    /// Returns a validation error if a room already exists for the
    /// session id.
    pub async fn create(&self, session: Session) -> Result<RoomHandle, ApiError> {
        let mut rooms = self.rooms.lock().await;
        let key: String = session.id.value().to_string();
        if rooms.contains_key(&key) {
            return Err(ApiError::Validation {
                message: format!("session '{key}' already exists"),
            });
        }
        let handle: RoomHandle = self.spawn(session);
        rooms.insert(key, handle.clone());
        Ok(handle)
    }

    /// Looks up the room for a session id.
    pub async fn get(&self, session_id: &str) -> Option<RoomHandle> {
        self.rooms.lock().await.get(session_id).cloned()
    }

    /// Restores rooms for every non-terminal checkpointed session.
    ///
    /// Each restored session resumes with the countdown that remained
    /// at its last checkpoint; terminal sessions are restored too so
    /// their snapshots, events and outcome stay queryable.
    pub async fn restore_all(&self) -> usize {
        let checkpoints = match self.store.list() {
            Ok(checkpoints) => checkpoints,
            Err(e) => {
                error!(error = %e, "Failed to enumerate session checkpoints");
                return 0;
            }
        };

        let now: OffsetDateTime = OffsetDateTime::now_utc();
        let mut rooms = self.rooms.lock().await;
        let mut restored: usize = 0;
        for checkpoint in checkpoints {
            let session: Session = checkpoint.restore(now);
            let key: String = session.id.value().to_string();
            if rooms.contains_key(&key) {
                continue;
            }
            info!(
                session_id = %key,
                status = %session.status,
                revision = session.revision,
                "Restoring session from checkpoint"
            );
            let handle: RoomHandle = self.spawn(session);
            rooms.insert(key, handle);
            restored += 1;
        }
        restored
    }

    fn spawn(&self, session: Session) -> RoomHandle {
        let (tx, rx) = mpsc::channel(COMMAND_QUEUE_SIZE);
        let (live, _) = broadcast::channel(EVENT_BUFFER_SIZE);
        let room: Room = Room {
            session,
            store: Arc::clone(&self.store),
            live: live.clone(),
        };
        tokio::spawn(room.run(rx));
        RoomHandle { tx, live }
    }
}
