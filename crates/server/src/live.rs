// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Live session streaming over WebSocket.
//!
//! Clients join a session room, receive the authoritative state and a
//! per-second countdown tick, and send bids, chat and auctioneer
//! actions as inbound frames. Business rejections are answered on the
//! submitting connection only and carry a stable error code, so the
//! frontend can tell "your bid was rejected for reason X" apart from a
//! connection problem; rejections are never broadcast.

use axum::{
    extract::{
        Path, State as AxumState, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures::{
    SinkExt,
    stream::{SplitSink, StreamExt},
};
use pregao::Command;
use pregao_api::{ApiError, MensagemView, SessaoSnapshot, project_message};
use pregao_domain::{ChatMessage, ItemId, ParticipantId, SenderKind};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::AppState;
use crate::room::RoomHandle;

/// Events fanned out to every subscriber of a session room.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LiveEvent {
    /// Full authoritative session state.
    EstadoSessao {
        /// The snapshot.
        estado: SessaoSnapshot,
    },
    /// Per-second countdown tick with the server-confirmed remaining
    /// time; clients render this value instead of trusting their own
    /// wall clock.
    Tick {
        /// Remaining seconds (zero while the random window runs).
        tempo_restante: i64,
        /// Whether the random closing window is active.
        em_tempo_aleatorio: bool,
    },
    /// A chat message was appended.
    NovaMensagem {
        /// The message.
        mensagem: MensagemView,
    },
}

impl LiveEvent {
    /// Builds a `NovaMensagem` event from a domain chat message.
    #[must_use]
    pub fn nova_mensagem(message: &ChatMessage) -> Self {
        Self::NovaMensagem {
            mensagem: project_message(message),
        }
    }
}

/// Frames sent to a single connection (never broadcast).
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum DirectMessage {
    /// Connection established; the session state follows.
    Connected {
        /// Server timestamp (ISO 8601).
        timestamp: String,
    },
    /// The submitted bid was accepted.
    LanceConfirmado {
        /// Sequence of the accepted bid within the item history.
        sequencia: u64,
        /// Accepted unit value in centavos.
        valor_centavos: i64,
        /// Session revision after the commit.
        revision: u64,
    },
    /// The submitted bid was rejected.
    ErroLance {
        /// Stable machine-readable code.
        code: String,
        /// Human-readable reason.
        message: String,
    },
    /// Any other request failed.
    Erro {
        /// Stable machine-readable code.
        code: String,
        /// Human-readable reason.
        message: String,
    },
}

/// Frames received from a client.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientMessage {
    /// Join the session room. Must be the first frame.
    EntrarSala {
        /// The joining participant (or auctioneer) identifier.
        participante_id: String,
        /// "PREGOEIRO" or "FORNECEDOR".
        tipo: String,
    },
    /// Submit a bid on the item currently in dispute.
    EnviarLance {
        /// Offered unit value in centavos.
        valor_centavos: i64,
    },
    /// Send a chat message.
    EnviarMensagem {
        /// Message body.
        texto: String,
    },
    /// Auctioneer: cancel a bid with a justification.
    CancelarLance {
        /// The item whose history holds the bid.
        item_id: String,
        /// The bid's sequence number.
        sequencia: u64,
        /// Why the bid is being canceled.
        justificativa: String,
    },
    /// Auctioneer: close the current item without waiting for the
    /// random window.
    EncerrarItem,
    /// Auctioneer: suspend the session.
    SuspenderSessao {
        /// Why the session is being suspended.
        motivo: String,
    },
    /// Auctioneer: resume a suspended session.
    RetomarSessao,
}

/// The role a connection declared when joining.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClientRole {
    Auctioneer,
    Supplier,
}

impl ClientRole {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "PREGOEIRO" => Some(Self::Auctioneer),
            "FORNECEDOR" => Some(Self::Supplier),
            _ => None,
        }
    }
}

/// Handles WebSocket upgrade requests for a session's live stream.
pub async fn live_session_handler(
    ws: WebSocketUpgrade,
    Path(session_id): Path<String>,
    AxumState(state): AxumState<AppState>,
) -> Response {
    let Some(room) = state.registry.get(&session_id).await else {
        return (StatusCode::NOT_FOUND, "session not found").into_response();
    };
    ws.on_upgrade(move |socket| handle_socket(socket, room))
}

async fn send_json<T: Serialize>(
    sender: &mut SplitSink<WebSocket, Message>,
    payload: &T,
) -> bool {
    match serde_json::to_string(payload) {
        Ok(json) => sender.send(Message::Text(json.into())).await.is_ok(),
        Err(e) => {
            warn!(error = %e, "Failed to serialize outbound frame");
            true
        }
    }
}

fn erro_lance(err: &ApiError) -> DirectMessage {
    DirectMessage::ErroLance {
        code: err.code().to_string(),
        message: err.to_string(),
    }
}

fn erro(err: &ApiError) -> DirectMessage {
    DirectMessage::Erro {
        code: err.code().to_string(),
        message: err.to_string(),
    }
}

fn forbidden(action: &str) -> DirectMessage {
    DirectMessage::Erro {
        code: String::from("FORBIDDEN"),
        message: format!("'{action}' is reserved to the pregoeiro"),
    }
}

/// Handles one live connection for the lifetime of the socket.
#[allow(clippy::too_many_lines)]
async fn handle_socket(socket: WebSocket, room: RoomHandle) {
    let (mut sender, mut receiver) = socket.split();

    let connected = DirectMessage::Connected {
        timestamp: OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Iso8601::DEFAULT)
            .unwrap_or_else(|_| String::from("unknown")),
    };
    if !send_json(&mut sender, &connected).await {
        return;
    }

    // The first frame must join the room.
    let (participant_id, role) = loop {
        match receiver.next().await {
            Some(Ok(Message::Text(text))) => {
                match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(ClientMessage::EntrarSala {
                        participante_id,
                        tipo,
                    }) => match ClientRole::parse(&tipo) {
                        Some(role) => break (ParticipantId::new(&participante_id), role),
                        None => {
                            let err = ApiError::Validation {
                                message: format!("unknown participant type '{tipo}'"),
                            };
                            let _ = send_json(&mut sender, &erro(&err)).await;
                            return;
                        }
                    },
                    Ok(_) | Err(_) => {
                        let err = ApiError::Validation {
                            message: String::from("first frame must be entrar_sala"),
                        };
                        let _ = send_json(&mut sender, &erro(&err)).await;
                        return;
                    }
                }
            }
            Some(Ok(Message::Close(_))) | None => return,
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                warn!(error = %e, "WebSocket receive error before join");
                return;
            }
        }
    };

    // Suppliers must be on the admitted list; the join marks presence.
    if role == ClientRole::Supplier {
        let joined = room
            .execute(
                Command::ConnectParticipant {
                    participant_id: participant_id.clone(),
                },
                None,
            )
            .await;
        if let Err(e) = joined {
            let _ = send_json(&mut sender, &erro(&e)).await;
            return;
        }
    }

    info!(participant = %participant_id, ?role, "Client joined live session");

    // Subscribe before the initial snapshot so no event is missed.
    let mut live = room.subscribe();
    let mut last_seen_revision: u64 = 0;

    match room.snapshot().await {
        Ok(estado) => {
            last_seen_revision = estado.revision;
            if !send_json(&mut sender, &LiveEvent::EstadoSessao { estado }).await {
                return;
            }
        }
        Err(e) => {
            let _ = send_json(&mut sender, &erro(&e)).await;
            return;
        }
    }

    loop {
        tokio::select! {
            event = live.recv() => {
                match event {
                    Ok(event) => {
                        if let LiveEvent::EstadoSessao { estado } = &event {
                            last_seen_revision = estado.revision;
                        }
                        if !send_json(&mut sender, &event).await {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        // Slow connection: skip the backlog and re-sync
                        // with a full snapshot.
                        debug!(skipped, "Subscriber lagged; re-syncing with snapshot");
                        match room.snapshot().await {
                            Ok(estado) => {
                                last_seen_revision = estado.revision;
                                if !send_json(&mut sender, &LiveEvent::EstadoSessao { estado }).await {
                                    break;
                                }
                            }
                            Err(_) => break,
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            frame = receiver.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        let parsed: Result<ClientMessage, _> = serde_json::from_str(&text);
                        let Ok(message) = parsed else {
                            let err = ApiError::Validation {
                                message: String::from("malformed frame"),
                            };
                            if !send_json(&mut sender, &erro(&err)).await {
                                break;
                            }
                            continue;
                        };
                        if !handle_client_message(
                            &room,
                            &mut sender,
                            &participant_id,
                            role,
                            last_seen_revision,
                            message,
                        )
                        .await
                        {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        debug!("Client closed live connection");
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!(error = %e, "WebSocket receive error");
                        break;
                    }
                }
            }
        }
    }

    if role == ClientRole::Supplier {
        let _ = room
            .execute(
                Command::DisconnectParticipant {
                    participant_id: participant_id.clone(),
                },
                None,
            )
            .await;
    }

    info!(participant = %participant_id, "Client left live session");
}

/// Dispatches one inbound frame. Returns `false` when the connection
/// should close.
async fn handle_client_message(
    room: &RoomHandle,
    sender: &mut SplitSink<WebSocket, Message>,
    participant_id: &ParticipantId,
    role: ClientRole,
    last_seen_revision: u64,
    message: ClientMessage,
) -> bool {
    match message {
        ClientMessage::EntrarSala { .. } => {
            // Already joined; ignore.
            true
        }
        ClientMessage::EnviarLance { valor_centavos } => {
            if role != ClientRole::Supplier {
                return send_json(sender, &forbidden("enviar_lance")).await;
            }
            let result = room
                .bid_on_current_item(
                    participant_id.clone(),
                    valor_centavos,
                    Some(last_seen_revision),
                )
                .await;
            match result {
                Ok(ack) => {
                    let confirmation = ack.accepted_bid.map_or(
                        DirectMessage::LanceConfirmado {
                            sequencia: 0,
                            valor_centavos,
                            revision: ack.revision,
                        },
                        |bid| DirectMessage::LanceConfirmado {
                            sequencia: bid.sequence,
                            valor_centavos: bid.unit_value.centavos(),
                            revision: ack.revision,
                        },
                    );
                    send_json(sender, &confirmation).await
                }
                Err(e) => send_json(sender, &erro_lance(&e)).await,
            }
        }
        ClientMessage::EnviarMensagem { texto } => {
            let command: Command = match role {
                ClientRole::Auctioneer => Command::SendChat {
                    sender: SenderKind::Auctioneer,
                    participant_id: None,
                    text: texto,
                },
                ClientRole::Supplier => Command::SendChat {
                    sender: SenderKind::Participant,
                    participant_id: Some(participant_id.clone()),
                    text: texto,
                },
            };
            match room.execute(command, None).await {
                Ok(_) => true,
                Err(e) => send_json(sender, &erro(&e)).await,
            }
        }
        ClientMessage::CancelarLance {
            item_id,
            sequencia,
            justificativa,
        } => {
            if role != ClientRole::Auctioneer {
                return send_json(sender, &forbidden("cancelar_lance")).await;
            }
            let command: Command = Command::CancelBid {
                item_id: ItemId::new(&item_id),
                sequence: sequencia,
                justification: justificativa,
            };
            match room.execute(command, None).await {
                Ok(_) => true,
                Err(e) => send_json(sender, &erro(&e)).await,
            }
        }
        ClientMessage::EncerrarItem => {
            if role != ClientRole::Auctioneer {
                return send_json(sender, &forbidden("encerrar_item")).await;
            }
            match room.execute(Command::CloseItem, None).await {
                Ok(_) => true,
                Err(e) => send_json(sender, &erro(&e)).await,
            }
        }
        ClientMessage::SuspenderSessao { motivo } => {
            if role != ClientRole::Auctioneer {
                return send_json(sender, &forbidden("suspender_sessao")).await;
            }
            match room.execute(Command::Pause { reason: motivo }, None).await {
                Ok(_) => true,
                Err(e) => send_json(sender, &erro(&e)).await,
            }
        }
        ClientMessage::RetomarSessao => {
            if role != ClientRole::Auctioneer {
                return send_json(sender, &forbidden("retomar_sessao")).await;
            }
            match room.execute(Command::Resume, None).await {
                Ok(_) => true,
                Err(e) => send_json(sender, &erro(&e)).await,
            }
        }
    }
}
