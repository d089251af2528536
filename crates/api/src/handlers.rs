// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! API handler functions: session preparation, snapshot projection and
//! outcome extraction.

use crate::error::{ApiError, translate_domain_error};
use crate::request_response::{
    FinalRankingEntry, ItemOutcome, ItemView, LanceView, MensagemView, ParticipanteView,
    PrepareSessionRequest, PreparedProposal, SessaoSnapshot, SessionOutcome,
};
use pregao::Session;
use pregao_domain::{
    ChatMessage, FICTIONAL_TIE_TOLERANCE_BPS, Item, ItemId, Participant, ParticipantId,
    SessionConfig, SessionId, SessionStatus, UnitValue, VisibilityPolicy, fictional_tie, rank_for,
};
use time::OffsetDateTime;
use time::macros::format_description;
use tracing::debug;

/// Proposal statuses admitted into the dispute.
const CLASSIFIED_STATUSES: [&str; 3] = ["ENVIADA", "VALIDA", "CLASSIFICADA"];

/// Formats a unix timestamp as "HH:MM:SS" UTC for display.
fn format_horario(unix: i64) -> String {
    OffsetDateTime::from_unix_timestamp(unix)
        .ok()
        .and_then(|t| {
            t.format(format_description!("[hour]:[minute]:[second]"))
                .ok()
        })
        .unwrap_or_else(|| String::from("00:00:00"))
}

/// Builds a session from the CRUD layer's preparation handoff.
///
/// Only proposals in an accepted/classified status are admitted as
/// participants; anonymized labels are assigned in ascending order of
/// the proposed total value, matching the pre-dispute proposal ranking.
///
/// # Arguments
///
/// * `session_id` - Identifier for the new session
/// * `request` - The preparation handoff
/// * `now` - The creation instant
///
/// # Errors
///
/// Returns a validation error if the configuration is invalid, no item
/// was handed over, no proposal is classified, or a monetary value is
/// not strictly positive.
pub fn prepare_session(
    session_id: &str,
    request: PrepareSessionRequest,
    now: OffsetDateTime,
) -> Result<Session, ApiError> {
    let config: SessionConfig = match request.configuracao {
        Some(dto) => dto.into_config()?,
        None => SessionConfig::default(),
    };

    let mut admitted: Vec<&PreparedProposal> = request
        .propostas
        .iter()
        .filter(|p| CLASSIFIED_STATUSES.contains(&p.status.as_str()))
        .collect();
    admitted.sort_by_key(|p| p.valor_total_centavos);

    debug!(
        licitacao_id = %request.licitacao_id,
        total = request.propostas.len(),
        admitted = admitted.len(),
        "Admitting classified proposals"
    );

    let participants: Vec<Participant> = admitted
        .iter()
        .enumerate()
        .map(|(index, p)| {
            Participant::new(
                ParticipantId::new(&p.fornecedor_id),
                p.razao_social.clone(),
                p.cnpj.clone(),
                index,
            )
        })
        .collect();

    let items: Vec<Item> = request
        .itens
        .iter()
        .map(|i| {
            let reference_value: Option<UnitValue> = match i.valor_referencia_centavos {
                Some(centavos) => Some(
                    UnitValue::from_centavos(centavos).map_err(translate_domain_error)?,
                ),
                None => None,
            };
            Ok(Item::new(
                ItemId::new(&i.id),
                i.numero,
                i.descricao.clone(),
                i.quantidade,
                i.unidade.clone(),
                reference_value,
                i.sigilo_orcamento,
            ))
        })
        .collect::<Result<Vec<Item>, ApiError>>()?;

    Session::create(
        SessionId::new(session_id),
        request.licitacao_id,
        request.pregoeiro_nome,
        config,
        participants,
        items,
        now,
    )
    .map_err(translate_domain_error)
}

/// Projects a single chat message for the wire.
#[must_use]
pub fn project_message(message: &ChatMessage) -> MensagemView {
    MensagemView {
        sequencia: message.sequence,
        remetente: message.sender_label.clone(),
        mensagem: message.text.clone(),
        horario: format_horario(message.sent_at_unix),
        tipo: String::from(message.sender.as_str()),
    }
}

/// Projects a session snapshot for the wire.
///
/// Participant identity passes through the session's visibility policy:
/// anonymized labels during the dispute, real names once the session is
/// closed. While the random window runs, `tempoRestante` is zero — the
/// drawn closing instant is never disclosed.
#[must_use]
pub fn project_snapshot(session: &Session, now: OffsetDateTime) -> SessaoSnapshot {
    let policy: VisibilityPolicy = VisibilityPolicy::for_status(session.status);
    let reveal_reference: bool = policy.can_reveal();

    let itens: Vec<ItemView> = session
        .items
        .iter()
        .map(|item| ItemView {
            id: item.id.value().to_string(),
            numero: item.number,
            descricao: item.description.clone(),
            quantidade: item.quantity,
            unidade: item.unit.clone(),
            valor_referencia_centavos: if item.sealed_reference && !reveal_reference {
                None
            } else {
                item.reference_value.map(|v| v.centavos())
            },
            status: item.status.to_string(),
        })
        .collect();

    let lances: Vec<LanceView> = session
        .current_item_index
        .map(|index| {
            rank_for(&session.items[index], session.bids_for(index))
                .into_iter()
                .map(|standing| {
                    let display: String = session
                        .participant(&standing.participant_id)
                        .map_or_else(
                            || standing.participant_id.to_string(),
                            |p| policy.display_name(p).to_string(),
                        );
                    LanceView {
                        fornecedor_id: standing.participant_id.to_string(),
                        fornecedor_nome_exibicao: display,
                        valor_centavos: standing.best_unit_value.centavos(),
                        valor_total_centavos: standing.best_total_value,
                        horario: format_horario(standing.best_bid_at_unix),
                        posicao: standing.rank,
                    }
                })
                .collect()
        })
        .unwrap_or_default();

    let mensagens: Vec<MensagemView> = session.chat.iter().map(project_message).collect();

    let participantes: Vec<ParticipanteView> = session
        .participants
        .iter()
        .map(|p| ParticipanteView {
            id: p.id.value().to_string(),
            nome_exibicao: policy.display_name(p).to_string(),
            online: p.online,
        })
        .collect();

    SessaoSnapshot {
        sessao_id: session.id.value().to_string(),
        licitacao_id: session.bidding_id.clone(),
        pregoeiro_nome: session.auctioneer_name.clone(),
        status: session.status.to_string(),
        revision: session.revision,
        item_atual_id: session.current_item().map(|i| i.id.value().to_string()),
        tempo_restante: session.disclosed_remaining_secs(now),
        em_tempo_aleatorio: session.in_random_window(),
        melhor_lance: lances.first().cloned(),
        itens,
        lances,
        mensagens,
        participantes,
    }
}

/// Extracts the final per-item ranking of a closed session.
///
/// Identities are revealed here: closure is the post-dispute phase.
///
/// # Errors
///
/// Returns an `InvalidState` error unless the session is `Closed`.
pub fn session_outcome(session: &Session) -> Result<SessionOutcome, ApiError> {
    if session.status != SessionStatus::Closed {
        return Err(ApiError::InvalidState {
            action: String::from("SessionOutcome"),
            message: format!("session is {}", session.status),
        });
    }

    let itens: Vec<ItemOutcome> = session
        .items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let standings = rank_for(item, session.bids_for(index));
            let classificacao_final: Vec<FinalRankingEntry> = standings
                .iter()
                .map(|standing| {
                    let razao_social: String = session
                        .participant(&standing.participant_id)
                        .map_or_else(
                            || standing.participant_id.to_string(),
                            |p| p.name.clone(),
                        );
                    FinalRankingEntry {
                        fornecedor_id: standing.participant_id.to_string(),
                        razao_social,
                        melhor_valor_centavos: standing.best_unit_value.centavos(),
                        posicao: standing.rank,
                    }
                })
                .collect();
            ItemOutcome {
                item_id: item.id.value().to_string(),
                numero: item.number,
                empate_ficto: fictional_tie(&standings, FICTIONAL_TIE_TOLERANCE_BPS),
                classificacao_final,
            }
        })
        .collect();

    Ok(SessionOutcome {
        sessao_id: session.id.value().to_string(),
        licitacao_id: session.bidding_id.clone(),
        itens,
    })
}
