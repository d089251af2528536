// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use super::{at, proposal, started_session, test_request};
use crate::error::{ApiError, translate_core_error, translate_domain_error};
use crate::request_response::{PrepareSessionRequest, SessaoSnapshot, SessionConfigDto};
use crate::{prepare_session, project_snapshot, session_outcome};
use pregao::{Command, CoreError, Session, apply};
use pregao_domain::{DomainError, ItemId, ParticipantId, SessionStatus};

fn submit(session: &Session, supplier: &str, centavos: i64, unix: i64) -> Session {
    apply(
        session,
        Command::SubmitBid {
            item_id: ItemId::new("item-1"),
            participant_id: ParticipantId::new(supplier),
            unit_centavos: centavos,
        },
        at(unix),
    )
    .unwrap()
    .new_session
}

// ============================================================================
// Session preparation
// ============================================================================

#[test]
fn test_prepare_admits_only_classified_proposals() {
    let session: Session = prepare_session("sessao-1", test_request(), at(900)).unwrap();

    assert_eq!(session.participants.len(), 2);
    assert!(session.participant(&ParticipantId::new("f-a")).is_some());
    assert!(session.participant(&ParticipantId::new("f-b")).is_some());
    assert!(session.participant(&ParticipantId::new("f-c")).is_none());
}

#[test]
fn test_prepare_assigns_labels_by_ascending_proposal_value() {
    // f-a proposed 90k, f-b 95k: f-a takes "Fornecedor A".
    let session: Session = prepare_session("sessao-1", test_request(), at(900)).unwrap();

    assert_eq!(
        session.participant(&ParticipantId::new("f-a")).unwrap().label,
        "Fornecedor A"
    );
    assert_eq!(
        session.participant(&ParticipantId::new("f-b")).unwrap().label,
        "Fornecedor B"
    );
}

#[test]
fn test_prepare_fails_without_classified_proposals() {
    let mut request: PrepareSessionRequest = test_request();
    request.propostas = vec![proposal("f-c", "Gama", 8_000_000, "DESCLASSIFICADA")];

    let result = prepare_session("sessao-1", request, at(900));
    assert!(matches!(result, Err(ApiError::Validation { .. })));
}

#[test]
fn test_prepare_fails_without_items() {
    let mut request: PrepareSessionRequest = test_request();
    request.itens.clear();

    let result = prepare_session("sessao-1", request, at(900));
    assert!(matches!(result, Err(ApiError::Validation { .. })));
}

#[test]
fn test_prepare_rejects_unknown_dispute_mode() {
    let mut request: PrepareSessionRequest = test_request();
    request.configuracao = Some(SessionConfigDto {
        modo_disputa: String::from("HIBRIDO"),
        tempo_inatividade: 180,
        tempo_aleatorio_min: 2,
        tempo_aleatorio_max: 30,
        intervalo_min_lances: 3,
        decremento_minimo_bps: 50,
    });

    let result = prepare_session("sessao-1", request, at(900));
    assert!(matches!(result, Err(ApiError::Validation { .. })));
}

#[test]
fn test_prepare_rejects_non_positive_reference_value() {
    let mut request: PrepareSessionRequest = test_request();
    request.itens[0].valor_referencia_centavos = Some(0);

    let result = prepare_session("sessao-1", request, at(900));
    assert!(matches!(result, Err(ApiError::Validation { .. })));
}

// ============================================================================
// Snapshot projection
// ============================================================================

#[test]
fn test_snapshot_anonymizes_identities_while_running() {
    let session: Session = started_session();
    let session: Session = submit(&session, "f-a", 95_000, 1_010);

    let snapshot: SessaoSnapshot = project_snapshot(&session, at(1_020));

    assert_eq!(snapshot.status, "Running");
    assert_eq!(snapshot.lances.len(), 1);
    assert_eq!(snapshot.lances[0].fornecedor_nome_exibicao, "Fornecedor A");
    assert!(
        snapshot
            .participantes
            .iter()
            .all(|p| p.nome_exibicao.starts_with("Fornecedor "))
    );
}

#[test]
fn test_snapshot_reveals_identities_after_closure() {
    let session: Session = started_session();
    let session: Session = submit(&session, "f-a", 95_000, 1_010);
    let session: Session = apply(&session, Command::CloseItem, at(1_050)).unwrap().new_session;
    let session: Session = apply(&session, Command::CloseItem, at(1_100)).unwrap().new_session;
    assert_eq!(session.status, SessionStatus::Closed);

    let snapshot: SessaoSnapshot = project_snapshot(&session, at(1_200));

    assert!(
        snapshot
            .participantes
            .iter()
            .any(|p| p.nome_exibicao == "Alfa Informática Ltda")
    );
}

#[test]
fn test_snapshot_reports_server_confirmed_countdown() {
    let session: Session = started_session();

    let snapshot: SessaoSnapshot = project_snapshot(&session, at(1_030));

    assert_eq!(snapshot.tempo_restante, 150);
    assert!(!snapshot.em_tempo_aleatorio);
    assert_eq!(snapshot.item_atual_id.as_deref(), Some("item-1"));
}

#[test]
fn test_snapshot_hides_countdown_during_random_window() {
    let session: Session = started_session();
    let session: Session = apply(
        &session,
        Command::InactivityElapsed {
            closing_delay_secs: 300,
        },
        at(1_180),
    )
    .unwrap()
    .new_session;

    let snapshot: SessaoSnapshot = project_snapshot(&session, at(1_200));

    // Only the fact that the window is active is disclosed.
    assert!(snapshot.em_tempo_aleatorio);
    assert_eq!(snapshot.tempo_restante, 0);
}

#[test]
fn test_snapshot_melhor_lance_is_rank_one() {
    let session: Session = started_session();
    let session: Session = submit(&session, "f-a", 95_000, 1_010);
    let session: Session = submit(&session, "f-b", 94_000, 1_020);

    let snapshot: SessaoSnapshot = project_snapshot(&session, at(1_030));

    let melhor = snapshot.melhor_lance.unwrap();
    assert_eq!(melhor.posicao, 1);
    assert_eq!(melhor.valor_centavos, 94_000);
    assert_eq!(melhor.fornecedor_id, "f-b");
    assert_eq!(snapshot.lances[1].posicao, 2);
}

#[test]
fn test_snapshot_withholds_sealed_reference_until_closure() {
    let mut request: PrepareSessionRequest = test_request();
    request.itens[0].sigilo_orcamento = true;
    let session: Session = prepare_session("sessao-1", request, at(900)).unwrap();
    let session: Session = apply(&session, Command::Start, at(1_000)).unwrap().new_session;

    let snapshot: SessaoSnapshot = project_snapshot(&session, at(1_010));
    assert_eq!(snapshot.itens[0].valor_referencia_centavos, None);
    // The unsealed item still shows its reference.
    assert_eq!(snapshot.itens[1].valor_referencia_centavos, Some(85_000));

    let session: Session = apply(&session, Command::CloseItem, at(1_050)).unwrap().new_session;
    let session: Session = apply(&session, Command::CloseItem, at(1_100)).unwrap().new_session;
    let snapshot: SessaoSnapshot = project_snapshot(&session, at(1_200));
    assert_eq!(snapshot.itens[0].valor_referencia_centavos, Some(100_000));
}

#[test]
fn test_snapshot_serializes_in_client_contract_shape() {
    let session: Session = started_session();
    let snapshot: SessaoSnapshot = project_snapshot(&session, at(1_010));

    let json: serde_json::Value = serde_json::to_value(&snapshot).unwrap();

    assert!(json.get("tempoRestante").is_some());
    assert!(json.get("emTempoAleatorio").is_some());
    assert!(json.get("itemAtualId").is_some());
    assert!(json.get("melhorLance").is_some());
    assert!(json.get("participantes").is_some());
    assert!(json.get("mensagens").is_some());
}

// ============================================================================
// Session outcome
// ============================================================================

#[test]
fn test_outcome_requires_closed_session() {
    let session: Session = started_session();

    let result = session_outcome(&session);
    assert!(matches!(result, Err(ApiError::InvalidState { .. })));
}

#[test]
fn test_outcome_reveals_final_ranking_per_item() {
    let session: Session = started_session();
    let session: Session = submit(&session, "f-a", 95_000, 1_010);
    let session: Session = submit(&session, "f-b", 94_000, 1_020);
    let session: Session = apply(&session, Command::CloseItem, at(1_050)).unwrap().new_session;
    let session: Session = apply(&session, Command::CloseItem, at(1_100)).unwrap().new_session;

    let outcome = session_outcome(&session).unwrap();

    assert_eq!(outcome.itens.len(), 2);
    let first = &outcome.itens[0];
    assert_eq!(first.classificacao_final.len(), 2);
    assert_eq!(first.classificacao_final[0].fornecedor_id, "f-b");
    assert_eq!(first.classificacao_final[0].razao_social, "Beta Suprimentos SA");
    assert_eq!(first.classificacao_final[0].melhor_valor_centavos, 94_000);
    assert_eq!(first.classificacao_final[0].posicao, 1);
    // 950 vs 940 is a ~1% spread: inside the ME/EPP band.
    assert!(first.empate_ficto);
    // Item 2 closed without bids.
    assert!(outcome.itens[1].classificacao_final.is_empty());
    assert!(!outcome.itens[1].empate_ficto);
}

// ============================================================================
// Error translation
// ============================================================================

#[test]
fn test_unknown_participant_translates_to_forbidden() {
    let err: ApiError = translate_domain_error(DomainError::UnknownParticipant {
        participant_id: String::from("intruso"),
    });

    assert!(matches!(err, ApiError::Forbidden { .. }));
    assert_eq!(err.code(), "FORBIDDEN");
}

#[test]
fn test_stale_deadline_translates_to_conflict() {
    let err: ApiError = translate_core_error(CoreError::StaleDeadline {
        action: "ClosingElapsed",
    });

    assert!(matches!(err, ApiError::Conflict { .. }));
    assert_eq!(err.code(), "CONFLICT");
}

#[test]
fn test_business_rejections_keep_distinct_codes() {
    let session: Session = started_session();
    let session: Session = submit(&session, "f-a", 95_000, 1_010);

    let err: CoreError = apply(
        &session,
        Command::SubmitBid {
            item_id: ItemId::new("item-1"),
            participant_id: ParticipantId::new("f-a"),
            unit_centavos: 95_100,
        },
        at(1_020),
    )
    .unwrap_err();

    let api_err: ApiError = translate_core_error(err);
    assert_eq!(api_err.code(), "NOT_IMPROVED");
}

#[test]
fn test_ceiling_violation_translates_to_not_improved() {
    let err: ApiError = translate_domain_error(DomainError::AboveReferenceCeiling {
        attempted: pregao_domain::UnitValue::from_centavos(110_000).unwrap(),
        reference: pregao_domain::UnitValue::from_centavos(100_000).unwrap(),
    });

    assert_eq!(err.code(), "NOT_IMPROVED");
}
