// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! API request and response data transfer objects.
//!
//! These DTOs are distinct from domain types and serialize in the
//! camelCase shape the session frontend consumes.

use crate::error::ApiError;
use pregao_domain::{DisputeMode, SessionConfig};
use serde::{Deserialize, Serialize};

/// The preparation handoff from the procurement CRUD layer.
///
/// Items and classified proposals are collected by the preparation
/// workflow; this core only disputes them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrepareSessionRequest {
    /// The bidding process identifier.
    pub licitacao_id: String,
    /// Name of the pregoeiro who will conduct the session.
    pub pregoeiro_nome: String,
    /// Items to dispute, in order.
    pub itens: Vec<PreparedItem>,
    /// Proposals received for the bidding process. Only accepted or
    /// classified proposals are admitted as participants.
    pub propostas: Vec<PreparedProposal>,
    /// Optional configuration overrides; defaults apply otherwise.
    #[serde(default)]
    pub configuracao: Option<SessionConfigDto>,
}

/// One item as handed over by the CRUD layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreparedItem {
    /// Item identifier.
    pub id: String,
    /// Sequence number (1-based).
    pub numero: u32,
    /// Short description.
    pub descricao: String,
    /// Quantity being procured.
    pub quantidade: u32,
    /// Unit of measure.
    pub unidade: String,
    /// Estimated reference unit value in centavos, if published.
    pub valor_referencia_centavos: Option<i64>,
    /// Sigilo de orçamento flag.
    #[serde(default)]
    pub sigilo_orcamento: bool,
}

/// One proposal as handed over by the CRUD layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreparedProposal {
    /// Supplier identifier.
    pub fornecedor_id: String,
    /// Supplier company name.
    pub razao_social: String,
    /// Supplier CNPJ.
    pub cnpj: String,
    /// Proposed total value in centavos.
    pub valor_total_centavos: i64,
    /// Proposal status in the CRUD workflow (e.g. "CLASSIFICADA").
    pub status: String,
}

/// Dispute configuration as carried on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfigDto {
    /// Dispute mode ("ABERTO" or "FECHADO").
    pub modo_disputa: String,
    /// Inactivity countdown in seconds.
    pub tempo_inatividade: u32,
    /// Random window lower bound in minutes.
    pub tempo_aleatorio_min: u32,
    /// Random window upper bound in minutes.
    pub tempo_aleatorio_max: u32,
    /// Minimum interval between a participant's own bids, in seconds.
    pub intervalo_min_lances: u32,
    /// Minimum decrement in basis points.
    pub decremento_minimo_bps: u32,
}

impl SessionConfigDto {
    /// Converts the wire configuration into the domain configuration.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the dispute mode is unknown.
    pub fn into_config(self) -> Result<SessionConfig, ApiError> {
        let dispute_mode: DisputeMode =
            DisputeMode::parse(&self.modo_disputa).map_err(|e| ApiError::Validation {
                message: e.to_string(),
            })?;
        Ok(SessionConfig {
            dispute_mode,
            inactivity_timeout_secs: self.tempo_inatividade,
            random_window_min_minutes: self.tempo_aleatorio_min,
            random_window_max_minutes: self.tempo_aleatorio_max,
            min_bid_interval_secs: self.intervalo_min_lances,
            min_decrement_bps: self.decremento_minimo_bps,
        })
    }
}

/// The full session snapshot pushed to clients.
///
/// `tempoRestante` is the server-confirmed remaining countdown; while
/// the random window is active it is always zero so the drawn closing
/// instant is never disclosed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessaoSnapshot {
    /// Session identifier.
    pub sessao_id: String,
    /// The bidding process identifier.
    pub licitacao_id: String,
    /// Name of the conducting pregoeiro.
    pub pregoeiro_nome: String,
    /// Session status string.
    pub status: String,
    /// Monotonic revision of the underlying state.
    pub revision: u64,
    /// Identifier of the item currently in dispute.
    pub item_atual_id: Option<String>,
    /// Server-confirmed remaining seconds on the inactivity countdown.
    pub tempo_restante: i64,
    /// Whether the random closing window is active.
    pub em_tempo_aleatorio: bool,
    /// All items with their dispute status.
    pub itens: Vec<ItemView>,
    /// Standings of the current item, rank 1 first.
    pub lances: Vec<LanceView>,
    /// The current leader (melhor lance), if any bid was placed.
    pub melhor_lance: Option<LanceView>,
    /// Full chat log.
    pub mensagens: Vec<MensagemView>,
    /// Admitted participants with presence.
    pub participantes: Vec<ParticipanteView>,
}

/// One item as shown in the snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemView {
    /// Item identifier.
    pub id: String,
    /// Sequence number.
    pub numero: u32,
    /// Short description.
    pub descricao: String,
    /// Quantity being procured.
    pub quantidade: u32,
    /// Unit of measure.
    pub unidade: String,
    /// Reference unit value in centavos. Withheld while the budget is
    /// sealed and the session has not concluded.
    pub valor_referencia_centavos: Option<i64>,
    /// Dispute status string.
    pub status: String,
}

/// One standing as shown in the snapshot ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LanceView {
    /// Supplier identifier (clients use it to find their own row).
    pub fornecedor_id: String,
    /// Display name under the session's visibility policy.
    pub fornecedor_nome_exibicao: String,
    /// Best unit value in centavos.
    pub valor_centavos: i64,
    /// Best total value in centavos (unit × item quantity).
    pub valor_total_centavos: i64,
    /// Submission time of the best bid, "HH:MM:SS" UTC.
    pub horario: String,
    /// 1-based rank.
    pub posicao: usize,
}

/// One chat message as shown in the snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MensagemView {
    /// Sequence within the chat log.
    pub sequencia: u64,
    /// Sender display label.
    pub remetente: String,
    /// Message body.
    pub mensagem: String,
    /// Send time, "HH:MM:SS" UTC.
    pub horario: String,
    /// Sender kind tag ("PREGOEIRO", "FORNECEDOR" or "SISTEMA"),
    /// used by clients to highlight auctioneer messages.
    pub tipo: String,
}

/// One participant as shown in the snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipanteView {
    /// Supplier identifier.
    pub id: String,
    /// Display name under the session's visibility policy.
    pub nome_exibicao: String,
    /// Whether the participant holds a live connection.
    pub online: bool,
}

/// Final result handed back to the procurement workflow once the
/// session closes, consumed by habilitação and adjudication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionOutcome {
    /// Session identifier.
    pub sessao_id: String,
    /// The bidding process identifier.
    pub licitacao_id: String,
    /// Per-item final results.
    pub itens: Vec<ItemOutcome>,
}

/// Final result of one item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemOutcome {
    /// Item identifier.
    pub item_id: String,
    /// Item sequence number.
    pub numero: u32,
    /// Final ranking, rank 1 first. Empty when no bids were placed.
    pub classificacao_final: Vec<FinalRankingEntry>,
    /// Whether the runner-up sits within the ME/EPP fictional-tie band.
    pub empate_ficto: bool,
}

/// One entry of an item's final ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalRankingEntry {
    /// Supplier identifier.
    pub fornecedor_id: String,
    /// Supplier company name (identities are revealed at closure).
    pub razao_social: String,
    /// Best unit value in centavos.
    pub melhor_valor_centavos: i64,
    /// 1-based rank.
    pub posicao: usize,
}
