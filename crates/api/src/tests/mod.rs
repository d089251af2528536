// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

mod api_tests;

use crate::request_response::{PrepareSessionRequest, PreparedItem, PreparedProposal};
use pregao::{Command, Session, apply};
use time::OffsetDateTime;

pub(crate) fn at(unix: i64) -> OffsetDateTime {
    OffsetDateTime::from_unix_timestamp(unix).unwrap()
}

pub(crate) fn proposal(id: &str, name: &str, total: i64, status: &str) -> PreparedProposal {
    PreparedProposal {
        fornecedor_id: id.to_string(),
        razao_social: name.to_string(),
        cnpj: String::from("12.345.678/0001-90"),
        valor_total_centavos: total,
        status: status.to_string(),
    }
}

pub(crate) fn test_request() -> PrepareSessionRequest {
    PrepareSessionRequest {
        licitacao_id: String::from("licitacao-1"),
        pregoeiro_nome: String::from("Maria Silva"),
        itens: vec![
            PreparedItem {
                id: String::from("item-1"),
                numero: 1,
                descricao: String::from("Computador Desktop Core i7"),
                quantidade: 1,
                unidade: String::from("UN"),
                valor_referencia_centavos: Some(100_000),
                sigilo_orcamento: false,
            },
            PreparedItem {
                id: String::from("item-2"),
                numero: 2,
                descricao: String::from("Monitor LED 24 polegadas"),
                quantidade: 50,
                unidade: String::from("UN"),
                valor_referencia_centavos: Some(85_000),
                sigilo_orcamento: false,
            },
        ],
        propostas: vec![
            proposal("f-a", "Alfa Informática Ltda", 9_000_000, "CLASSIFICADA"),
            proposal("f-b", "Beta Suprimentos SA", 9_500_000, "VALIDA"),
            proposal("f-c", "Gama Comércio ME", 8_000_000, "DESCLASSIFICADA"),
        ],
        configuracao: None,
    }
}

/// A prepared and started session; f-a holds "Fornecedor A".
pub(crate) fn started_session() -> Session {
    let session: Session =
        crate::prepare_session("sessao-1", test_request(), at(900)).unwrap();
    apply(&session, Command::Start, at(1_000)).unwrap().new_session
}
