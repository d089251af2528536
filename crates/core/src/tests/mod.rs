// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.


use crate::{Command, Session, apply};
use pregao_domain::{
    Item, ItemId, Participant, ParticipantId, SessionConfig, SessionId, UnitValue,
};
use time::OffsetDateTime;

pub(crate) fn at(unix: i64) -> OffsetDateTime {
    OffsetDateTime::from_unix_timestamp(unix).unwrap()
}

pub(crate) fn uv(centavos: i64) -> UnitValue {
    UnitValue::from_centavos(centavos).unwrap()
}

/// Config with the per-bid interval and decrement checks disabled so
/// tests can submit tightly spaced bids; tests for those rules set
/// their own config.
pub(crate) fn test_config() -> SessionConfig {
    SessionConfig {
        min_bid_interval_secs: 0,
        min_decrement_bps: 0,
        ..SessionConfig::default()
    }
}

pub(crate) fn test_items() -> Vec<Item> {
    vec![
        Item::new(
            ItemId::new("item-1"),
            1,
            String::from("Computador Desktop Core i7"),
            1,
            String::from("UN"),
            Some(uv(100_000)),
            false,
        ),
        Item::new(
            ItemId::new("item-2"),
            2,
            String::from("Monitor LED 24 polegadas"),
            50,
            String::from("UN"),
            Some(uv(85_000)),
            false,
        ),
    ]
}

pub(crate) fn test_participants() -> Vec<Participant> {
    vec![
        Participant::new(
            ParticipantId::new("f-a"),
            String::from("Alfa Informática Ltda"),
            String::from("11.111.111/0001-11"),
            0,
        ),
        Participant::new(
            ParticipantId::new("f-b"),
            String::from("Beta Suprimentos SA"),
            String::from("22.222.222/0001-22"),
            1,
        ),
    ]
}

pub(crate) fn create_test_session(config: SessionConfig) -> Session {
    Session::create(
        SessionId::new("sessao-1"),
        String::from("licitacao-1"),
        String::from("Maria Silva"),
        config,
        test_participants(),
        test_items(),
        at(900),
    )
    .unwrap()
}

/// A session started at t=1000 (item 1 open, deadline t=1180).
pub(crate) fn started_session() -> Session {
    let session: Session = create_test_session(test_config());
    apply(&session, Command::Start, at(1_000)).unwrap().new_session
}

pub(crate) fn submit(
    session: &Session,
    item: &str,
    supplier: &str,
    centavos: i64,
    unix: i64,
) -> Result<crate::TransitionResult, crate::CoreError> {
    apply(
        session,
        Command::SubmitBid {
            item_id: ItemId::new(item),
            participant_id: ParticipantId::new(supplier),
            unit_centavos: centavos,
        },
        at(unix),
    )
}
