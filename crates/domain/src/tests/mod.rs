// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

mod validation_tests;
mod visibility_tests;

use crate::{Item, ItemId, Participant, ParticipantId, UnitValue};
use time::OffsetDateTime;

pub(crate) fn uv(centavos: i64) -> UnitValue {
    UnitValue::from_centavos(centavos).unwrap()
}

pub(crate) fn at(unix: i64) -> OffsetDateTime {
    OffsetDateTime::from_unix_timestamp(unix).unwrap()
}

pub(crate) fn create_test_item() -> Item {
    Item::new(
        ItemId::new("item-1"),
        1,
        String::from("Computador Desktop Core i7, 16GB RAM, SSD 512GB"),
        50,
        String::from("UN"),
        Some(uv(450_000)),
        false,
    )
}

pub(crate) fn create_test_participant(id: &str, index: usize) -> Participant {
    Participant::new(
        ParticipantId::new(id),
        format!("Empresa {id} Ltda"),
        String::from("12.345.678/0001-90"),
        index,
    )
}
