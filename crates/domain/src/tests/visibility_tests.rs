// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use super::create_test_participant;
use crate::{Participant, SessionStatus, VisibilityPolicy};

#[test]
fn test_identities_hidden_while_dispute_in_progress() {
    for status in [
        SessionStatus::NotStarted,
        SessionStatus::Running,
        SessionStatus::Paused,
    ] {
        let policy: VisibilityPolicy = VisibilityPolicy::for_status(status);
        assert!(!policy.can_reveal(), "must not reveal during {status}");
    }
}

#[test]
fn test_identities_revealed_after_normal_completion() {
    let policy: VisibilityPolicy = VisibilityPolicy::for_status(SessionStatus::Closed);
    assert!(policy.can_reveal());
}

#[test]
fn test_aborted_session_never_reveals() {
    let policy: VisibilityPolicy = VisibilityPolicy::for_status(SessionStatus::Aborted);
    assert!(!policy.can_reveal());
}

#[test]
fn test_display_name_follows_policy() {
    let participant: Participant = create_test_participant("f-1", 0);

    let anonymized: VisibilityPolicy = VisibilityPolicy::for_status(SessionStatus::Running);
    assert_eq!(anonymized.display_name(&participant), "Fornecedor A");

    let revealed: VisibilityPolicy = VisibilityPolicy::for_status(SessionStatus::Closed);
    assert_eq!(revealed.display_name(&participant), "Empresa f-1 Ltda");
}
