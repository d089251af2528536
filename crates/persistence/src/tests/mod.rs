// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use crate::{
    CheckpointStore, FileCheckpointStore, MemoryCheckpointStore, SessionCheckpoint,
};
use pregao::{Command, Session, TimerState, apply};
use pregao_domain::{
    Item, ItemId, Participant, ParticipantId, SessionConfig, SessionId,
    UnitValue,
};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use time::OffsetDateTime;

static TEST_DIR_COUNTER: AtomicU64 = AtomicU64::new(0);

fn at(unix: i64) -> OffsetDateTime {
    OffsetDateTime::from_unix_timestamp(unix).unwrap()
}

fn test_dir() -> PathBuf {
    let unique: u64 = TEST_DIR_COUNTER.fetch_add(1, Ordering::SeqCst);
    std::env::temp_dir().join(format!(
        "pregao-checkpoint-test-{}-{unique}",
        std::process::id()
    ))
}

fn started_session() -> Session {
    let session: Session = Session::create(
        SessionId::new("sessao-1"),
        String::from("licitacao-1"),
        String::from("Maria Silva"),
        SessionConfig {
            min_bid_interval_secs: 0,
            min_decrement_bps: 0,
            ..SessionConfig::default()
        },
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
        ],
        vec![Item::new(
            ItemId::new("item-1"),
            1,
            String::from("Computador Desktop Core i7"),
            1,
            String::from("UN"),
            Some(UnitValue::from_centavos(100_000).unwrap()),
            false,
        )],
        at(900),
    )
    .unwrap();
    apply(&session, Command::Start, at(1_000)).unwrap().new_session
}

#[test]
fn test_capture_records_remaining_countdown() {
    // Started at t=1000 (deadline 1180); captured at t=1100.
    let session: Session = started_session();

    let checkpoint: SessionCheckpoint = SessionCheckpoint::capture(&session, at(1_100));

    assert_eq!(checkpoint.remaining_secs, Some(80));
    assert!(!checkpoint.in_random_window);
    assert_eq!(checkpoint.captured_at_unix, 1_100);
}

#[test]
fn test_restore_rearms_countdown_after_downtime() {
    let session: Session = started_session();
    let checkpoint: SessionCheckpoint = SessionCheckpoint::capture(&session, at(1_100));

    // One hour of downtime must not consume the 80 remaining seconds.
    let restored: Session = checkpoint.restore(at(4_700));

    assert_eq!(
        restored.timer,
        TimerState::Inactivity {
            deadline_unix: 4_780
        }
    );
    assert_eq!(restored.revision, session.revision);
    assert_eq!(restored.bids, session.bids);
}

#[test]
fn test_restore_preserves_random_window_draw() {
    let session: Session = started_session();
    let windowed: Session = apply(
        &session,
        Command::InactivityElapsed {
            closing_delay_secs: 300,
        },
        at(1_180),
    )
    .unwrap()
    .new_session;

    let checkpoint: SessionCheckpoint = SessionCheckpoint::capture(&windowed, at(1_280));
    assert_eq!(checkpoint.remaining_secs, Some(200));
    assert!(checkpoint.in_random_window);

    // The original draw survives the restart; no re-draw, no item
    // re-opening.
    let restored: Session = checkpoint.restore(at(9_000));
    assert_eq!(
        restored.timer,
        TimerState::RandomWindow {
            deadline_unix: 9_200
        }
    );
    assert!(restored.in_random_window());
}

#[test]
fn test_memory_store_round_trip() {
    let store: MemoryCheckpointStore = MemoryCheckpointStore::new();
    let session: Session = started_session();
    let checkpoint: SessionCheckpoint = SessionCheckpoint::capture(&session, at(1_100));

    store.save(&checkpoint).unwrap();

    let loaded: SessionCheckpoint = store.load(&SessionId::new("sessao-1")).unwrap().unwrap();
    assert_eq!(loaded, checkpoint);

    assert_eq!(store.list().unwrap().len(), 1);
    store.remove(&SessionId::new("sessao-1")).unwrap();
    assert!(store.load(&SessionId::new("sessao-1")).unwrap().is_none());
}

#[test]
fn test_file_store_round_trip() {
    let dir: PathBuf = test_dir();
    let store: FileCheckpointStore = FileCheckpointStore::open(&dir).unwrap();
    let session: Session = started_session();
    let checkpoint: SessionCheckpoint = SessionCheckpoint::capture(&session, at(1_100));

    store.save(&checkpoint).unwrap();

    let loaded: SessionCheckpoint = store.load(&SessionId::new("sessao-1")).unwrap().unwrap();
    assert_eq!(loaded.session.id, SessionId::new("sessao-1"));
    assert_eq!(loaded.session.revision, session.revision);
    assert_eq!(loaded.remaining_secs, Some(80));

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_file_store_save_replaces_previous_checkpoint() {
    let dir: PathBuf = test_dir();
    let store: FileCheckpointStore = FileCheckpointStore::open(&dir).unwrap();
    let session: Session = started_session();

    store
        .save(&SessionCheckpoint::capture(&session, at(1_050)))
        .unwrap();

    let later: Session = apply(
        &session,
        Command::SubmitBid {
            item_id: ItemId::new("item-1"),
            participant_id: ParticipantId::new("f-a"),
            unit_centavos: 95_000,
        },
        at(1_100),
    )
    .unwrap()
    .new_session;
    store
        .save(&SessionCheckpoint::capture(&later, at(1_100)))
        .unwrap();

    let checkpoints = store.list().unwrap();
    assert_eq!(checkpoints.len(), 1);
    assert_eq!(checkpoints[0].session.revision, later.revision);
    assert_eq!(checkpoints[0].session.bids_for(0).len(), 1);

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_file_store_missing_checkpoint_is_none() {
    let dir: PathBuf = test_dir();
    let store: FileCheckpointStore = FileCheckpointStore::open(&dir).unwrap();

    assert!(store.load(&SessionId::new("ausente")).unwrap().is_none());
    // Removing a missing checkpoint is not an error.
    store.remove(&SessionId::new("ausente")).unwrap();

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_file_store_skips_corrupt_checkpoint_on_list() {
    let dir: PathBuf = test_dir();
    let store: FileCheckpointStore = FileCheckpointStore::open(&dir).unwrap();
    let session: Session = started_session();
    store
        .save(&SessionCheckpoint::capture(&session, at(1_050)))
        .unwrap();

    std::fs::write(dir.join("corrompido.json"), b"not json").unwrap();

    let checkpoints = store.list().unwrap();
    assert_eq!(checkpoints.len(), 1);

    std::fs::remove_dir_all(&dir).unwrap();
}
