use chrono::{DateTime, Duration, TimeZone, Utc};
use neuron_core::db::open_db_in_memory;
use neuron_core::{
    Note, NoteStore, Rating, ReviewError, ReviewMode, ReviewService, SqliteNoteStore,
};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 9, 2, 7, 45, 0).unwrap()
}

fn seeded(store: &mut SqliteNoteStore<'_>, path: &str, title: &str, due_in_days: i64) -> Note {
    let mut note = Note::new(path, title, format!("# {title}"), now());
    note.schedule.due_at = now() + Duration::days(due_in_days);
    store.upsert(&note).unwrap();
    note
}

#[test]
fn empty_store_means_nothing_to_review() {
    let mut conn = open_db_in_memory().unwrap();
    let service = ReviewService::new(SqliteNoteStore::try_new(&mut conn).unwrap());

    assert!(service.next_note(ReviewMode::Due, now()).unwrap().is_none());
    assert!(service.next_note(ReviewMode::Any, now()).unwrap().is_none());
    assert!(service.mix_batch(now(), 3).unwrap().is_empty());
    assert!(service.find("anything").unwrap().is_none());
    assert_eq!(service.due_count(now()).unwrap(), 0);
}

#[test]
fn due_mode_skips_future_notes_but_any_mode_does_not() {
    let mut conn = open_db_in_memory().unwrap();
    let mut store = SqliteNoteStore::try_new(&mut conn).unwrap();
    seeded(&mut store, "/n/future.md", "Future", 4);
    let service = ReviewService::new(store);

    assert!(service.next_note(ReviewMode::Due, now()).unwrap().is_none());
    let any = service.next_note(ReviewMode::Any, now()).unwrap().unwrap();
    assert_eq!(any.title, "Future");
}

#[test]
fn grading_a_new_note_good_schedules_it_two_days_out() {
    let mut conn = open_db_in_memory().unwrap();
    let mut store = SqliteNoteStore::try_new(&mut conn).unwrap();
    seeded(&mut store, "/n/a.md", "A", 0);
    let mut service = ReviewService::new(store);

    let mut note = service.next_note(ReviewMode::Due, now()).unwrap().unwrap();
    let schedule = service.grade(&mut note, Rating::Good, now()).unwrap();

    assert_eq!(schedule.interval, 2.0);
    assert_eq!(schedule.ease_factor, 2.5);
    assert_eq!(schedule.due_at, now() + Duration::days(2));
    assert_eq!(note.schedule, schedule);

    let stored = service.store().get_by_path("/n/a.md").unwrap().unwrap();
    assert_eq!(stored.schedule, schedule);
    assert!(service.next_note(ReviewMode::Due, now()).unwrap().is_none());
}

#[test]
fn grading_a_vanished_note_keeps_its_old_schedule() {
    let mut conn = open_db_in_memory().unwrap();
    let store = SqliteNoteStore::try_new(&mut conn).unwrap();
    let mut service = ReviewService::new(store);

    let mut ghost = Note::new("/n/ghost.md", "Ghost", "", now());
    let before = ghost.schedule;
    let err = service.grade(&mut ghost, Rating::Easy, now()).unwrap_err();

    assert!(matches!(err, ReviewError::NoteMissing(path) if path == "/n/ghost.md"));
    assert_eq!(ghost.schedule, before);
}

#[test]
fn mix_batch_only_draws_due_notes() {
    let mut conn = open_db_in_memory().unwrap();
    let mut store = SqliteNoteStore::try_new(&mut conn).unwrap();
    for index in 0..4 {
        seeded(&mut store, &format!("/n/due-{index}.md"), "Due", -index);
    }
    seeded(&mut store, "/n/later.md", "Later", 2);
    let service = ReviewService::new(store);

    let batch = service.mix_batch(now(), 3).unwrap();
    assert_eq!(batch.len(), 3);
    assert!(batch.iter().all(|note| note.title == "Due"));
    assert_eq!(service.due_count(now()).unwrap(), 4);
}

#[test]
fn find_and_preview() {
    let mut conn = open_db_in_memory().unwrap();
    let mut store = SqliteNoteStore::try_new(&mut conn).unwrap();
    let mut mature = seeded(&mut store, "/vault/traits.md", "Trait Objects", 0);
    mature.schedule.interval = 6.0;
    store.update_schedule(&mature).unwrap();
    let service = ReviewService::new(store);

    let found = service.find("trait").unwrap().unwrap();
    assert_eq!(found.source_path, "/vault/traits.md");
    assert_eq!(
        service.preview(&found),
        [(Rating::Again, 1.0), (Rating::Good, 15.0), (Rating::Easy, 15.0)]
    );
}
