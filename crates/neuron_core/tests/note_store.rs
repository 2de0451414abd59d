use chrono::{DateTime, Duration, TimeZone, Utc};
use neuron_core::db::open_db_in_memory;
use neuron_core::{Note, NoteLookup, NoteStore, SqliteNoteStore, StoreError, UpsertOutcome};
use std::collections::BTreeSet;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
}

fn note(path: &str, title: &str, due_in_days: i64) -> Note {
    let mut note = Note::new(path, title, format!("# {title}\n\nbody of {title}"), now());
    note.schedule.due_at = now() + Duration::days(due_in_days);
    note
}

#[test]
fn upsert_inserts_then_updates_content_only() {
    let mut conn = open_db_in_memory().unwrap();
    let mut store = SqliteNoteStore::try_new(&mut conn).unwrap();

    let mut original = note("/notes/rust.md", "Rust", 0);
    original.set_tags(["lang", "systems"]);
    original.created_at = Some(Utc.with_ymd_and_hms(2023, 12, 24, 0, 0, 0).unwrap());
    assert_eq!(store.upsert(&original).unwrap(), UpsertOutcome::Inserted);

    let mut reviewed = original.clone();
    reviewed.schedule.interval = 15.0;
    reviewed.schedule.ease_factor = 2.65;
    reviewed.schedule.due_at = now() + Duration::days(15);
    store.update_schedule(&reviewed).unwrap();

    let mut edited = Note::new("/notes/rust.md", "Rust 2024", "new body", now());
    edited.set_tags(["lang"]);
    assert_eq!(store.upsert(&edited).unwrap(), UpsertOutcome::Updated);

    let stored = store.get_by_path("/notes/rust.md").unwrap().unwrap();
    assert_eq!(stored.id, original.id);
    assert_eq!(stored.title, "Rust 2024");
    assert_eq!(stored.body, "new body");
    assert_eq!(stored.tags, vec!["lang".to_string()]);
    assert_eq!(stored.created_at, None);
    assert_eq!(stored.schedule, reviewed.schedule);
}

#[test]
fn round_trips_all_fields() {
    let mut conn = open_db_in_memory().unwrap();
    let mut store = SqliteNoteStore::try_new(&mut conn).unwrap();

    let mut original = note("/notes/ownership.md", "Ownership", -2);
    original.set_tags(["rust", "memory"]);
    original.created_at = Some(Utc.with_ymd_and_hms(2024, 1, 5, 0, 0, 0).unwrap());
    store.upsert(&original).unwrap();

    let stored = store.get_by_path("/notes/ownership.md").unwrap().unwrap();
    assert_eq!(stored, original);
}

#[test]
fn get_due_returns_earliest_due_note() {
    let mut conn = open_db_in_memory().unwrap();
    let mut store = SqliteNoteStore::try_new(&mut conn).unwrap();

    store.upsert(&note("/n/later.md", "Later", 3)).unwrap();
    store.upsert(&note("/n/recent.md", "Recent", -1)).unwrap();
    store.upsert(&note("/n/oldest.md", "Oldest", -5)).unwrap();

    let due = store.get_due(now()).unwrap();
    assert_eq!(due.title, "Oldest");
    assert_eq!(store.count_due(now()).unwrap(), 2);
}

#[test]
fn get_due_reports_not_found_when_nothing_is_due() {
    let mut conn = open_db_in_memory().unwrap();
    let mut store = SqliteNoteStore::try_new(&mut conn).unwrap();
    store.upsert(&note("/n/later.md", "Later", 3)).unwrap();

    let err = store.get_due(now()).unwrap_err();
    assert!(err.is_not_found());
    assert!(matches!(err, StoreError::NotFound(NoteLookup::Due)));
}

#[test]
fn due_batch_is_bounded_and_only_due() {
    let mut conn = open_db_in_memory().unwrap();
    let mut store = SqliteNoteStore::try_new(&mut conn).unwrap();
    for index in 0..5 {
        store
            .upsert(&note(&format!("/n/due-{index}.md"), "Due", -1))
            .unwrap();
    }
    store.upsert(&note("/n/future.md", "Future", 10)).unwrap();

    let batch = store.get_due_batch(now(), 3).unwrap();
    assert_eq!(batch.len(), 3);
    assert!(batch.iter().all(|note| note.schedule.is_due(now())));
    let distinct: BTreeSet<_> = batch.iter().map(|note| note.source_path.clone()).collect();
    assert_eq!(distinct.len(), 3);

    assert_eq!(store.get_due_batch(now(), 50).unwrap().len(), 5);
    assert!(store.get_due_batch(now(), 0).unwrap().is_empty());
}

fn seed_spread_due(store: &mut SqliteNoteStore<'_>) {
    for index in 0..10 {
        store
            .upsert(&note(&format!("/n/spread-{index}.md"), "Spread", -(index + 1)))
            .unwrap();
    }
}

#[test]
fn due_batch_samples_beyond_the_earliest_note() {
    let mut conn = open_db_in_memory().unwrap();
    let mut store = SqliteNoteStore::try_new(&mut conn).unwrap();
    seed_spread_due(&mut store);

    let picked: BTreeSet<String> = (0..50)
        .map(|_| {
            let batch = store.get_due_batch(now(), 1).unwrap();
            assert_eq!(batch.len(), 1);
            batch[0].source_path.clone()
        })
        .collect();
    assert!(picked.len() > 1, "always picked {picked:?}");
}

#[test]
fn get_any_samples_more_than_one_note() {
    let mut conn = open_db_in_memory().unwrap();
    let mut store = SqliteNoteStore::try_new(&mut conn).unwrap();
    seed_spread_due(&mut store);

    let picked: BTreeSet<String> = (0..50)
        .map(|_| store.get_any().unwrap().source_path)
        .collect();
    assert!(picked.len() > 1, "always picked {picked:?}");
}

#[test]
fn get_any_ignores_due_date_and_fails_on_empty_store() {
    let mut conn = open_db_in_memory().unwrap();
    let mut store = SqliteNoteStore::try_new(&mut conn).unwrap();
    assert!(matches!(
        store.get_any().unwrap_err(),
        StoreError::NotFound(NoteLookup::Any)
    ));

    store.upsert(&note("/n/future.md", "Future", 30)).unwrap();
    assert_eq!(store.get_any().unwrap().title, "Future");
}

#[test]
fn find_matches_title_or_path_ignoring_case() {
    let mut conn = open_db_in_memory().unwrap();
    let mut store = SqliteNoteStore::try_new(&mut conn).unwrap();
    store
        .upsert(&note("/vault/lang/borrowing.md", "Borrow Checker", 0))
        .unwrap();
    store
        .upsert(&note("/vault/db/indexes.md", "B-Tree Indexes", 0))
        .unwrap();

    assert_eq!(
        store.find_by_title_or_path("CHECKER").unwrap().source_path,
        "/vault/lang/borrowing.md"
    );
    assert_eq!(
        store.find_by_title_or_path("db/index").unwrap().title,
        "B-Tree Indexes"
    );
    // Several notes match "b"; only assert that one of them comes back.
    let any = store.find_by_title_or_path("b").unwrap();
    assert!(any.title.to_lowercase().contains('b'));

    assert!(matches!(
        store.find_by_title_or_path("100%").unwrap_err(),
        StoreError::NotFound(NoteLookup::Term(term)) if term == "100%"
    ));
}

#[test]
fn update_schedule_of_unknown_note_is_not_found() {
    let mut conn = open_db_in_memory().unwrap();
    let mut store = SqliteNoteStore::try_new(&mut conn).unwrap();

    let err = store.update_schedule(&note("/n/ghost.md", "Ghost", 0)).unwrap_err();
    assert!(matches!(err, StoreError::NotFound(NoteLookup::Path(_))));
}

#[test]
fn delete_and_all_paths() {
    let mut conn = open_db_in_memory().unwrap();
    let mut store = SqliteNoteStore::try_new(&mut conn).unwrap();
    store.upsert(&note("/n/a.md", "A", 0)).unwrap();
    store.upsert(&note("/n/b.md", "B", 0)).unwrap();

    assert_eq!(
        store.all_paths().unwrap(),
        BTreeSet::from(["/n/a.md".to_string(), "/n/b.md".to_string()])
    );
    assert!(store.delete("/n/a.md").unwrap());
    assert!(!store.delete("/n/a.md").unwrap());
    assert!(store.get_by_path("/n/a.md").unwrap().is_none());
    assert_eq!(store.all_paths().unwrap().len(), 1);
}

#[test]
fn corrupt_tags_surface_as_invalid_data() {
    let mut conn = open_db_in_memory().unwrap();
    {
        let mut store = SqliteNoteStore::try_new(&mut conn).unwrap();
        store.upsert(&note("/n/a.md", "A", 0)).unwrap();
    }
    conn.execute("UPDATE notes SET tags = 'not json';", []).unwrap();

    let store = SqliteNoteStore::try_new(&mut conn).unwrap();
    assert!(matches!(
        store.get_by_path("/n/a.md").unwrap_err(),
        StoreError::InvalidData(_)
    ));
}
