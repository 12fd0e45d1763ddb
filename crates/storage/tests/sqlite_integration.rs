use exam_core::model::{
    OptionIndex, QuestionBank, QuestionId, QuestionRecord, RollNumber, SessionState, Subject,
    exam_duration,
};
use exam_core::time::fixed_now;
use storage::repository::{RosterStore, SessionRecord, SessionStore, StorageError};
use storage::sqlite::SqliteRepository;

fn bank() -> QuestionBank {
    let questions = (1..=4_u64)
        .map(|id| {
            QuestionRecord::new(
                QuestionId::new(id),
                Subject::Chemistry,
                format!("Q{id}"),
                ["a", "b", "c", "d"].map(str::to_owned),
            )
        })
        .collect();
    QuestionBank::new(questions).unwrap()
}

fn sample_state() -> SessionState {
    let mut state = SessionState::begin(
        RollNumber::new("ROLL001").unwrap(),
        fixed_now() + exam_duration(),
    );
    state.set_answer(QuestionId::new(1), OptionIndex::new(1).unwrap());
    state.set_answer(QuestionId::new(3), OptionIndex::new(0).unwrap());
    state.toggle_mark(QuestionId::new(2));
    state.set_current_index(2);
    state
}

async fn connect(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

#[tokio::test]
async fn sqlite_roundtrip_preserves_whole_session() {
    let repo = connect("memdb_session_roundtrip").await;
    let state = sample_state();

    repo.save(&SessionRecord::from_state(&state, fixed_now()))
        .await
        .unwrap();

    let record = repo.load("ROLL001").await.unwrap().expect("record");
    assert_eq!(record.saved_at, fixed_now());

    let restored = record.into_state(&bank()).unwrap();
    assert_eq!(restored, state);
}

#[tokio::test]
async fn sqlite_save_overwrites_previous_record() {
    let repo = connect("memdb_session_overwrite").await;
    let mut state = sample_state();

    repo.save(&SessionRecord::from_state(&state, fixed_now()))
        .await
        .unwrap();

    state.set_answer(QuestionId::new(2), OptionIndex::new(3).unwrap());
    state.set_current_index(3);
    repo.save(&SessionRecord::from_state(&state, fixed_now()))
        .await
        .unwrap();

    let restored = repo
        .load("ROLL001")
        .await
        .unwrap()
        .expect("record")
        .into_state(&bank())
        .unwrap();
    assert_eq!(restored.answered_count(), 3);
    assert_eq!(restored.current_index(), 3);
}

#[tokio::test]
async fn sqlite_clear_removes_record() {
    let repo = connect("memdb_session_clear").await;

    repo.save(&SessionRecord::from_state(&sample_state(), fixed_now()))
        .await
        .unwrap();
    repo.clear("ROLL001").await.unwrap();

    assert!(repo.load("ROLL001").await.unwrap().is_none());
    repo.clear("ROLL001").await.unwrap();
}

#[tokio::test]
async fn sqlite_corrupt_answers_surface_as_serialization_error() {
    let repo = connect("memdb_session_corrupt").await;

    sqlx::query(
        r"
            INSERT INTO exam_sessions (roll, answers, marked, current_index, deadline, saved_at)
            VALUES ('ROLL001', 'not json', '[]', 0, ?1, ?1)
        ",
    )
    .bind(fixed_now())
    .execute(repo.pool())
    .await
    .unwrap();

    let err = repo.load("ROLL001").await.unwrap_err();
    assert!(matches!(err, StorageError::Serialization(_)));
}

#[tokio::test]
async fn sqlite_roster_replace_and_lookup() {
    let repo = connect("memdb_roster").await;

    repo.replace_all(&["ROLL001".into(), "ROLL002".into(), "ROLL003".into()])
        .await
        .unwrap();
    assert!(repo.contains("ROLL002").await.unwrap());
    assert!(!repo.contains("ROLL004").await.unwrap());
    assert_eq!(RosterStore::len(&repo).await.unwrap(), 3);

    repo.replace_all(&["ROLL004".into()]).await.unwrap();
    assert!(repo.contains("ROLL004").await.unwrap());
    assert!(!repo.contains("ROLL001").await.unwrap());
    assert_eq!(RosterStore::len(&repo).await.unwrap(), 1);
}
