use chrono::Duration;
use quiz_core::model::{
    Feedback, OwnerId, Question, QuestionDraft, QuestionOrigin, ResultRecord, ScoreSummary,
    SessionConfigDraft, SessionId, SessionMode, Topic,
};
use quiz_core::time::fixed_now;
use storage::repository::{
    FeedbackRepository, HistoryRepository, QuestionPoolRepository, StorageError,
};
use storage::sqlite::SqliteRepository;

async fn connect(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

fn build_question(topic: &str, n: usize) -> Question {
    QuestionDraft {
        question: format!("{topic} question {n}"),
        options: vec!["w".into(), "x".into(), "y".into(), "z".into()],
        correct_answer_index: 3,
        explanation: "z is correct".into(),
    }
    .validate(Topic::parse(topic).unwrap(), QuestionOrigin::Ai, fixed_now())
    .unwrap()
}

fn build_result(owner: Option<&str>, offset_minutes: i64) -> ResultRecord {
    let mut draft = SessionConfigDraft::for_topic("Cybersecurity");
    draft.mode = SessionMode::Timed;
    let config = draft.validate().unwrap();
    ResultRecord::new(
        SessionId::new(),
        &config,
        ScoreSummary::from_counts(3, 4).unwrap(),
        owner.map(|o| OwnerId::new(o).unwrap()),
        fixed_now() + Duration::minutes(offset_minutes),
    )
}

#[tokio::test]
async fn sqlite_pool_round_trips_questions_by_topic() {
    let repo = connect("memdb_pool").await;
    let batch: Vec<Question> = (0..3).map(|n| build_question("Journalism", n)).collect();
    assert_eq!(repo.append_batch(&batch).await.unwrap(), 3);
    repo.append_batch(&[build_question("Economics", 0)])
        .await
        .unwrap();

    let journalism = Topic::parse("Journalism").unwrap();
    assert_eq!(repo.count_for_topic(journalism).await.unwrap(), 3);

    let rows = repo.list_for_topic(journalism).await.unwrap();
    assert_eq!(rows.len(), 3);
    assert!(rows.iter().all(|r| r.origin == QuestionOrigin::Ai));

    let served = rows[0].clone().into_question().unwrap();
    assert_eq!(served.origin(), QuestionOrigin::Pool);
    assert_eq!(served.correct_option_text(), "z");
    assert_eq!(served.topic(), journalism);
}

#[tokio::test]
async fn sqlite_history_rejects_duplicate_sessions() {
    let repo = connect("memdb_history_dup").await;
    let record = build_result(Some("owner-1"), 0);
    repo.append_result(&record).await.unwrap();
    let err = repo.append_result(&record).await.unwrap_err();
    assert!(matches!(err, StorageError::Conflict));
}

#[tokio::test]
async fn sqlite_history_is_scoped_and_ordered() {
    let repo = connect("memdb_history_scope").await;
    for minutes in [0, 30, 15] {
        repo.append_result(&build_result(Some("owner-1"), minutes))
            .await
            .unwrap();
    }
    repo.append_result(&build_result(Some("owner-2"), 45))
        .await
        .unwrap();
    repo.append_result(&build_result(None, 60)).await.unwrap();

    let owner = OwnerId::new("owner-1").unwrap();
    let rows = repo.recent_results(Some(&owner), 20).await.unwrap();
    assert_eq!(rows.len(), 3);
    let times: Vec<_> = rows.iter().map(|r| r.record.created_at()).collect();
    assert_eq!(
        times,
        vec![
            fixed_now() + Duration::minutes(30),
            fixed_now() + Duration::minutes(15),
            fixed_now(),
        ]
    );
    assert!(rows.iter().all(|r| r.record.owner_id() == Some(&owner)));
    assert_eq!(rows[0].record.score(), 75);
    assert_eq!(rows[0].record.mode(), SessionMode::Timed);

    let limited = repo.recent_results(Some(&owner), 2).await.unwrap();
    assert_eq!(limited.len(), 2);

    let anonymous = repo.recent_results(None, 20).await.unwrap();
    assert_eq!(anonymous.len(), 1);
    assert!(anonymous[0].record.owner_id().is_none());
}

#[tokio::test]
async fn sqlite_feedback_keeps_author_and_time() {
    let repo = connect("memdb_feedback").await;
    let author = OwnerId::new("owner-9").unwrap();
    let first = Feedback::new("love it", Some(author.clone()), fixed_now()).unwrap();
    let second = Feedback::new("more topics", None, fixed_now() + Duration::seconds(5)).unwrap();
    repo.append_feedback(&first).await.unwrap();
    repo.append_feedback(&second).await.unwrap();

    let recent = repo.recent_feedback(10).await.unwrap();
    assert_eq!(recent, vec![second, first]);
    assert_eq!(recent[1].author(), Some(&author));
}

#[tokio::test]
async fn migrations_are_idempotent() {
    let repo = connect("memdb_migrate_twice").await;
    repo.migrate().await.expect("second migrate");
    let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM schema_migrations")
        .fetch_one(repo.pool())
        .await
        .unwrap();
    assert_eq!(applied, 1);
}
