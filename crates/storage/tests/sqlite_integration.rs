use assess_core::model::{
    AssessmentDefinition, AssessmentId, AssessmentSettings, AttemptStatus, AttemptSubmission, NewAttempt,
    QuestionDraft, QuestionKind, QuestionOutcome, UserId,
};
use assess_core::time::fixed_now;
use chrono::Duration;
use storage::repository::{
    AssessmentRepository, AttemptRepository, NewAssessmentRecord, StorageError,
};
use storage::sqlite::SqliteRepository;

async fn connect(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

fn record(max_attempts: u32) -> NewAssessmentRecord {
    NewAssessmentRecord {
        title: "Geography".into(),
        description: Some("Capitals".into()),
        questions: vec![
            QuestionDraft {
                text: "Capital of France?".into(),
                kind: QuestionKind::MultipleChoice,
                choices: vec!["Paris".into(), "Lyon".into(), "Nice".into()],
                correct_answer: "Paris".into(),
                points: 2,
            },
            QuestionDraft {
                text: "Berlin is in Germany.".into(),
                kind: QuestionKind::TrueFalse,
                choices: Vec::new(),
                correct_answer: "true".into(),
                points: 1,
            },
            QuestionDraft {
                text: "Capital of Japan?".into(),
                kind: QuestionKind::ShortAnswer,
                choices: Vec::new(),
                correct_answer: "Tokyo".into(),
                points: 1,
            },
        ],
        settings: AssessmentSettings::new(Some(5), Some(60), max_attempts).unwrap(),
        created_at: fixed_now(),
    }
}

fn new_attempt(assessment_id: AssessmentId, user_id: UserId) -> NewAttempt {
    NewAttempt {
        assessment_id,
        user_id,
        started_at: fixed_now(),
    }
}

fn perfect_submission(definition: &AssessmentDefinition, secs: u64) -> AttemptSubmission {
    let outcomes = definition
        .questions()
        .iter()
        .map(|q| QuestionOutcome {
            question_id: q.id(),
            answer: q.correct_answer().to_string(),
            is_correct: true,
            points_earned: q.points(),
            points_possible: q.points(),
        })
        .collect::<Vec<_>>();
    AttemptSubmission {
        outcomes,
        score: 100.0,
        status: AttemptStatus::Passed,
        submitted_at: fixed_now() + Duration::seconds(i64::try_from(secs).unwrap()),
        time_spent_secs: secs,
    }
}

#[tokio::test]
async fn sqlite_roundtrip_preserves_questions_and_settings() {
    let repo = connect("memdb_assessment_roundtrip").await;

    let id = repo.insert_new_assessment(record(2)).await.unwrap();
    let fetched = repo.get_assessment(id).await.unwrap();

    assert_eq!(fetched.title(), "Geography");
    assert_eq!(fetched.description(), Some("Capitals"));
    assert_eq!(fetched.question_count(), 3);
    assert_eq!(fetched.total_points(), 4);
    assert_eq!(fetched.settings().time_limit_minutes(), Some(5));
    assert_eq!(fetched.settings().passing_score(), Some(60));
    assert_eq!(fetched.settings().max_attempts(), 2);

    let first = fetched.question_at(0).unwrap();
    assert_eq!(first.kind(), QuestionKind::MultipleChoice);
    assert_eq!(first.choices(), ["Paris", "Lyon", "Nice"]);
    assert_eq!(first.points(), 2);
    assert_eq!(fetched.question_at(2).unwrap().correct_answer(), "Tokyo");

    let second = repo.insert_new_assessment(record(1)).await.unwrap();
    assert_eq!(second.value(), id.value() + 1);
    assert_eq!(repo.list_assessments(10).await.unwrap().len(), 2);
}

#[tokio::test]
async fn sqlite_get_missing_assessment_is_not_found() {
    let repo = connect("memdb_assessment_missing").await;
    let err = repo.get_assessment(AssessmentId::new(99)).await.unwrap_err();
    assert!(matches!(err, StorageError::NotFound));
}

#[tokio::test]
async fn sqlite_numbers_attempts_and_enforces_limit() {
    let repo = connect("memdb_attempt_limit").await;
    let assessment_id = repo.insert_new_assessment(record(2)).await.unwrap();
    let user = UserId::random();
    let other = UserId::random();

    let first = repo
        .start_attempt(&new_attempt(assessment_id, user))
        .await
        .unwrap();
    let second = repo
        .start_attempt(&new_attempt(assessment_id, user))
        .await
        .unwrap();
    assert_eq!(first.number(), 1);
    assert_eq!(second.number(), 2);
    assert_eq!(first.status(), AttemptStatus::InProgress);

    let err = repo
        .start_attempt(&new_attempt(assessment_id, user))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::AttemptLimitReached { max: 2 }));

    // Limits are per user.
    let theirs = repo
        .start_attempt(&new_attempt(assessment_id, other))
        .await
        .unwrap();
    assert_eq!(theirs.number(), 1);

    assert_eq!(repo.count_attempts(assessment_id, user).await.unwrap(), 2);
    let listed = repo.list_attempts(assessment_id, user, 10).await.unwrap();
    assert_eq!(
        listed.iter().map(|a| a.number()).collect::<Vec<_>>(),
        vec![2, 1]
    );
}

#[tokio::test]
async fn sqlite_start_for_unknown_assessment_is_not_found() {
    let repo = connect("memdb_attempt_unknown").await;
    let err = repo
        .start_attempt(&new_attempt(AssessmentId::new(7), UserId::random()))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound));
}

#[tokio::test]
async fn sqlite_submit_persists_outcomes_once() {
    let repo = connect("memdb_attempt_submit").await;
    let assessment_id = repo.insert_new_assessment(record(3)).await.unwrap();
    let user = UserId::random();
    let attempt = repo
        .start_attempt(&new_attempt(assessment_id, user))
        .await
        .unwrap();

    let definition = repo.get_assessment(assessment_id).await.unwrap();
    let submission = perfect_submission(&definition, 42);

    let stored = repo.submit_attempt(attempt.id(), &submission).await.unwrap();
    assert!(stored.is_submitted());
    assert_eq!(stored.score(), Some(100.0));

    let fetched = repo.get_attempt(attempt.id()).await.unwrap();
    assert_eq!(fetched.status(), AttemptStatus::Passed);
    assert_eq!(fetched.time_spent_secs(), Some(42));
    assert_eq!(fetched.outcomes().len(), 3);
    assert_eq!(fetched.outcomes()[2].answer, "Tokyo");

    let err = repo
        .submit_attempt(attempt.id(), &submission)
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Conflict));
}

#[tokio::test]
async fn sqlite_attempt_limit_comes_from_stored_assessment() {
    let repo = connect("memdb_attempt_stored_limit").await;
    let assessment_id = repo.insert_new_assessment(record(1)).await.unwrap();
    let user = UserId::random();

    repo.start_attempt(&new_attempt(assessment_id, user))
        .await
        .unwrap();
    let err = repo
        .start_attempt(&new_attempt(assessment_id, user))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::AttemptLimitReached { max: 1 }));
    assert_eq!(repo.count_attempts(assessment_id, user).await.unwrap(), 1);
}

#[tokio::test]
async fn sqlite_concurrent_starts_respect_limit() {
    let repo = connect("memdb_attempt_concurrent_start").await;
    let assessment_id = repo.insert_new_assessment(record(1)).await.unwrap();
    let user = UserId::random();
    let request = new_attempt(assessment_id, user);

    let (a, b) = tokio::join!(repo.start_attempt(&request), repo.start_attempt(&request));
    let (won, lost) = match (a, b) {
        (Ok(won), Err(lost)) | (Err(lost), Ok(won)) => (won, lost),
        other => panic!("expected exactly one started attempt, got {other:?}"),
    };
    assert_eq!(won.number(), 1);
    assert!(matches!(
        lost,
        StorageError::AttemptLimitReached { max: 1 } | StorageError::Conflict
    ));
    assert_eq!(repo.count_attempts(assessment_id, user).await.unwrap(), 1);
}

#[tokio::test]
async fn sqlite_concurrent_starts_get_distinct_numbers() {
    let repo = connect("memdb_attempt_concurrent_numbers").await;
    let assessment_id = repo.insert_new_assessment(record(2)).await.unwrap();
    let request = new_attempt(assessment_id, UserId::random());

    let (a, b) = tokio::join!(repo.start_attempt(&request), repo.start_attempt(&request));
    let mut numbers = vec![a.unwrap().number(), b.unwrap().number()];
    numbers.sort_unstable();
    assert_eq!(numbers, vec![1, 2]);
}

#[tokio::test]
async fn sqlite_concurrent_submits_store_exactly_one() {
    let repo = connect("memdb_attempt_concurrent_submit").await;
    let assessment_id = repo.insert_new_assessment(record(3)).await.unwrap();
    let attempt = repo
        .start_attempt(&new_attempt(assessment_id, UserId::random()))
        .await
        .unwrap();
    let definition = repo.get_assessment(assessment_id).await.unwrap();
    let first = perfect_submission(&definition, 10);
    let second = perfect_submission(&definition, 20);

    let (a, b) = tokio::join!(
        repo.submit_attempt(attempt.id(), &first),
        repo.submit_attempt(attempt.id(), &second)
    );
    let (stored, lost) = match (a, b) {
        (Ok(stored), Err(lost)) | (Err(lost), Ok(stored)) => (stored, lost),
        other => panic!("expected exactly one stored submission, got {other:?}"),
    };
    assert!(matches!(lost, StorageError::Conflict));

    let fetched = repo.get_attempt(attempt.id()).await.unwrap();
    assert_eq!(fetched.time_spent_secs(), stored.time_spent_secs());
}
