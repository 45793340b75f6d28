use chrono::Duration;
use drill_core::model::{
    Attempt, AttemptMetadata, DrillSession, DrillSessionId, DrillSessionSummary, DrillType,
    InputMethod, Perspective, PieceKind, UserId,
};
use drill_core::time::fixed_now;
use storage::repository::{AttemptRepository, DrillSessionRepository, StorageError};
use storage::sqlite::SqliteRepository;

async fn connect(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

fn start(user: u64, drill_type: DrillType) -> DrillSession {
    DrillSession::start(
        UserId::new(user),
        drill_type,
        InputMethod::Grid,
        Perspective::Black,
        fixed_now(),
    )
}

fn answer(
    session: DrillSessionId,
    drill_type: DrillType,
    expected: &str,
    submitted: &str,
    response_ms: u32,
) -> Attempt {
    Attempt::evaluate(
        session,
        UserId::new(1),
        drill_type,
        "",
        expected,
        submitted,
        response_ms,
        fixed_now(),
    )
}

#[tokio::test]
async fn sqlite_roundtrip_persists_sessions_and_summary() {
    let repo = connect("memdb_sessions").await;

    let id = repo
        .create_session(&start(1, DrillType::FindSquare))
        .await
        .unwrap();
    let row = repo.get_session(id).await.unwrap();
    assert_eq!(row.id, id);
    assert!(row.session.is_active());
    assert_eq!(row.session.input_method(), InputMethod::Grid);
    assert_eq!(row.session.perspective(), Perspective::Black);
    assert_eq!(row.session.started_at(), fixed_now());

    let summary = DrillSessionSummary {
        total_attempts: 3,
        correct: 2,
        avg_response_ms: 900,
        streak_best: 2,
    };
    let ended_at = fixed_now() + Duration::minutes(2);
    repo.end_session(id, ended_at, &summary).await.unwrap();

    let ended = repo.get_session(id).await.unwrap();
    assert_eq!(ended.session.ended_at(), Some(ended_at));
    assert_eq!(ended.session.summary(), &summary);

    let again = repo.end_session(id, ended_at, &summary).await.unwrap_err();
    assert!(matches!(again, StorageError::NotFound));

    let missing = repo.get_session(DrillSessionId::new(999)).await.unwrap_err();
    assert!(matches!(missing, StorageError::NotFound));
}

#[tokio::test]
async fn sqlite_attempts_keep_order_and_metadata() {
    let repo = connect("memdb_attempts").await;
    let session = repo
        .create_session(&start(1, DrillType::PieceMovement))
        .await
        .unwrap();

    let metadata = AttemptMetadata {
        piece_type: Some(PieceKind::Rook),
        from_square: Some("a1".parse().unwrap()),
        fen: Some("8/8/8/8/8/8/8/R7 w - - 0 1".to_owned()),
    };
    repo.append_attempt(
        &answer(session, DrillType::PieceMovement, "a1", " A1 ", 400).with_metadata(metadata.clone()),
    )
    .await
    .unwrap();
    repo.append_attempt(&answer(session, DrillType::PieceMovement, "c3", "c4", 600))
        .await
        .unwrap();

    let rows = repo.attempts_for_session(session).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows[0].id < rows[1].id);
    assert!(rows[0].attempt.is_correct());
    assert_eq!(rows[0].attempt.submitted(), "a1");
    assert_eq!(rows[0].attempt.metadata(), &metadata);
    assert!(!rows[1].attempt.is_correct());
    assert!(rows[1].attempt.metadata().is_empty());

    let totals = repo.session_totals(session).await.unwrap();
    assert_eq!(totals.total, 2);
    assert_eq!(totals.correct, 1);
    assert_eq!(totals.avg_response_ms(), 500);
}

#[tokio::test]
async fn sqlite_rejects_attempts_for_unknown_session() {
    let repo = connect("memdb_orphan").await;
    let err = repo
        .append_attempt(&answer(
            DrillSessionId::new(404),
            DrillType::NameSquare,
            "e4",
            "e4",
            100,
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound));
}

#[tokio::test]
async fn sqlite_reductions_group_by_user_and_drill() {
    let repo = connect("memdb_reductions").await;
    let user = UserId::new(1);

    let empty = repo.overall_totals(user).await.unwrap();
    assert_eq!(empty.total, 0);
    assert_eq!(empty.response_ms_sum, 0);
    assert!(repo.square_totals(user).await.unwrap().is_empty());

    let name = repo
        .create_session(&start(1, DrillType::NameSquare))
        .await
        .unwrap();
    let find = repo
        .create_session(&start(1, DrillType::FindSquare))
        .await
        .unwrap();
    for (session, drill, expected, submitted) in [
        (name, DrillType::NameSquare, "e4", "e4"),
        (name, DrillType::NameSquare, "e4", "e5"),
        (find, DrillType::FindSquare, "b2", "b2"),
    ] {
        repo.append_attempt(&answer(session, drill, expected, submitted, 300))
            .await
            .unwrap();
    }

    let name_totals = repo.drill_totals(user, DrillType::NameSquare).await.unwrap();
    assert_eq!((name_totals.total, name_totals.correct), (2, 1));
    let overall = repo.overall_totals(user).await.unwrap();
    assert_eq!((overall.total, overall.correct), (3, 2));
    assert_eq!(overall.response_ms_sum, 900);

    let mut grouped = repo.square_totals(user).await.unwrap();
    grouped.sort_by(|a, b| a.key.cmp(&b.key));
    assert_eq!(grouped.len(), 2);
    assert_eq!((grouped[0].key.as_str(), grouped[0].total, grouped[0].correct), ("b2", 1, 1));
    assert_eq!((grouped[1].key.as_str(), grouped[1].total, grouped[1].correct), ("e4", 2, 1));

    let outcomes = repo.drill_outcomes(user, DrillType::NameSquare).await.unwrap();
    let flags: Vec<bool> = outcomes.iter().map(|o| o.correct).collect();
    assert_eq!(flags, vec![true, false]);
    assert!(outcomes.iter().all(|o| o.session_id == name && o.response_ms == 300));

    assert_eq!(repo.count_sessions(user).await.unwrap(), 2);
    assert_eq!(repo.count_sessions(UserId::new(2)).await.unwrap(), 0);
    let recent = repo.list_sessions(user, 1).await.unwrap();
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].id, find);
}
