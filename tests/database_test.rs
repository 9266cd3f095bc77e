use emotion_lab::analytics::SurveyAnalyzer;
use emotion_lab::data::Emotion;
use emotion_lab::database::{Database, SurveyType, TableName};
use emotion_lab::export;
use emotion_lab::gamification::{GamificationTracker, ProgressDraft};
use emotion_lab::AppError;

fn answers(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(q, a)| (q.to_string(), a.to_string()))
        .collect()
}

#[tokio::test]
async fn users_are_unique_by_name_and_grade() {
    let db = Database::in_memory().await.unwrap();

    let first = db.register_user("Ada", "Lovelace", "5").await.unwrap();
    let again = db.register_user(" Ada ", "Lovelace", "5").await.unwrap();
    let other_grade = db.register_user("Ada", "Lovelace", "6").await.unwrap();

    assert_eq!(first.id, again.id);
    assert_ne!(first.id, other_grade.id);

    let found = db.find_user("Ada", "Lovelace", "5").await.unwrap();
    assert_eq!(found.map(|u| u.id), Some(first.id));
}

#[tokio::test]
async fn blank_user_fields_are_rejected() {
    let db = Database::in_memory().await.unwrap();
    let result = db.register_user("Ada", "  ", "5").await;
    assert!(matches!(result, Err(AppError::Validation(_))));

    let users = db.fetch_table(TableName::Users).await.unwrap();
    assert!(users.rows.is_empty());
}

#[tokio::test]
async fn every_login_is_a_new_session() {
    let db = Database::in_memory().await.unwrap();
    let user = db.register_user("Grace", "Hopper", "4").await.unwrap();

    db.record_login(user.id).await.unwrap();
    db.record_login(user.id).await.unwrap();

    let sessions = db.sessions_for_user(user.id).await.unwrap();
    assert_eq!(sessions.len(), 2);
    assert!(sessions.iter().all(|s| s.user_id == user.id));

    assert!(matches!(
        db.record_login(999).await,
        Err(AppError::UserNotFound(999))
    ));
}

#[tokio::test]
async fn survey_answers_round_trip() {
    let db = Database::in_memory().await.unwrap();
    let user = db.register_user("Alan", "Turing", "3").await.unwrap();

    let pre = answers(&[("Heard of AI?", "Yes"), ("Trained a model?", "No")]);
    let post = answers(&[("Enjoyed it?", "Maybe")]);
    assert_eq!(db.save_survey(user.id, SurveyType::Pre, &pre).await.unwrap(), 2);
    assert_eq!(db.save_survey(user.id, SurveyType::Post, &post).await.unwrap(), 1);

    let stored = db.survey_responses(Some(user.id)).await.unwrap();
    assert_eq!(stored.len(), 3);
    assert_eq!(stored[0].survey_type, SurveyType::Pre);
    assert_eq!(stored[1].answer, "No");
    assert_eq!(stored[2].survey_type, SurveyType::Post);
    assert_eq!(stored[2].question, "Enjoyed it?");
}

#[tokio::test]
async fn progress_snapshot_stores_joined_badges() {
    let db = Database::in_memory().await.unwrap();
    let user = db.register_user("Katherine", "Johnson", "5").await.unwrap();

    let mut tracker = GamificationTracker::new();
    for _ in 0..5 {
        tracker.record_detection(Emotion::Happy);
    }
    let draft = tracker.snapshot();
    assert_eq!(
        draft,
        ProgressDraft {
            points: 100,
            progress: 50,
            badges: "AI Novice, AI Expert".to_string(),
        }
    );

    let saved = db.save_progress(user.id, &draft).await.unwrap();
    let stored = db.progress_for_user(user.id).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].id, saved.id);
    assert_eq!(stored[0].points, 100);
    assert_eq!(stored[0].badges, "AI Novice, AI Expert");
}

#[tokio::test]
async fn table_names_come_from_the_allow_list() {
    assert_eq!("users".parse::<TableName>().unwrap(), TableName::Users);
    assert_eq!(
        "survey_responses".parse::<TableName>().unwrap(),
        TableName::SurveyResponses
    );
    for bad in ["Users", "users; DROP TABLE users", "sqlite_master", ""] {
        assert!(matches!(
            bad.parse::<TableName>(),
            Err(AppError::UnknownTable(_))
        ));
    }
}

#[tokio::test]
async fn csv_export_has_header_plus_one_line_per_row() {
    let db = Database::in_memory().await.unwrap();
    let dir = tempfile::tempdir().unwrap();

    for (first, last) in [("Ada", "Lovelace"), ("Grace", "Hopper"), ("Alan", "Turing")] {
        let user = db.register_user(first, last, "5").await.unwrap();
        db.record_login(user.id).await.unwrap();
    }

    let path = export::export_table(&db, TableName::Users, dir.path())
        .await
        .unwrap();
    let name = path.file_name().unwrap().to_string_lossy().to_string();
    assert!(name.starts_with("users_") && name.ends_with(".csv"), "{}", name);

    let content = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 3 + 1);
    assert_eq!(lines[0], "id,first_name,last_name,grade,created_at");
    for line in &lines[1..] {
        assert_eq!(line.split(',').count(), TableName::Users.columns().len());
    }
}

#[tokio::test]
async fn export_all_writes_one_file_per_table() {
    let db = Database::in_memory().await.unwrap();
    let dir = tempfile::tempdir().unwrap();
    let user = db.register_user("Mary", "Jackson", "2").await.unwrap();
    db.record_login(user.id).await.unwrap();

    let paths = export::export_all(&db, dir.path()).await.unwrap();
    assert_eq!(paths.len(), TableName::ALL.len());

    for (path, table) in paths.iter().zip(TableName::ALL) {
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with(&format!("{}_", table)));

        let content = std::fs::read_to_string(path).unwrap();
        let expected_rows = match table {
            TableName::Users | TableName::Sessions => 1,
            _ => 0,
        };
        assert_eq!(content.lines().count(), expected_rows + 1);
    }
}

#[tokio::test]
async fn survey_summary_counts_answers_per_question() {
    let db = Database::in_memory().await.unwrap();
    let a = db.register_user("Ada", "Lovelace", "5").await.unwrap();
    let b = db.register_user("Grace", "Hopper", "5").await.unwrap();

    db.save_survey(a.id, SurveyType::Pre, &answers(&[("Heard of AI?", "Yes")]))
        .await
        .unwrap();
    db.save_survey(b.id, SurveyType::Pre, &answers(&[("Heard of AI?", "No")]))
        .await
        .unwrap();
    db.save_survey(a.id, SurveyType::Post, &answers(&[("Enjoyed it?", "Yes")]))
        .await
        .unwrap();

    let responses = db.survey_responses(None).await.unwrap();
    let summary = SurveyAnalyzer::new().summarize(&responses);

    assert_eq!(summary.respondents, 2);
    assert_eq!(summary.pre.len(), 1);
    assert_eq!(summary.pre[0].total, 2);
    assert_eq!(summary.pre[0].counts["Maybe"], 0);
    assert!((summary.pre[0].yes_rate - 0.5).abs() < 1e-9);
    assert!((summary.average_post_yes_rate - 1.0).abs() < 1e-9);
}

#[tokio::test]
async fn overlapping_logins_share_one_account() {
    let db = Database::in_memory().await.unwrap();

    let (a, b) = tokio::join!(
        db.register_user("Ada", "Lovelace", "5"),
        db.register_user("Ada", "Lovelace", "5")
    );
    let (a, b) = (a.unwrap(), b.unwrap());
    assert_eq!(a.id, b.id);
    assert_eq!(a.created_at, b.created_at);

    let users = db.fetch_table(TableName::Users).await.unwrap();
    assert_eq!(users.rows.len(), 1);
}
