use actix_web::{http::StatusCode, test, web, App};
use serde_json::{json, Value};

use emotion_lab::api::{self, AppContext, LoginResponse, SurveyResult};
use emotion_lab::app::{DetectOutcome, TrainOutcome};
use emotion_lab::database::Database;
use emotion_lab::{Config, EmotionLab};

async fn context() -> web::Data<AppContext> {
    let lab = EmotionLab::new(&Config::default()).unwrap();
    let db = Database::in_memory().await.unwrap();
    let export_dir = std::env::temp_dir().join("emotion_lab_api_test");
    web::Data::new(AppContext::new(lab, db, export_dir))
}

#[actix_web::test]
async fn health_check_responds() {
    let app = test::init_service(App::new().app_data(context().await).configure(api::configure)).await;

    let req = test::TestRequest::get().uri("/health").to_request();
    let body = test::call_and_read_body(&app, req).await;
    assert_eq!(body, "Emotion Lab is running!");
}

#[actix_web::test]
async fn detect_then_train_updates_points() {
    let app = test::init_service(App::new().app_data(context().await).configure(api::configure)).await;

    let req = test::TestRequest::post()
        .uri("/detect")
        .set_json(json!({ "text": "I am so happy today!" }))
        .to_request();
    let outcome: DetectOutcome = test::call_and_read_body_json(&app, req).await;
    assert!(outcome.message.starts_with("AI detects: "));
    assert_eq!(outcome.points, 10);

    let req = test::TestRequest::post()
        .uri("/train")
        .set_json(json!({ "text": "The puppy licked my face", "emotion": "happy" }))
        .to_request();
    let outcome: TrainOutcome = test::call_and_read_body_json(&app, req).await;
    assert_eq!(outcome.corpus_size, 22);
    assert_eq!(outcome.points, 30);

    let req = test::TestRequest::get().uri("/corpus").to_request();
    let corpus: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(corpus.as_array().map(|a| a.len()), Some(22));
}

#[actix_web::test]
async fn bad_input_is_a_client_error() {
    let app = test::init_service(App::new().app_data(context().await).configure(api::configure)).await;

    let req = test::TestRequest::post()
        .uri("/detect")
        .set_json(json!({ "text": "   " }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::post()
        .uri("/train")
        .set_json(json!({ "text": "hello there" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::post()
        .uri("/garden/apply")
        .set_json(json!({ "water": 7, "sunlight": 2 }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::get().uri("/admin/tables/sqlite_master").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::get().uri("/pages/settings").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn session_flow_persists_survey_and_progress() {
    let app = test::init_service(App::new().app_data(context().await).configure(api::configure)).await;

    let req = test::TestRequest::post()
        .uri("/login")
        .set_json(json!({ "first_name": "Ada", "last_name": "Lovelace", "grade": "5" }))
        .to_request();
    let login: LoginResponse = test::call_and_read_body_json(&app, req).await;
    let user_id = login.user.id;
    assert_eq!(login.session.user_id, user_id);

    let req = test::TestRequest::post()
        .uri("/survey")
        .set_json(json!({
            "user_id": user_id,
            "page": "pre_survey",
            "answers": ["Yes", "No", "Maybe", "No", "No"],
        }))
        .to_request();
    let survey: SurveyResult = test::call_and_read_body_json(&app, req).await;
    assert_eq!(survey.saved, 5);
    assert!(survey.feedback.contains("Q3: Maybe"));

    // one answer missing
    let req = test::TestRequest::post()
        .uri("/survey")
        .set_json(json!({
            "user_id": user_id,
            "page": "post_survey",
            "answers": ["Yes", "Yes", "Yes", "Yes"],
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::post()
        .uri("/detect")
        .set_json(json!({ "text": "I am scared of the dark" }))
        .to_request();
    test::call_service(&app, req).await;

    let req = test::TestRequest::post()
        .uri("/session/finish")
        .set_json(json!({ "user_id": user_id }))
        .to_request();
    let snapshot: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(snapshot["points"], 10);
    assert_eq!(snapshot["badges"], "");

    let req = test::TestRequest::get().uri("/admin/tables/survey_responses").to_request();
    let table: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(table["rows"].as_array().map(|r| r.len()), Some(5));

    let req = test::TestRequest::get().uri("/analytics/surveys").to_request();
    let summary: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(summary["respondents"], 1);
    assert_eq!(summary["pre"].as_array().map(|q| q.len()), Some(5));
}

#[actix_web::test]
async fn garden_routes_track_the_learning_curve() {
    let app = test::init_service(App::new().app_data(context().await).configure(api::configure)).await;

    for (water, sunlight) in [(1, 1), (4, 5)] {
        let req = test::TestRequest::post()
            .uri("/garden/apply")
            .set_json(json!({ "water": water, "sunlight": sunlight }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());
    }

    let req = test::TestRequest::get().uri("/garden/curve").to_request();
    let chart: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(chart["labels"], json!(["Point 1", "Point 2"]));

    let req = test::TestRequest::post().uri("/garden/reset").to_request();
    let summary: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(summary["data_points"], 0);
}
