use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

use crate::analytics::SurveyAnalyzer;
use crate::app::EmotionLab;
use crate::database::{Database, SessionRecord, TableName, UserAccount};
use crate::error::{AppError, Result};
use crate::export;
use crate::pages::{survey_feedback, PageId};

/// Shared state behind every handler. The lab is mutated by one request at a
/// time; the lock is released before any database await.
pub struct AppContext {
    pub lab: Mutex<EmotionLab>,
    pub db: Database,
    pub export_dir: PathBuf,
}

impl AppContext {
    pub fn new(lab: EmotionLab, db: Database, export_dir: PathBuf) -> Self {
        Self {
            lab: Mutex::new(lab),
            db,
            export_dir,
        }
    }

    fn lab(&self) -> Result<MutexGuard<'_, EmotionLab>> {
        self.lab.lock().map_err(|_| AppError::StatePoisoned)
    }
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub first_name: String,
    pub last_name: String,
    pub grade: String,
}

#[derive(Serialize, Deserialize)]
pub struct LoginResponse {
    pub user: UserAccount,
    pub session: SessionRecord,
}

#[derive(Deserialize)]
pub struct SurveyRequest {
    pub user_id: i64,
    pub page: PageId,
    pub answers: Vec<String>,
}

#[derive(Serialize, Deserialize)]
pub struct SurveyResult {
    pub saved: usize,
    pub feedback: String,
}

#[derive(Deserialize)]
pub struct DetectRequest {
    pub text: String,
}

#[derive(Deserialize)]
pub struct TrainRequest {
    pub text: String,
    pub emotion: Option<String>,
}

#[derive(Deserialize)]
pub struct FinishRequest {
    pub user_id: i64,
}

#[derive(Deserialize)]
pub struct LevelsQuery {
    pub water: i64,
    pub sunlight: i64,
}

#[derive(Deserialize)]
pub struct ImproveRequest {
    pub water: i64,
    pub sunlight: i64,
    pub growth: f64,
}

#[derive(Serialize, Deserialize)]
pub struct GrowthPrediction {
    pub water: i64,
    pub sunlight: i64,
    pub growth: f64,
}

#[derive(Serialize, Deserialize)]
pub struct ExportResult {
    pub files: Vec<String>,
}

async fn health_check() -> HttpResponse {
    HttpResponse::Ok().body("Emotion Lab is running!")
}

async fn list_pages(ctx: web::Data<AppContext>) -> Result<HttpResponse> {
    let lab = ctx.lab()?;
    Ok(HttpResponse::Ok().json(lab.navigator().pages()))
}

async fn get_page(ctx: web::Data<AppContext>, path: web::Path<String>) -> Result<HttpResponse> {
    let id: PageId = path.into_inner().parse()?;
    let lab = ctx.lab()?;
    Ok(HttpResponse::Ok().json(lab.navigator().page(id)?))
}

async fn show_page(ctx: web::Data<AppContext>, path: web::Path<String>) -> Result<HttpResponse> {
    let id: PageId = path.into_inner().parse()?;
    let mut lab = ctx.lab()?;
    let page = lab.navigator_mut().show(id)?.clone();
    Ok(HttpResponse::Ok().json(page))
}

async fn next_page(ctx: web::Data<AppContext>) -> Result<HttpResponse> {
    let mut lab = ctx.lab()?;
    let page = lab.navigator_mut().advance()?.clone();
    Ok(HttpResponse::Ok().json(page))
}

async fn login(ctx: web::Data<AppContext>, req: web::Json<LoginRequest>) -> Result<HttpResponse> {
    let user = ctx
        .db
        .register_user(&req.first_name, &req.last_name, &req.grade)
        .await?;
    let session = ctx.db.record_login(user.id).await?;
    log::info!("user {} logged in (session {})", user.id, session.id);
    Ok(HttpResponse::Ok().json(LoginResponse { user, session }))
}

async fn submit_survey(
    ctx: web::Data<AppContext>,
    req: web::Json<SurveyRequest>,
) -> Result<HttpResponse> {
    let (survey_type, pairs) = {
        let lab = ctx.lab()?;
        let page = lab.navigator().page(req.page)?;
        let survey_type = page
            .survey_type()
            .ok_or_else(|| AppError::Validation(format!("page '{}' has no survey", page.id)))?;
        (survey_type, page.validate_answers(&req.answers)?)
    };

    let saved = ctx.db.save_survey(req.user_id, survey_type, &pairs).await?;
    Ok(HttpResponse::Ok().json(SurveyResult {
        saved,
        feedback: survey_feedback(&pairs),
    }))
}

async fn detect(ctx: web::Data<AppContext>, req: web::Json<DetectRequest>) -> Result<HttpResponse> {
    let outcome = ctx.lab()?.detect(&req.text)?;
    Ok(HttpResponse::Ok().json(outcome))
}

async fn train(ctx: web::Data<AppContext>, req: web::Json<TrainRequest>) -> Result<HttpResponse> {
    let outcome = ctx.lab()?.add_example(&req.text, req.emotion.as_deref())?;
    Ok(HttpResponse::Ok().json(outcome))
}

async fn get_corpus(ctx: web::Data<AppContext>) -> Result<HttpResponse> {
    let lab = ctx.lab()?;
    Ok(HttpResponse::Ok().json(lab.corpus()))
}

async fn get_progress(ctx: web::Data<AppContext>) -> Result<HttpResponse> {
    let state = ctx.lab()?.progress();
    Ok(HttpResponse::Ok().json(state))
}

async fn finish_session(
    ctx: web::Data<AppContext>,
    req: web::Json<FinishRequest>,
) -> Result<HttpResponse> {
    let draft = ctx.lab()?.snapshot();
    let snapshot = ctx.db.save_progress(req.user_id, &draft).await?;
    log::info!(
        "saved progress for user {}: {} points, badges [{}]",
        snapshot.user_id,
        snapshot.points,
        snapshot.badges
    );
    Ok(HttpResponse::Ok().json(snapshot))
}

async fn garden_predict(
    ctx: web::Data<AppContext>,
    query: web::Query<LevelsQuery>,
) -> Result<HttpResponse> {
    let growth = ctx.lab()?.garden().model().predict(query.water, query.sunlight)?;
    Ok(HttpResponse::Ok().json(GrowthPrediction {
        water: query.water,
        sunlight: query.sunlight,
        growth,
    }))
}

async fn garden_apply(
    ctx: web::Data<AppContext>,
    req: web::Json<LevelsQuery>,
) -> Result<HttpResponse> {
    let step = ctx.lab()?.garden_mut().apply_changes(req.water, req.sunlight)?;
    Ok(HttpResponse::Ok().json(step))
}

async fn garden_improve(
    ctx: web::Data<AppContext>,
    req: web::Json<ImproveRequest>,
) -> Result<HttpResponse> {
    let mut lab = ctx.lab()?;
    lab.garden_mut()
        .model_mut()
        .improve(req.water, req.sunlight, req.growth)?;
    Ok(HttpResponse::Ok().json(lab.garden().model().get_learning_curve()))
}

async fn garden_curve(ctx: web::Data<AppContext>) -> Result<HttpResponse> {
    let curve = ctx.lab()?.garden().model().get_learning_curve();
    Ok(HttpResponse::Ok().json(SurveyAnalyzer::new().learning_curve_chart(&curve)))
}

async fn garden_reset(ctx: web::Data<AppContext>) -> Result<HttpResponse> {
    let mut lab = ctx.lab()?;
    lab.garden_mut().reset()?;
    Ok(HttpResponse::Ok().json(lab.garden().summary()))
}

async fn garden_summary(ctx: web::Data<AppContext>) -> Result<HttpResponse> {
    let summary = ctx.lab()?.garden().summary();
    Ok(HttpResponse::Ok().json(summary))
}

async fn view_table(ctx: web::Data<AppContext>, path: web::Path<String>) -> Result<HttpResponse> {
    let table: TableName = path.into_inner().parse()?;
    let data = ctx.db.fetch_table(table).await?;
    Ok(HttpResponse::Ok().json(data))
}

async fn export_one(ctx: web::Data<AppContext>, path: web::Path<String>) -> Result<HttpResponse> {
    let table: TableName = path.into_inner().parse()?;
    let file = export::export_table(&ctx.db, table, &ctx.export_dir).await?;
    Ok(HttpResponse::Ok().json(ExportResult {
        files: vec![file.display().to_string()],
    }))
}

async fn export_everything(ctx: web::Data<AppContext>) -> Result<HttpResponse> {
    let files = export::export_all(&ctx.db, &ctx.export_dir).await?;
    Ok(HttpResponse::Ok().json(ExportResult {
        files: files.iter().map(|f| f.display().to_string()).collect(),
    }))
}

async fn survey_analytics(ctx: web::Data<AppContext>) -> Result<HttpResponse> {
    let responses = ctx.db.survey_responses(None).await?;
    Ok(HttpResponse::Ok().json(SurveyAnalyzer::new().summarize(&responses)))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check))
        .route("/pages", web::get().to(list_pages))
        .route("/pages/next", web::post().to(next_page))
        .route("/pages/{id}", web::get().to(get_page))
        .route("/pages/{id}/show", web::post().to(show_page))
        .route("/login", web::post().to(login))
        .route("/survey", web::post().to(submit_survey))
        .route("/detect", web::post().to(detect))
        .route("/train", web::post().to(train))
        .route("/corpus", web::get().to(get_corpus))
        .route("/progress", web::get().to(get_progress))
        .route("/session/finish", web::post().to(finish_session))
        .route("/garden/predict", web::get().to(garden_predict))
        .route("/garden/apply", web::post().to(garden_apply))
        .route("/garden/improve", web::post().to(garden_improve))
        .route("/garden/curve", web::get().to(garden_curve))
        .route("/garden/reset", web::post().to(garden_reset))
        .route("/garden/summary", web::get().to(garden_summary))
        .route("/admin/tables/{table}", web::get().to(view_table))
        .route("/admin/export", web::post().to(export_everything))
        .route("/admin/export/{table}", web::post().to(export_one))
        .route("/analytics/surveys", web::get().to(survey_analytics));
}
