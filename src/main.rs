use actix_web::{middleware::Logger, web, App, HttpServer};
use std::error::Error;

use emotion_lab::api::{self, AppContext};
use emotion_lab::database::Database;
use emotion_lab::{Config, EmotionLab};

#[actix_web::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::load("config.toml")?;

    log::info!("opening database at {}", config.database.url);
    let db = Database::connect(&config.database.url).await?;

    log::info!("training emotion and plant-growth models...");
    let lab = EmotionLab::new(&config)?;
    log::info!(
        "emotion model ready: {} examples, {} terms, variant {:?}",
        lab.detector().corpus().len(),
        lab.detector().vocabulary_size(),
        lab.variant()
    );

    let ctx = web::Data::new(AppContext::new(lab, db, config.export.dir.clone()));

    log::info!(
        "starting Emotion Lab on http://{}:{}",
        config.server.host,
        config.server.port
    );

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(ctx.clone())
            .configure(api::configure)
    })
    // single worker: all model state sits behind one lock
    .workers(1)
    .bind((config.server.host.as_str(), config.server.port))?
    .run()
    .await?;

    Ok(())
}
