pub mod analytics;
pub mod api;
pub mod app;
pub mod config;
pub mod data;
pub mod database;
pub mod error;
pub mod export;
pub mod gamification;
pub mod model;
pub mod pages;
pub mod plant;
pub mod vectorizer;

pub use app::EmotionLab;
pub use config::Config;
pub use error::{AppError, Result};
