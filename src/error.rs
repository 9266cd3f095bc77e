use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::Serialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("please enter some text")]
    EmptyInput,

    #[error("please select an emotion")]
    MissingLabel,

    #[error("unknown emotion '{0}'")]
    UnknownEmotion(String),

    #[error("the model has no training examples yet")]
    ModelNotReady,

    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },

    #[error("{0}")]
    Validation(String),

    #[error("unknown page '{0}'")]
    UnknownPage(String),

    #[error("unknown table '{0}'")]
    UnknownTable(String),

    #[error("no user with id {0}")]
    UserNotFound(i64),

    #[error("application state is unavailable")]
    StatePoisoned,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    #[error("model error: {0}")]
    Linfa(#[from] linfa::Error),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::EmptyInput
            | AppError::MissingLabel
            | AppError::UnknownEmotion(_)
            | AppError::OutOfRange { .. }
            | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::UnknownPage(_) | AppError::UnknownTable(_) | AppError::UserNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            AppError::ModelNotReady => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if self.status_code().is_server_error() {
            log::error!("request failed: {}", self);
        }
        HttpResponse::build(self.status_code()).json(ErrorBody {
            error: self.to_string(),
        })
    }
}
