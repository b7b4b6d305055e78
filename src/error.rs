use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::Serialize;
use thiserror::Error;

use crate::split::SplitError;
use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Couldn't find the desired {entity}: {id}")]
    NotFound { entity: &'static str, id: String },
    #[error("missing or invalid credentials")]
    Unauthorized,
    #[error("not allowed to access trip \"{0}\"")]
    Forbidden(String),
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    InvalidSplit(#[from] SplitError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ApiError {
    pub fn trip_not_found(id: &str) -> Self {
        ApiError::NotFound {
            entity: "trip",
            id: id.to_string(),
        }
    }

    pub fn expense_not_found(id: &str) -> Self {
        ApiError::NotFound {
            entity: "expense",
            id: id.to_string(),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::InvalidSplit(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Store(StoreError::DuplicateTrip(_))
            | ApiError::Store(StoreError::DuplicateParticipant(_)) => StatusCode::CONFLICT,
            ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let error = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("store failure: {self}");
            "internal server error".to_string()
        } else {
            self.to_string()
        };
        HttpResponse::build(status).json(ErrorBody { error })
    }
}
