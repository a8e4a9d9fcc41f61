//! The user-facing JSON web server that listens for recognition
//! requests. Every handled failure is rendered as the same envelope a
//! success uses, with the failure in its `code`/`msg` fields.

use crate::classifier::Classifier;
use crate::error::OcrError;
use crate::resolver::Resolver;
use actix_web::http::header::ContentType;
use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use std::sync::Arc;
use tracing::error;

pub mod protocol;
pub mod routes;

/// State shared by all requests: the classifier loaded at startup and
/// the input resolver
pub struct AppState {
    pub classifier: Arc<dyn Classifier>,
    pub resolver: Resolver,
}

impl AppState {
    pub fn new(classifier: Arc<dyn Classifier>, resolver: Resolver) -> Self {
        AppState {
            classifier,
            resolver,
        }
    }
}

impl actix_web::error::ResponseError for OcrError {
    fn error_response(&self) -> HttpResponse {
        if let OcrError::Internal(err) = self {
            error!("internal error serving ocr request: {err:#}");
        }
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .json(protocol::OcrResponse::from(self))
    }

    fn status_code(&self) -> StatusCode {
        // Handled failures travel inside the envelope; only unexpected
        // ones surface as a transport-level 500
        match self {
            OcrError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::OK,
        }
    }
}
