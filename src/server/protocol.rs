//! Wire types for the `/ocr` endpoint.

use crate::error::OcrError;
use actix_multipart::form::{bytes::Bytes, text::Text, MultipartForm};
use serde::{Deserialize, Serialize};

/// The envelope returned for every `/ocr` request. `data` carries the
/// recognized text on success; `cookies` only appears when the image
/// was fetched from a URL whose response set cookies.
#[derive(Debug, Serialize)]
pub struct OcrResponse {
    pub code: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cookies: Option<String>,
    pub msg: String,
}

impl OcrResponse {
    pub fn success(text: String, cookies: Option<String>) -> Self {
        OcrResponse {
            code: 200,
            data: Some(text),
            cookies,
            msg: "recognition succeeded".to_string(),
        }
    }

    pub fn failure(code: i32, msg: String) -> Self {
        OcrResponse {
            code,
            data: None,
            cookies: None,
            msg,
        }
    }
}

impl From<&OcrError> for OcrResponse {
    fn from(err: &OcrError) -> Self {
        // Internal failures stay generic on the wire
        let msg = match err {
            OcrError::Internal(_) => "internal error while processing the image".to_string(),
            other => other.to_string(),
        };
        OcrResponse::failure(err.code(), msg)
    }
}

/// `multipart/form-data` request body. All fields are optional; the
/// resolver decides which one wins.
#[derive(MultipartForm)]
pub struct OcrMultipart {
    pub data: Option<Text<String>>,
    pub file: Option<Bytes>,
    pub url: Option<Text<String>>,
    pub headers: Option<Text<String>>,
    pub params: Option<Text<String>>,
}

/// `application/x-www-form-urlencoded` request body; carries
/// everything but a file part.
#[derive(Debug, Deserialize)]
pub struct OcrForm {
    pub data: Option<String>,
    pub url: Option<String>,
    pub headers: Option<String>,
    pub params: Option<String>,
}
