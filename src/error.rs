//! The error type shared by the resolver, the classifier and the web
//! layer. Every variant maps to a distinct envelope code; none of them
//! are fatal to the process.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, OcrError>;

/// Everything that can go wrong while turning a request into
/// recognized text.
#[derive(Debug, Error)]
pub enum OcrError {
    /// None of `data`, `file` or `url` was populated
    #[error("no image input provided")]
    NoInput,

    /// Inline image data was not valid base64
    #[error("invalid base64 image data: {0}")]
    InvalidEncoding(String),

    /// Uploaded file name has a missing or disallowed extension
    #[error("unsupported file format: {0:?}")]
    UnsupportedFormat(String),

    /// Remote image could not be fetched
    #[error("failed to fetch image from url: {0}")]
    FetchFailed(String),

    /// The packed `headers`/`params` form field could not be parsed
    #[error("malformed key-value field: {0}")]
    MalformedKeyValue(String),

    /// The classifier produced no text for otherwise-valid bytes
    #[error("recognition produced no text")]
    RecognitionFailed,

    /// Anything unexpected; surfaced as a generic internal error
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl OcrError {
    /// The `code` reported in the response envelope. Success is 200;
    /// the negative codes follow the upstream numbering for request
    /// shapes the caller got wrong.
    pub fn code(&self) -> i32 {
        match self {
            OcrError::NoInput => -200,
            OcrError::MalformedKeyValue(_) => -201,
            OcrError::UnsupportedFormat(_) => -202,
            OcrError::FetchFailed(_) => -203,
            OcrError::InvalidEncoding(_) => 400,
            OcrError::RecognitionFailed => 404,
            OcrError::Internal(_) => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_distinct() {
        let errs = [
            OcrError::NoInput,
            OcrError::MalformedKeyValue("x".into()),
            OcrError::UnsupportedFormat("x".into()),
            OcrError::FetchFailed("x".into()),
            OcrError::InvalidEncoding("x".into()),
            OcrError::RecognitionFailed,
            OcrError::Internal(anyhow::anyhow!("x")),
        ];
        let mut codes: Vec<i32> = errs.iter().map(|e| e.code()).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), errs.len());
    }
}
