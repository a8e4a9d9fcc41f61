//! The `POST /ocr` handler: normalize the body fields, resolve the
//! image bytes, classify, and wrap the result in the envelope.

use super::protocol::{OcrForm, OcrMultipart, OcrResponse};
use super::AppState;
use crate::error::OcrError;
use crate::kv;
use crate::resolver::{self, ImageSource};
use actix_multipart::form::MultipartForm;
use actix_web::{post, web, Either, Responder};
use std::collections::HashMap;
use tracing::info;

type Result<T> = std::result::Result<T, OcrError>;

/// Request fields normalized across the two accepted body encodings
struct RequestFields {
    data: Option<String>,
    file: Option<(String, Vec<u8>)>,
    url: Option<String>,
    headers: Option<String>,
    params: Option<String>,
}

impl From<OcrMultipart> for RequestFields {
    fn from(form: OcrMultipart) -> Self {
        RequestFields {
            data: form.data.map(|t| t.0),
            file: form
                .file
                .map(|f| (f.file_name.unwrap_or_default(), f.data.to_vec())),
            url: form.url.map(|t| t.0),
            headers: form.headers.map(|t| t.0),
            params: form.params.map(|t| t.0),
        }
    }
}

impl From<OcrForm> for RequestFields {
    fn from(form: OcrForm) -> Self {
        RequestFields {
            data: form.data,
            file: None,
            url: form.url,
            headers: form.headers,
            params: form.params,
        }
    }
}

/// Handle an OCR request supplied as inline base64 data, an uploaded
/// file, or a remote URL
#[post("/ocr")]
pub async fn ocr(
    body: Either<MultipartForm<OcrMultipart>, web::Form<OcrForm>>,
    state: web::Data<AppState>,
) -> Result<impl Responder> {
    let fields: RequestFields = match body {
        Either::Left(multipart) => multipart.into_inner().into(),
        Either::Right(form) => form.into_inner().into(),
    };

    let headers = parse_packed(fields.headers, kv::parse_headers)?;
    let params = parse_packed(fields.params, kv::parse_params)?;

    let source: ImageSource =
        resolver::select_source(fields.data, fields.file, fields.url, headers, params)
            .ok_or(OcrError::NoInput)?;
    let resolved = state.resolver.resolve(source).await?;

    let text = state
        .classifier
        .classify(&resolved.bytes)
        .map_err(OcrError::Internal)?;
    if text.is_empty() {
        return Err(OcrError::RecognitionFailed);
    }

    info!("finished serving ocr request ({} chars)", text.len());
    Ok(web::Json(OcrResponse::success(text, resolved.cookies)))
}

/// Parse an optional packed key-value field; empty strings count as
/// absent
fn parse_packed(
    raw: Option<String>,
    parse: impl Fn(&str) -> crate::error::Result<HashMap<String, String>>,
) -> Result<Option<HashMap<String, String>>> {
    raw.filter(|r| !r.is_empty()).map(|r| parse(&r)).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::Classifier;
    use crate::resolver::{Resolver, ResolverConfig};
    use actix_web::{test, App};
    use base64::{engine::general_purpose, Engine as _};
    use std::sync::Arc;

    /// Stand-in for the model: always recognizes the same text
    struct FixedClassifier(&'static str);

    impl Classifier for FixedClassifier {
        fn classify(&self, _image: &[u8]) -> anyhow::Result<String> {
            Ok(self.0.to_string())
        }
    }

    fn state(text: &'static str) -> web::Data<AppState> {
        web::Data::new(AppState::new(
            Arc::new(FixedClassifier(text)),
            Resolver::new(ResolverConfig::default()).unwrap(),
        ))
    }

    async fn respond(
        state: web::Data<AppState>,
        req: test::TestRequest,
    ) -> serde_json::Value {
        let app = test::init_service(App::new().app_data(state).service(ocr)).await;
        test::call_and_read_body_json(&app, req.to_request()).await
    }

    fn multipart_upload(filename: &str) -> test::TestRequest {
        let boundary = "test-boundary";
        let body = format!(
            "--{boundary}\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n\
             fake image bytes\r\n\
             --{boundary}--\r\n"
        );
        test::TestRequest::post()
            .uri("/ocr")
            .insert_header((
                "content-type",
                format!("multipart/form-data; boundary={boundary}"),
            ))
            .set_payload(body)
    }

    #[actix_web::test]
    async fn inline_data_is_recognized() {
        let encoded = general_purpose::STANDARD.encode(b"pixels");
        let req = test::TestRequest::post()
            .uri("/ocr")
            .set_form([("data", encoded.as_str())]);
        let body = respond(state("hello"), req).await;
        assert_eq!(body["code"], 200);
        assert_eq!(body["data"], "hello");
        assert!(body.get("cookies").is_none());
    }

    #[actix_web::test]
    async fn empty_request_reports_no_input() {
        let req = test::TestRequest::post()
            .uri("/ocr")
            .set_form([("data", "")]);
        let body = respond(state("hello"), req).await;
        assert_eq!(body["code"], -200);
        assert!(body.get("data").is_none());
    }

    #[actix_web::test]
    async fn malformed_base64_reports_invalid_encoding() {
        let req = test::TestRequest::post()
            .uri("/ocr")
            .set_form([("data", "!!not base64!!")]);
        let body = respond(state("hello"), req).await;
        assert_eq!(body["code"], 400);
    }

    #[actix_web::test]
    async fn malformed_headers_field_is_a_caller_error() {
        let encoded = general_purpose::STANDARD.encode(b"pixels");
        let req = test::TestRequest::post()
            .uri("/ocr")
            .set_form([("data", encoded.as_str()), ("headers", "missing-a-colon")]);
        let body = respond(state("hello"), req).await;
        assert_eq!(body["code"], -201);
    }

    #[actix_web::test]
    async fn upload_with_allowed_extension_is_recognized() {
        let body = respond(state("ok"), multipart_upload("photo.png")).await;
        assert_eq!(body["code"], 200);
        assert_eq!(body["data"], "ok");
    }

    #[actix_web::test]
    async fn upload_with_disallowed_extension_is_rejected() {
        let body = respond(state("ok"), multipart_upload("photo.exe")).await;
        assert_eq!(body["code"], -202);
        assert!(body.get("data").is_none());
    }

    #[actix_web::test]
    async fn empty_recognition_is_not_a_success() {
        let encoded = general_purpose::STANDARD.encode(b"pixels");
        let req = test::TestRequest::post()
            .uri("/ocr")
            .set_form([("data", encoded.as_str())]);
        let body = respond(state(""), req).await;
        assert_eq!(body["code"], 404);
        assert!(body.get("data").is_none());
    }
}
