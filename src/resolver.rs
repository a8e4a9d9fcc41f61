//! The input resolver turns the three ways a request can supply an
//! image -- inline base64 data, an uploaded file, a remote URL -- into
//! one raw byte buffer for the classifier. The classifier never learns
//! where the bytes came from.

use crate::config;
use crate::error::{OcrError, Result};
use anyhow::Context;
use base64::{engine::general_purpose, Engine as _};
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tracing::debug;

/// Markers that introduce an inline data-URI payload
const DATA_URI_MARKERS: &[&str] = &["data:image/", "data:application/"];

/// One image input, already narrowed to a single variant
pub enum ImageSource {
    /// Base64 string, raw or carrying a data-URI prefix
    Inline { encoded: String },

    /// An uploaded file part
    Upload { name: String, bytes: Vec<u8> },

    /// A URL to fetch, with optional extra request headers and query
    /// params
    Remote {
        url: String,
        headers: Option<HashMap<String, String>>,
        params: Option<HashMap<String, String>>,
    },
}

impl std::fmt::Debug for ImageSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImageSource::Inline { encoded } => {
                write!(f, "Inline {{ {} base64 chars }}", encoded.len())
            }
            ImageSource::Upload { name, bytes } => {
                write!(f, "Upload {{ name: {:?}, {} bytes }}", name, bytes.len())
            }
            ImageSource::Remote { url, .. } => write!(f, "Remote {{ url: {:?} }}", url),
        }
    }
}

/// The resolver's output: raw image bytes, plus the response cookies
/// when the image came from a remote fetch
#[derive(Debug)]
pub struct ResolvedImage {
    pub bytes: Vec<u8>,
    pub cookies: Option<String>,
}

/// Knobs that differ between deployments of this service
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Retry a failed inline decode after stripping a non-canonical
    /// `data:<mime>;base64,` prefix
    pub probe_base64_prefixes: bool,

    /// Bound on a single remote fetch
    pub fetch_timeout: Duration,

    /// Lowercased file extensions accepted for uploads
    pub allowed_extensions: HashSet<String>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        ResolverConfig {
            probe_base64_prefixes: false,
            fetch_timeout: config::FETCH_TIMEOUT,
            allowed_extensions: config::ALLOWED_EXTENSIONS
                .iter()
                .map(|e| e.to_string())
                .collect(),
        }
    }
}

/// Pick the populated input variant. `data` wins over `file`, `file`
/// over `url`; empty strings count as absent. The extra `headers` and
/// `params` only ride along with the remote variant.
pub fn select_source(
    data: Option<String>,
    file: Option<(String, Vec<u8>)>,
    url: Option<String>,
    headers: Option<HashMap<String, String>>,
    params: Option<HashMap<String, String>>,
) -> Option<ImageSource> {
    if let Some(encoded) = data.filter(|d| !d.is_empty()) {
        return Some(ImageSource::Inline { encoded });
    }
    if let Some((name, bytes)) = file {
        return Some(ImageSource::Upload { name, bytes });
    }
    if let Some(url) = url.filter(|u| !u.is_empty()) {
        return Some(ImageSource::Remote {
            url,
            headers,
            params,
        });
    }
    None
}

/// Converts an [`ImageSource`] into a [`ResolvedImage`]. Only the
/// remote variant touches the network; nothing is retried.
pub struct Resolver {
    config: ResolverConfig,
    http: reqwest::Client,
}

impl Resolver {
    pub fn new(config: ResolverConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.fetch_timeout)
            .build()
            .context("failed to build http client")?;
        Ok(Resolver { config, http })
    }

    pub async fn resolve(&self, source: ImageSource) -> Result<ResolvedImage> {
        debug!("resolving image source {source:?}");
        match source {
            ImageSource::Inline { encoded } => {
                let bytes = self.decode_inline(&encoded)?;
                if bytes.is_empty() {
                    return Err(OcrError::InvalidEncoding("decoded image is empty".into()));
                }
                Ok(ResolvedImage {
                    bytes,
                    cookies: None,
                })
            }
            ImageSource::Upload { name, bytes } => {
                if !self.allowed_file(&name) {
                    return Err(OcrError::UnsupportedFormat(name));
                }
                Ok(ResolvedImage {
                    bytes,
                    cookies: None,
                })
            }
            ImageSource::Remote {
                url,
                headers,
                params,
            } => self.fetch_remote(&url, headers, params).await,
        }
    }

    /// Decode an inline base64 payload. A recognized data-URI prefix is
    /// split off at the first comma; otherwise the whole string is the
    /// payload.
    fn decode_inline(&self, encoded: &str) -> Result<Vec<u8>> {
        if DATA_URI_MARKERS.iter().any(|m| encoded.starts_with(m)) {
            let payload = encoded
                .split_once(',')
                .map(|(_, payload)| payload)
                .ok_or_else(|| {
                    OcrError::InvalidEncoding("data URI has no payload after its media type".into())
                })?;
            return general_purpose::STANDARD
                .decode(payload)
                .map_err(|err| OcrError::InvalidEncoding(err.to_string()));
        }

        match general_purpose::STANDARD.decode(encoded) {
            Ok(bytes) => Ok(bytes),
            Err(err) => {
                // Optional leniency: the payload may carry a prefix the
                // markers above don't recognize. One retry past the
                // first comma, no further guessing.
                if self.config.probe_base64_prefixes {
                    if let Some((_, payload)) = encoded.split_once(',') {
                        if let Ok(bytes) = general_purpose::STANDARD.decode(payload) {
                            return Ok(bytes);
                        }
                    }
                }
                Err(OcrError::InvalidEncoding(err.to_string()))
            }
        }
    }

    /// Extension-based acceptance check for uploads. The content itself
    /// is not sniffed.
    fn allowed_file(&self, name: &str) -> bool {
        name.rsplit_once('.')
            .map(|(_, ext)| self.config.allowed_extensions.contains(&ext.to_lowercase()))
            .unwrap_or(false)
    }

    /// GET the image with the caller's headers and query params merged
    /// in, and render any response cookies as `k1=v1; k2=v2`.
    async fn fetch_remote(
        &self,
        url: &str,
        headers: Option<HashMap<String, String>>,
        params: Option<HashMap<String, String>>,
    ) -> Result<ResolvedImage> {
        let mut request = self.http.get(url);
        if let Some(params) = &params {
            request = request.query(params);
        }
        if let Some(headers) = &headers {
            for (name, value) in headers {
                request = request.header(name.as_str(), value.as_str());
            }
        }

        let response = request
            .send()
            .await
            .map_err(|err| OcrError::FetchFailed(fetch_cause(&err)))?;
        let status = response.status();
        if !status.is_success() {
            return Err(OcrError::FetchFailed(format!("HTTP {status}")));
        }

        let cookies = response
            .cookies()
            .map(|c| format!("{}={}", c.name(), c.value()))
            .collect::<Vec<_>>()
            .join("; ");
        let bytes = response
            .bytes()
            .await
            .map_err(|err| OcrError::FetchFailed(fetch_cause(&err)))?
            .to_vec();
        if bytes.is_empty() {
            return Err(OcrError::FetchFailed("response body was empty".into()));
        }

        debug!("fetched {} bytes from {url}", bytes.len());
        Ok(ResolvedImage {
            bytes,
            cookies: (!cookies.is_empty()).then_some(cookies),
        })
    }
}

fn fetch_cause(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        "request timed out".to_string()
    } else if err.is_connect() {
        "connection failed".to_string()
    } else {
        err.to_string()
    }
}
