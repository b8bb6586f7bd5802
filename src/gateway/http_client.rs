use std::collections::HashMap;
use std::time::Duration;

use log::{debug, info, warn};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::redirect::Policy;

use crate::gateway::errors::HttpError;

pub const DEFAULT_USER_AGENT: &str = concat!("markgate/", env!("CARGO_PKG_VERSION"));

const MAX_REDIRECTS: usize = 10;

/// Per-request fetch settings.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Extra request headers, e.g. `Authorization`
    pub headers: Option<HashMap<String, String>>,
    pub timeout: Duration,
    pub verify_ssl: bool,
    pub user_agent: String,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            headers: None,
            timeout: Duration::from_secs(30),
            verify_ssl: false,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// Body of a fetched resource.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchedContent {
    /// HTML or XHTML, decoded as UTF-8 (invalid sequences replaced)
    Text(String),
    /// Anything else, untouched
    Binary(Vec<u8>),
}

#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub content: FetchedContent,
    /// Lower-cased header names; repeated headers are joined with ", "
    pub headers: HashMap<String, String>,
    pub size_bytes: u64,
}

impl FetchResponse {
    pub fn content_type(&self) -> &str {
        self.headers
            .get("content-type")
            .map(String::as_str)
            .unwrap_or_default()
    }
}

/// Each call builds its own client so no connection outlives the request.
fn build_client(timeout: Duration, verify_ssl: bool, user_agent: &str) -> Result<reqwest::Client, HttpError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .redirect(Policy::limited(MAX_REDIRECTS))
        .danger_accept_invalid_certs(!verify_ssl)
        .pool_max_idle_per_host(0)
        .user_agent(user_agent)
        .build()
        .map_err(|e| HttpError::Request(format!("failed to build HTTP client: {}", e)))
}

fn to_header_map(headers: &HashMap<String, String>) -> Result<HeaderMap, HttpError> {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| HttpError::Request(format!("invalid header name: {}", name)))?;
        let header_value = HeaderValue::from_str(value)
            .map_err(|_| HttpError::Request(format!("invalid value for header {}", name)))?;
        map.append(header_name, header_value);
    }
    Ok(map)
}

fn from_header_map(headers: &HeaderMap) -> HashMap<String, String> {
    let mut map: HashMap<String, String> = HashMap::new();
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        map.entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert(value);
    }
    map
}

pub fn is_html_content_type(content_type: &str) -> bool {
    let content_type = content_type.to_ascii_lowercase();
    content_type.contains("text/html") || content_type.contains("application/xhtml+xml")
}

/// GET `url`, following redirects, and return its body.
///
/// Any 4xx/5xx status, connection failure or timeout is an error. The timeout
/// covers the whole exchange, body included.
pub async fn fetch_url_content(url: &str, options: &FetchOptions) -> Result<FetchResponse, HttpError> {
    info!("Fetching content from URL: {}", url);

    let client = build_client(options.timeout, options.verify_ssl, &options.user_agent)?;
    let mut request = client.get(url);
    if let Some(headers) = &options.headers {
        request = request.headers(to_header_map(headers)?);
    }

    let response = request.send().await?.error_for_status()?;
    let final_url = response.url().to_string();
    let headers = from_header_map(response.headers());
    let body = response.bytes().await?;
    let size_bytes = body.len() as u64;

    let content_type = headers.get("content-type").cloned().unwrap_or_default();
    info!(
        "Successfully fetched content from URL: {} (type: {}, size: {} bytes)",
        url, content_type, size_bytes
    );
    if final_url != url {
        debug!("Request for {} was redirected to {}", url, final_url);
    }

    let content = if is_html_content_type(&content_type) {
        FetchedContent::Text(String::from_utf8_lossy(&body).into_owned())
    } else {
        FetchedContent::Binary(body.to_vec())
    };

    Ok(FetchResponse {
        content,
        headers,
        size_bytes,
    })
}

/// Preflight check: HEAD `url` with redirects and report whether it answered
/// below 400. Never fails; errors count as unreachable.
///
/// Uses the TLS setting and user agent of `options` but only the given
/// `timeout`; caller headers are not sent.
pub async fn is_reachable(url: &str, timeout: Duration, options: &FetchOptions) -> bool {
    let result = async {
        let client = build_client(timeout, options.verify_ssl, &options.user_agent)?;
        let response = client.head(url).send().await?;
        Ok::<_, HttpError>(response.status())
    }
    .await;

    match result {
        Ok(status) if status.as_u16() < 400 => true,
        Ok(status) => {
            warn!("URL validation failed for {}: status {}", url, status.as_u16());
            false
        }
        Err(e) => {
            warn!("URL validation failed for {}: {}", url, e);
            false
        }
    }
}
