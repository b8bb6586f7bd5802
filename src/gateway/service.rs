use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::gateway::backend::MarkdownConverter;
use crate::gateway::config::FetchConfig;
use crate::gateway::errors::{GatewayError, GatewayResult, ValidationError};
use crate::gateway::http_client::{FetchOptions, FetchedContent, fetch_url_content, is_reachable};
use crate::gateway::title::extract_title;

/// Kind of source a conversion request refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Pdf,
    HtmlUrl,
    HtmlSource,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ConversionOptions {
    pub include_metadata: bool,
    pub preserve_images: bool,
    /// Headers sent when fetching an `html_url` source
    pub headers: Option<HashMap<String, String>>,
    /// Falls back to the configured `fetch.verify_ssl` when omitted
    pub verify_ssl: Option<bool>,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            include_metadata: true,
            preserve_images: false,
            headers: None,
            verify_ssl: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ConversionRequest {
    #[serde(rename = "type")]
    pub source_type: SourceType,
    /// URL or inline HTML, depending on `source_type`
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<ConversionOptions>,
}

/// Facts about one conversion; built once and never changed.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ConversionMetadata {
    pub title: Option<String>,
    #[serde(rename = "source_type")]
    pub source_kind: SourceType,
    #[serde(rename = "processing_time_ms")]
    pub elapsed_millis: u64,
    #[serde(rename = "file_size_bytes")]
    pub size_bytes: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ConversionResponse {
    pub success: bool,
    pub markdown: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ConversionMetadata>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HashMap<String, String>>,
}

impl From<&GatewayError> for ErrorResponse {
    fn from(err: &GatewayError) -> Self {
        let mut details = HashMap::new();
        details.insert("message".to_string(), err.to_string());
        Self {
            success: false,
            error: err.label().to_string(),
            details: Some(details),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ReplyBody {
    Converted(ConversionResponse),
    Failed(ErrorResponse),
}

/// Outcome of [`ConversionService::handle`]: an HTTP status and a JSON body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceReply {
    pub status: u16,
    pub body: ReplyBody,
}

impl ServiceReply {
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(&self.body).unwrap_or_else(|e| {
            format!(r#"{{"success":false,"error":"Internal server error","details":{{"message":"{}"}}}}"#, e)
        })
    }
}

fn elapsed_millis(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Converts HTML sources with a converter chosen once at start-up.
#[derive(Clone)]
pub struct ConversionService {
    converter: Arc<dyn MarkdownConverter>,
    fetch: FetchConfig,
}

impl ConversionService {
    pub fn new(converter: Arc<dyn MarkdownConverter>, fetch: FetchConfig) -> Self {
        Self { converter, fetch }
    }

    pub fn converter_name(&self) -> &'static str {
        self.converter.name()
    }

    /// Convert inline HTML. Cannot fail.
    pub fn convert_source(&self, html: &str) -> (String, ConversionMetadata) {
        let start_time = Instant::now();

        let title = extract_title(html);
        let markdown = self.converter.convert(html);

        let metadata = ConversionMetadata {
            title,
            source_kind: SourceType::HtmlSource,
            elapsed_millis: elapsed_millis(start_time),
            size_bytes: Some(html.len() as u64),
        };
        debug!("Converted inline HTML source: {:?}", metadata);
        (markdown, metadata)
    }

    /// Configured fetch options with the caller's headers and TLS override.
    fn fetch_options(&self, headers: Option<HashMap<String, String>>, verify_ssl: Option<bool>) -> FetchOptions {
        let mut options = self.fetch.fetch_options();
        options.headers = headers;
        if let Some(verify_ssl) = verify_ssl {
            options.verify_ssl = verify_ssl;
        }
        options
    }

    /// Validate, preflight, fetch and convert the page at `url`.
    ///
    /// `verify_ssl` overrides the configured default when given.
    pub async fn convert_url(
        &self,
        url: &str,
        headers: Option<HashMap<String, String>>,
        verify_ssl: Option<bool>,
    ) -> GatewayResult<(String, ConversionMetadata)> {
        let parsed = Url::parse(url)?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ValidationError::InvalidUrl(format!(
                "{} (only http and https are supported)",
                url
            ))
            .into());
        }

        let options = self.fetch_options(headers, verify_ssl);
        if !is_reachable(url, self.fetch.preflight_timeout(), &options).await {
            return Err(ValidationError::Unreachable(url.to_string()).into());
        }

        let start_time = Instant::now();

        let response = fetch_url_content(url, &options).await?;

        let html = match response.content {
            FetchedContent::Text(html) => html,
            FetchedContent::Binary(_) => {
                let content_type = response
                    .headers
                    .get("content-type")
                    .cloned()
                    .unwrap_or_else(|| "unknown content type".to_string());
                return Err(GatewayError::UnsupportedSource(format!(
                    "{} returned {}, not HTML",
                    url, content_type
                )));
            }
        };

        let title = extract_title(&html);
        let markdown = self.converter.convert(&html);

        let metadata = ConversionMetadata {
            title,
            source_kind: SourceType::HtmlUrl,
            elapsed_millis: elapsed_millis(start_time),
            size_bytes: Some(response.size_bytes),
        };
        Ok((markdown, metadata))
    }

    /// Dispatch a request by source type.
    pub async fn convert(&self, request: &ConversionRequest) -> GatewayResult<(String, ConversionMetadata)> {
        let options = request.options.clone().unwrap_or_default();
        match request.source_type {
            SourceType::HtmlUrl => {
                self.convert_url(&request.source, options.headers, options.verify_ssl)
                    .await
            }
            SourceType::HtmlSource => Ok(self.convert_source(&request.source)),
            SourceType::Pdf => Err(GatewayError::UnsupportedSource(
                "PDF conversion is not yet implemented".to_string(),
            )),
        }
    }

    /// Handle a request end to end, mapping failures to an error reply.
    ///
    /// Metadata is part of the reply unless the request sets
    /// `include_metadata: false`; a request without `options` gets it too.
    pub async fn handle(&self, request: &ConversionRequest) -> ServiceReply {
        let start_time = Instant::now();
        info!("Received conversion request of type: {:?}", request.source_type);

        let include_metadata = request
            .options
            .as_ref()
            .map(|options| options.include_metadata)
            .unwrap_or(true);

        match self.convert(request).await {
            Ok((markdown, metadata)) => {
                info!("Conversion completed successfully in {}ms", elapsed_millis(start_time));
                ServiceReply {
                    status: 200,
                    body: ReplyBody::Converted(ConversionResponse {
                        success: true,
                        markdown,
                        metadata: include_metadata.then_some(metadata),
                    }),
                }
            }
            Err(err) => {
                warn!("Conversion request failed: {}", err);
                ServiceReply {
                    status: err.status_code(),
                    body: ReplyBody::Failed(ErrorResponse::from(&err)),
                }
            }
        }
    }
}
