//! HTML to Markdown conversion gateway.
//!
//! Converts inline HTML or pages fetched by URL into Markdown, with a
//! preflight reachability check for URLs.

pub mod gateway;

pub use gateway::backend::{ConverterBackend, MarkdownConverter, resolve_converter};
pub use gateway::config::GatewayConfig;
pub use gateway::errors::{GatewayError, GatewayResult};
pub use gateway::html_converter::{HtmlConverter, normalize_whitespace};
pub use gateway::service::{
    ConversionMetadata, ConversionOptions, ConversionRequest, ConversionService, ServiceReply,
    SourceType,
};
