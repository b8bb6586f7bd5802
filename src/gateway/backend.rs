use std::sync::Arc;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::gateway::config::ConverterConfig;
use crate::gateway::html_converter::HtmlConverter;
use crate::gateway::rules::RuleTable;

/// An HTML to Markdown conversion capability.
pub trait MarkdownConverter: Send + Sync {
    fn name(&self) -> &'static str;

    /// Convert a whole HTML document. Must not fail for any input.
    fn convert(&self, html: &str) -> String;
}

impl MarkdownConverter for HtmlConverter {
    fn name(&self) -> &'static str {
        "builtin"
    }

    fn convert(&self, html: &str) -> String {
        self.convert_to_markdown(html)
    }
}

/// Converter wrapping the `html2md` crate.
#[cfg(feature = "html2md")]
#[derive(Debug, Default)]
pub struct Html2mdConverter;

#[cfg(feature = "html2md")]
impl MarkdownConverter for Html2mdConverter {
    fn name(&self) -> &'static str {
        "html2md"
    }

    fn convert(&self, html: &str) -> String {
        html2md::parse_html(html)
    }
}

/// Which conversion engine the configuration asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConverterBackend {
    #[default]
    Builtin,
    Html2md,
}

impl ConverterBackend {
    /// Whether this engine was compiled into the binary.
    pub fn is_available(self) -> bool {
        match self {
            ConverterBackend::Builtin => true,
            ConverterBackend::Html2md => cfg!(feature = "html2md"),
        }
    }
}

/// Build the builtin converter with the configured tag aliases applied.
pub fn builtin_converter(config: &ConverterConfig) -> HtmlConverter {
    let mut rules = RuleTable::default();
    for (tag, kind) in &config.tag_aliases {
        rules.insert(tag, *kind);
    }
    HtmlConverter::with_rules(rules)
}

/// Pick the conversion engine once, at start-up.
///
/// Falls back to the builtin converter when the preferred engine is not
/// compiled in.
pub fn resolve_converter(config: &ConverterConfig) -> Arc<dyn MarkdownConverter> {
    let preferred = config.backend;
    let backend = if preferred.is_available() {
        preferred
    } else {
        warn!(
            "Converter backend {:?} is not available in this build, using builtin converter",
            preferred
        );
        ConverterBackend::Builtin
    };

    let converter: Arc<dyn MarkdownConverter> = match backend {
        #[cfg(feature = "html2md")]
        ConverterBackend::Html2md => Arc::new(Html2mdConverter),
        _ => Arc::new(builtin_converter(config)),
    };

    info!("Using {} converter for HTML conversion", converter.name());
    converter
}
