use std::fmt;

/// Error types for the conversion gateway
#[derive(Debug)]
pub enum GatewayError {
    /// The caller supplied an unusable or unreachable URL
    Validation(ValidationError),
    /// Fetching the source failed
    Http(HttpError),
    /// Source kind the converter does not implement (PDF, binary content)
    UnsupportedSource(String),
    /// Configuration could not be loaded or is invalid
    Configuration(ConfigurationError),
}

/// Validation specific errors, reported before any fetch is attempted
#[derive(Debug)]
pub enum ValidationError {
    InvalidUrl(String),
    Unreachable(String),
    InvalidInput(String),
}

/// Fetch specific errors
#[derive(Debug)]
pub enum HttpError {
    /// Server answered with a 4xx/5xx status
    Status { url: String, status: u16 },
    Timeout(String),
    Connection { url: String, message: String },
    /// Request could not be built or the body could not be read
    Request(String),
}

/// Configuration specific errors
#[derive(Debug)]
pub enum ConfigurationError {
    FileNotFound(String),
    ParseError(String),
    ValidationFailed(String),
    InvalidLogLevel(String),
}

impl GatewayError {
    /// HTTP status a service reply should carry for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            GatewayError::Validation(_) => 400,
            GatewayError::UnsupportedSource(_) => 501,
            GatewayError::Http(_) | GatewayError::Configuration(_) => 500,
        }
    }

    /// Short label used as the `error` field of a service reply.
    pub fn label(&self) -> &'static str {
        match self {
            GatewayError::Validation(_) => "Validation error",
            GatewayError::UnsupportedSource(_) => "Not implemented",
            GatewayError::Http(_) | GatewayError::Configuration(_) => "Internal server error",
        }
    }
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GatewayError::Validation(e) => write!(f, "Validation error: {}", e),
            GatewayError::Http(e) => write!(f, "HTTP error: {}", e),
            GatewayError::UnsupportedSource(what) => write!(f, "Unsupported source: {}", what),
            GatewayError::Configuration(e) => write!(f, "Configuration error: {}", e),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::InvalidUrl(url) => write!(f, "Invalid URL: {}", url),
            ValidationError::Unreachable(url) => write!(f, "Invalid or inaccessible URL: {}", url),
            ValidationError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
        }
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HttpError::Status { url, status } => {
                write!(f, "Request to {} failed with status {}", url, status)
            }
            HttpError::Timeout(url) => write!(f, "Request timeout for: {}", url),
            HttpError::Connection { url, message } => {
                write!(f, "Connection failed to {}: {}", url, message)
            }
            HttpError::Request(msg) => write!(f, "Request failed: {}", msg),
        }
    }
}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigurationError::FileNotFound(path) => {
                write!(f, "Configuration file not found: {}", path)
            }
            ConfigurationError::ParseError(msg) => write!(f, "Configuration parse error: {}", msg),
            ConfigurationError::ValidationFailed(msg) => {
                write!(f, "Configuration validation failed: {}", msg)
            }
            ConfigurationError::InvalidLogLevel(level) => {
                write!(f, "Invalid log level: {}", level)
            }
        }
    }
}

impl std::error::Error for GatewayError {}
impl std::error::Error for ValidationError {}
impl std::error::Error for HttpError {}
impl std::error::Error for ConfigurationError {}

impl From<ValidationError> for GatewayError {
    fn from(err: ValidationError) -> Self {
        GatewayError::Validation(err)
    }
}

impl From<HttpError> for GatewayError {
    fn from(err: HttpError) -> Self {
        GatewayError::Http(err)
    }
}

impl From<ConfigurationError> for GatewayError {
    fn from(err: ConfigurationError) -> Self {
        GatewayError::Configuration(err)
    }
}

impl From<url::ParseError> for GatewayError {
    fn from(err: url::ParseError) -> Self {
        GatewayError::Validation(ValidationError::InvalidUrl(err.to_string()))
    }
}

impl From<serde_yaml::Error> for GatewayError {
    fn from(err: serde_yaml::Error) -> Self {
        GatewayError::Configuration(ConfigurationError::ParseError(err.to_string()))
    }
}

impl From<std::io::Error> for GatewayError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => {
                GatewayError::Configuration(ConfigurationError::FileNotFound(err.to_string()))
            }
            _ => GatewayError::Configuration(ConfigurationError::ParseError(err.to_string())),
        }
    }
}

impl From<reqwest::Error> for HttpError {
    fn from(err: reqwest::Error) -> Self {
        let url = err
            .url()
            .map(|u| u.to_string())
            .unwrap_or_else(|| "<unknown>".to_string());

        if err.is_timeout() {
            HttpError::Timeout(url)
        } else if let Some(status) = err.status() {
            HttpError::Status {
                url,
                status: status.as_u16(),
            }
        } else if err.is_connect() {
            HttpError::Connection {
                url,
                message: err.to_string(),
            }
        } else {
            HttpError::Request(err.to_string())
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        GatewayError::Http(err.into())
    }
}

/// Result type alias for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;
