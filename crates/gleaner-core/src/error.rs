use thiserror::Error;

/// Boxed underlying cause carried by [`SchemaError`] variants.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failure of the AI extraction capability.
///
/// Closed set: callers match on it exhaustively, and the config generator
/// surfaces it unchanged (no retry).
#[derive(Error, Debug)]
pub enum SchemaError {
    /// The requested model cannot produce structured output.
    #[error("Model not supported: {message}")]
    ModelNotSupported {
        message: String,
        #[source]
        cause: Option<BoxError>,
    },

    /// The AI endpoint could not be reached or timed out.
    #[error("Network error: {message}")]
    NetworkError {
        message: String,
        #[source]
        cause: Option<BoxError>,
    },

    /// The model answered, but not with parseable JSON.
    #[error("Parse error: {message}")]
    ParseError {
        message: String,
        #[source]
        cause: Option<BoxError>,
    },

    /// The AI API rejected the request.
    #[error("API error: {message}")]
    ApiError {
        message: String,
        #[source]
        cause: Option<BoxError>,
    },

    /// The JSON did not fit the job schema.
    #[error("Schema conversion error: {message}")]
    SchemaConversionError {
        message: String,
        #[source]
        cause: Option<BoxError>,
    },

    /// Missing key, bad base URL, unusable schema.
    #[error("Configuration error: {message}")]
    ConfigurationError {
        message: String,
        #[source]
        cause: Option<BoxError>,
    },
}

impl SchemaError {
    pub fn model_not_supported(message: impl Into<String>) -> Self {
        SchemaError::ModelNotSupported {
            message: message.into(),
            cause: None,
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        SchemaError::NetworkError {
            message: message.into(),
            cause: None,
        }
    }

    pub fn parse(message: impl Into<String>) -> Self {
        SchemaError::ParseError {
            message: message.into(),
            cause: None,
        }
    }

    pub fn api(message: impl Into<String>) -> Self {
        SchemaError::ApiError {
            message: message.into(),
            cause: None,
        }
    }

    pub fn conversion(message: impl Into<String>) -> Self {
        SchemaError::SchemaConversionError {
            message: message.into(),
            cause: None,
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        SchemaError::ConfigurationError {
            message: message.into(),
            cause: None,
        }
    }

    /// Attach an underlying cause, replacing any previous one.
    pub fn with_cause(mut self, err: impl Into<BoxError>) -> Self {
        let slot = match &mut self {
            SchemaError::ModelNotSupported { cause, .. }
            | SchemaError::NetworkError { cause, .. }
            | SchemaError::ParseError { cause, .. }
            | SchemaError::ApiError { cause, .. }
            | SchemaError::SchemaConversionError { cause, .. }
            | SchemaError::ConfigurationError { cause, .. } => cause,
        };
        *slot = Some(err.into());
        self
    }

    pub fn message(&self) -> &str {
        match self {
            SchemaError::ModelNotSupported { message, .. }
            | SchemaError::NetworkError { message, .. }
            | SchemaError::ParseError { message, .. }
            | SchemaError::ApiError { message, .. }
            | SchemaError::SchemaConversionError { message, .. }
            | SchemaError::ConfigurationError { message, .. } => message,
        }
    }

    /// Stable snake_case name of the variant, for logs and persisted errors.
    pub fn kind(&self) -> &'static str {
        match self {
            SchemaError::ModelNotSupported { .. } => "model_not_supported",
            SchemaError::NetworkError { .. } => "network_error",
            SchemaError::ParseError { .. } => "parse_error",
            SchemaError::ApiError { .. } => "api_error",
            SchemaError::SchemaConversionError { .. } => "schema_conversion_error",
            SchemaError::ConfigurationError { .. } => "configuration_error",
        }
    }

    /// Only transport failures are worth retrying at the orchestration level.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SchemaError::NetworkError { .. })
    }
}

/// Application-wide error types for Gleaner.
#[derive(Error, Debug)]
pub enum AppError {
    /// HTTP request failed (fetching a document).
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// HTML-to-Markdown conversion failed.
    #[error("Cleaner error: {0}")]
    CleanerError(String),

    /// Malformed or missing input, e.g. a URL without a host.
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// AI extraction failed.
    #[error("AI extraction failed: {0}")]
    Schema(#[from] SchemaError),

    /// JSON serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Request timed out.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// Network/connection error.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Database or file storage operation failed.
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// Invalid configuration value.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Generic error.
    #[error("{0}")]
    Generic(String),
}

impl AppError {
    /// Returns true if this error is transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::NetworkError(_) | AppError::Timeout(_) => true,
            AppError::Schema(e) => e.is_retryable(),
            AppError::HttpError(msg) => {
                msg.contains("timeout") || msg.contains("connect") || msg.contains("reset")
            }
            _ => false,
        }
    }
}
