use std::path::PathBuf;

/// Failure talking to one of the external services (embedding, arbiter, graph).
///
/// None of these abort an alignment run. The façades retry what is worth
/// retrying and the engine degrades whatever is left to a `NoMatch`.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Transport-level failure (connection refused, timeout, TLS)
    #[error("HTTP request to {endpoint} failed: {source}")]
    Http {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    /// Service answered with a non-success status
    #[error("{endpoint} returned {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    /// Service asked us to slow down (HTTP 429 or a quota message)
    #[error("rate limited by {endpoint}: {message}")]
    RateLimited { endpoint: String, message: String },

    /// Response body could not be decoded
    #[error("malformed response ({context}): {source}")]
    Decode {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// Response decoded but had the wrong shape
    #[error("unexpected response shape: {0}")]
    Shape(String),

    /// Arbiter text contained no well-formed decision object
    #[error("no decision object found in: {0}")]
    NoDecision(String),

    /// Query vector and candidate vectors come from different embedding spaces
    #[error("query embedding has {query} dimensions but {mismatched} of {pool} candidates do not")]
    DimensionMismatch {
        query: usize,
        mismatched: usize,
        pool: usize,
    },

    /// Attachment could not be read
    #[error("could not read attachment {path}: {source}")]
    Attachment {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Every retry attempt failed
    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted {
        attempts: u32,
        #[source]
        last: Box<ServiceError>,
    },
}

impl ServiceError {
    /// Whether the backoff for this failure should be the long one.
    pub fn is_rate_limit(&self) -> bool {
        match self {
            ServiceError::RateLimited { .. } => true,
            ServiceError::Status { status, body, .. } => {
                *status == 429 || looks_like_quota(body)
            }
            _ => false,
        }
    }
}

fn looks_like_quota(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("qpm limit") || lower.contains("rate limit") || lower.contains("ratelimit")
}

/// Failure loading local inputs (events, scenarios, config).
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("could not read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid YAML in {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

impl LoadError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        LoadError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        LoadError::Json {
            path: path.into(),
            source,
        }
    }
}
