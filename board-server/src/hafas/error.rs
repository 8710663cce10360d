//! HAFAS client error types.

/// Errors from the HAFAS HTTP client.
#[derive(Debug, thiserror::Error)]
pub enum HafasError {
    /// HTTP request failed (network error, timeout, etc.)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON deserialization failed
    #[error("JSON parse error: {message}")]
    Json {
        message: String,
        /// Truncated response body, for diagnosis.
        body: Option<String>,
    },

    /// API returned an error status code
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// The queried stop is unknown to the endpoint
    #[error("stop {stop_id} not found")]
    StopNotFound { stop_id: String },

    /// Rate limited by the API
    #[error("rate limited by the HAFAS endpoint")]
    RateLimited,
}
