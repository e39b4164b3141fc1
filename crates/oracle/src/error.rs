/// Errors from a single oracle request.
#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The oracle returned a non-2xx status code.
    #[error("Oracle API error ({status}): {body}")]
    ApiError {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The response parsed but carried no message text.
    #[error("Oracle response contained no message content")]
    EmptyResponse,
}

impl OracleError {
    /// Whether a retry could plausibly succeed.
    ///
    /// Connection failures, timeouts, rate limiting (429) and server
    /// errors (5xx) are transient. Client errors and empty replies are not.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Request(e) => e.is_timeout() || e.is_connect(),
            Self::ApiError { status, .. } => *status == 429 || *status >= 500,
            Self::EmptyResponse => false,
        }
    }
}
