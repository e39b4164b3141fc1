//! Annotation oracle client library.
//!
//! Defines the [`AnnotationOracle`] seam the ingestion pipeline talks to,
//! an OpenAI-compatible chat-completions implementation ([`OpenAiOracle`]),
//! and bounded exponential-backoff retry for transient failures.

pub mod api;
pub mod config;
pub mod error;
pub mod retry;

pub use api::OpenAiOracle;
pub use config::OracleConfig;
pub use error::OracleError;
pub use retry::RetryConfig;

/// Anything that accepts an image plus a text instruction and returns
/// free-form text.
///
/// The pipeline only depends on this trait, so a local captioning model
/// or a test double can stand in for the hosted service.
pub trait AnnotationOracle: Send + Sync {
    /// Annotate one base64-encoded JPEG according to `instruction`.
    ///
    /// Returns the raw reply text. Extracting JSON from it is the
    /// caller's job.
    fn annotate(
        &self,
        image_b64: &str,
        instruction: &str,
    ) -> impl std::future::Future<Output = Result<String, OracleError>> + Send;
}
