use reqwest::StatusCode;
use thiserror::Error;

/// Failure kinds for one upload job.
///
/// None of these are retried internally; the first error aborts the job and
/// carries enough context (status code + response body, or the offending
/// offset) to diagnose without re-running.
#[derive(Debug, Error)]
pub enum UploadError {
    /// A control-plane call (request-urls, part destination, verify)
    /// returned a non-2xx status.
    #[error("Buildstash request failed: {status} - {body}")]
    Request { status: StatusCode, body: String },

    /// A direct or chunked data-plane PUT returned a non-2xx status.
    #[error("upload rejected by storage: {status} - {body}")]
    Upload { status: StatusCode, body: String },

    /// The server-declared chunk geometry does not line up with the
    /// measured file, or the response is missing data the chosen strategy
    /// needs.
    #[error("invalid upload plan: {0}")]
    Plan(String),

    /// Local file could not be opened, sized, or read at the required
    /// offset.
    #[error("file error: {0}")]
    Io(#[from] std::io::Error),

    /// Transport-level failure from the HTTP client.
    #[error("transport error: {0}")]
    Http(#[from] reqwest::Error),
}
