use thiserror::Error;

/// Failure to retrieve or parse a listing page. Fatal to a run.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Http(#[from] curl::Error),

    #[error("HTTP {0}")]
    Status(u32),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("listing API error {code}: {message}")]
    Api { code: i64, message: String },

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("page fetch task failed: {0}")]
    Task(String),
}

/// Input that is neither a listing id nor a favorites URL carrying `fid=`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("not a favorites URL (expected e.g. https://space.bilibili.com/<uid>/favlist?fid=<id>): {0}")]
pub struct InvalidListingId(pub String);
