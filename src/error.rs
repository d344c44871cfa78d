use thiserror::Error;

/// Errors produced while talking to the spreadsheet or handling a form.
#[derive(Debug, Error)]
pub enum FormError {
    /// The HTTP request to the spreadsheet service could not be completed
    #[error("request to spreadsheet service failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The spreadsheet service answered with a non-success status
    #[error("spreadsheet service returned {status}: {message}")]
    Api { status: u16, message: String },

    /// A range string that is not valid A1 notation
    #[error("invalid range `{0}`")]
    InvalidRange(String),

    /// An operation that needs a record id was called without one
    #[error("no record id supplied")]
    MissingId,

    /// The record id is not present in the id column
    #[error("record `{0}` not found")]
    RecordNotFound(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, FormError>;

impl FormError {
    /// True when the failure happened on the spreadsheet side of the wire.
    pub fn is_upstream(&self) -> bool {
        matches!(self, FormError::Http(_) | FormError::Api { .. })
    }
}
