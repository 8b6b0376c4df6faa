use thiserror::Error;

/// Postgres `unique_violation`, surfaced by the backend when a pseudonym is taken.
pub const UNIQUE_VIOLATION: &str = "23505";

#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Backend error {status}: {message}")]
    Backend {
        status: u16,
        code: Option<String>,
        message: String,
    },

    #[error("Pseudonym is already taken")]
    DuplicatePseudonym,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid id: {0}")]
    InvalidId(#[from] uuid::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Invalid content: {0}")]
    InvalidContent(#[from] anyhow::Error),

    #[error("Content generation failed: {0}")]
    Generation(String),

    #[error("No questions available with the selected filters")]
    EmptyQuestionPool,

    #[error("No sources selected or available")]
    NoSources,

    #[error("Invalid choice: {0}")]
    InvalidChoice(String),
}

impl Error {
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, Error::Backend { code: Some(code), .. } if code == UNIQUE_VIOLATION)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
