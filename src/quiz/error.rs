use thiserror::Error;

#[derive(Debug, Error)]
pub enum QuizError {
    /// The quiz cannot run with the given setup (empty catalog, bad words file, bad settings).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A choice key that is not part of the catalog was submitted.
    #[error("invalid choice: no object with key {0:?}")]
    InvalidChoice(String),

    #[error("failed to read words file: {0}")]
    Io(#[from] std::io::Error),
}
