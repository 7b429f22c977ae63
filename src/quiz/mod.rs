pub mod catalog;
pub mod error;
pub mod evaluator;
pub mod score;
pub mod selector;
pub mod session;

pub use catalog::Catalog;
pub use error::QuizError;
pub use session::{Outcome, Phase, Session, Stage, Submission};

/// One selectable object: `key` identifies the object on screen, `label` is the word it stands for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordItem {
    pub key: String,
    pub label: String,
}
impl WordItem {
    pub fn new(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
        }
    }
}
