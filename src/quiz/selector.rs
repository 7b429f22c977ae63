use rand::seq::SliceRandom;
use rand::Rng;

use crate::quiz::{QuizError, WordItem};

/// Picks the next prompt at random, never repeating `previous_key` unless there is nothing else.
pub fn select_next<'a, R: Rng + ?Sized>(
    items: &'a [WordItem],
    previous_key: Option<&str>,
    rng: &mut R,
) -> Result<&'a WordItem, QuizError> {
    if items.is_empty() {
        return Err(QuizError::Configuration(
            "cannot pick a question from an empty catalog".to_string(),
        ));
    }

    let candidates = items
        .iter()
        .filter(|item| Some(item.key.as_str()) != previous_key)
        .collect::<Vec<_>>();

    let picked = if candidates.is_empty() {
        // Single-item catalog: repeating is the only option
        items.choose(rng)
    } else {
        candidates.choose(rng).copied()
    };

    picked.ok_or_else(|| QuizError::Configuration("catalog is empty".to_string()))
}
