#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Evaluation {
    pub correct: bool,
}

/// Exact, case-sensitive comparison. No trimming or normalization is applied.
pub fn evaluate(submitted: &str, expected: &str) -> Evaluation {
    Evaluation {
        correct: submitted == expected,
    }
}
