/// Running tally of answers. `score <= attempts` always holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScoreTracker {
    score: u32,
    attempts: u32,
}

impl ScoreTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, correct: bool) {
        self.attempts += 1;
        if correct {
            self.score += 1;
        }
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Share of correct answers in whole percent, halves rounded up. 0 before any attempt.
    pub fn percentage(&self) -> u8 {
        if self.attempts == 0 {
            return 0;
        }
        let score = u64::from(self.score);
        let attempts = u64::from(self.attempts);
        ((200 * score + attempts) / (2 * attempts)) as u8
    }
}
