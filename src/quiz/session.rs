use std::sync::Arc;
use std::time::Duration;

use log::debug;
use rand::Rng;

use crate::quiz::evaluator::evaluate;
use crate::quiz::score::ScoreTracker;
use crate::quiz::selector::select_next;
use crate::quiz::{Catalog, QuizError, WordItem};

pub const DEFAULT_FEEDBACK_DELAY: Duration = Duration::from_millis(800);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Correct,
    Wrong,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No question has been posed yet.
    NotStarted,
    AwaitingInput,
    /// Feedback for the last answer is playing; input is dropped.
    Locked,
    Stopped,
}

/// What happened to a submitted choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    Scored(Outcome),
    /// Arrived while the session was not accepting input.
    Ignored,
}

/// Presentation side of a session: whatever shows the objects, plays sounds and keeps time.
pub trait Stage {
    /// Handle for a scheduled advance, used to cancel it.
    type Timer;

    /// Show `item.label` and play the audio cue for `item.key`.
    fn announce_prompt(&mut self, item: &WordItem);

    fn play_feedback(&mut self, target_id: &str, outcome: Outcome);

    /// Call `Session::advance_to_next_question` once `delay` has passed,
    /// unless the session is gone by then.
    fn schedule_after(&mut self, delay: Duration) -> Self::Timer;

    fn cancel(&mut self, timer: Self::Timer);

    fn render_score(&mut self, score: u32, attempts: u32, percentage: u8);
}

/// The question/answer loop. Only `start`, `submit_answer`, `advance_to_next_question`
/// and `stop` change its state.
pub struct Session<S: Stage, R: Rng> {
    catalog: Arc<Catalog>,
    stage: S,
    rng: R,
    feedback_delay: Duration,
    current_prompt: Option<WordItem>,
    previous_prompt_key: Option<String>,
    phase: Phase,
    tracker: ScoreTracker,
    pending_advance: Option<S::Timer>,
}

impl<S: Stage, R: Rng> Session<S, R> {
    pub fn new(catalog: Arc<Catalog>, stage: S, rng: R, feedback_delay: Duration) -> Self {
        Self {
            catalog,
            stage,
            rng,
            feedback_delay,
            current_prompt: None,
            previous_prompt_key: None,
            phase: Phase::NotStarted,
            tracker: ScoreTracker::new(),
            pending_advance: None,
        }
    }

    /// Poses the first question.
    pub fn start(&mut self) -> Result<(), QuizError> {
        if self.phase != Phase::NotStarted {
            debug!("start ignored, session is {:?}", self.phase);
            return Ok(());
        }
        self.pose_question()
    }

    /// Judges the object picked by the learner and locks input until the next question.
    pub fn submit_answer(&mut self, choice_key: &str) -> Result<Submission, QuizError> {
        if self.phase != Phase::AwaitingInput {
            debug!("dropping choice {:?}, session is {:?}", choice_key, self.phase);
            return Ok(Submission::Ignored);
        }
        let chosen = self
            .catalog
            .get(choice_key)
            .ok_or_else(|| QuizError::InvalidChoice(choice_key.to_string()))?;
        let prompt = match &self.current_prompt {
            Some(prompt) => prompt,
            None => return Ok(Submission::Ignored),
        };

        let evaluation = evaluate(&chosen.label, &prompt.label);
        let prompt_key = prompt.key.clone();
        let chosen_key = chosen.key.clone();

        self.tracker.record(evaluation.correct);
        let outcome = if evaluation.correct {
            Outcome::Correct
        } else {
            Outcome::Wrong
        };
        debug!(
            "choice {:?} for prompt {:?}: {:?} ({}/{})",
            chosen_key,
            prompt_key,
            outcome,
            self.tracker.score(),
            self.tracker.attempts()
        );

        self.stage.play_feedback(&chosen_key, outcome);
        self.render_score();

        self.previous_prompt_key = Some(prompt_key);
        self.phase = Phase::Locked;
        self.pending_advance = Some(self.stage.schedule_after(self.feedback_delay));

        Ok(Submission::Scored(outcome))
    }

    /// Fired by the stage once feedback is over. Stale calls are no-ops.
    pub fn advance_to_next_question(&mut self) -> Result<(), QuizError> {
        if self.phase != Phase::Locked {
            debug!("advance ignored, session is {:?}", self.phase);
            return Ok(());
        }
        self.pending_advance = None;
        self.pose_question()
    }

    /// Ends the session and cancels a pending advance.
    pub fn stop(&mut self) {
        if let Some(timer) = self.pending_advance.take() {
            self.stage.cancel(timer);
        }
        self.phase = Phase::Stopped;
    }

    pub fn render_score(&mut self) {
        self.stage.render_score(
            self.tracker.score(),
            self.tracker.attempts(),
            self.tracker.percentage(),
        );
    }

    fn pose_question(&mut self) -> Result<(), QuizError> {
        let next = select_next(
            self.catalog.items(),
            self.previous_prompt_key.as_deref(),
            &mut self.rng,
        )?
        .clone();
        debug!("next prompt {:?}", next.key);

        self.stage.announce_prompt(&next);
        self.current_prompt = Some(next);
        self.phase = Phase::AwaitingInput;
        Ok(())
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn current_prompt(&self) -> Option<&WordItem> {
        self.current_prompt.as_ref()
    }

    #[cfg(test)]
    pub fn previous_prompt_key(&self) -> Option<&str> {
        self.previous_prompt_key.as_deref()
    }

    pub fn tracker(&self) -> &ScoreTracker {
        &self.tracker
    }

    pub fn stage_mut(&mut self) -> &mut S {
        &mut self.stage
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Effect {
        Announce(String),
        Feedback(String, Outcome),
        Schedule(Duration),
        Cancel(usize),
        Score(u32, u32, u8),
    }

    #[derive(Default)]
    struct RecordingStage {
        effects: Vec<Effect>,
        next_timer: usize,
    }

    impl Stage for RecordingStage {
        type Timer = usize;

        fn announce_prompt(&mut self, item: &WordItem) {
            self.effects.push(Effect::Announce(item.key.clone()));
        }

        fn play_feedback(&mut self, target_id: &str, outcome: Outcome) {
            self.effects
                .push(Effect::Feedback(target_id.to_string(), outcome));
        }

        fn schedule_after(&mut self, delay: Duration) -> usize {
            self.effects.push(Effect::Schedule(delay));
            self.next_timer += 1;
            self.next_timer
        }

        fn cancel(&mut self, timer: usize) {
            self.effects.push(Effect::Cancel(timer));
        }

        fn render_score(&mut self, score: u32, attempts: u32, percentage: u8) {
            self.effects.push(Effect::Score(score, attempts, percentage));
        }
    }

    fn abcd() -> Arc<Catalog> {
        Arc::new(
            Catalog::new(vec![
                WordItem::new("A", "alfa"),
                WordItem::new("B", "bravo"),
                WordItem::new("C", "charlie"),
                WordItem::new("D", "delta"),
            ])
            .unwrap(),
        )
    }

    fn session(catalog: Arc<Catalog>, seed: u64) -> Session<RecordingStage, StdRng> {
        Session::new(
            catalog,
            RecordingStage::default(),
            StdRng::seed_from_u64(seed),
            DEFAULT_FEEDBACK_DELAY,
        )
    }

    fn started(seed: u64) -> Session<RecordingStage, StdRng> {
        let mut s = session(abcd(), seed);
        s.start().unwrap();
        s
    }

    fn current_key(s: &Session<RecordingStage, StdRng>) -> String {
        s.current_prompt().unwrap().key.clone()
    }

    fn wrong_key(s: &Session<RecordingStage, StdRng>) -> String {
        let current = current_key(s);
        ["A", "B", "C", "D"]
            .into_iter()
            .find(|k| *k != current)
            .unwrap()
            .to_string()
    }

    fn feedback_count(s: &mut Session<RecordingStage, StdRng>) -> usize {
        s.stage_mut()
            .effects
            .iter()
            .filter(|e| matches!(e, Effect::Feedback(..)))
            .count()
    }

    #[test]
    fn fresh_session_has_no_prompt() {
        let s = session(abcd(), 0);
        assert_eq!(s.phase(), Phase::NotStarted);
        assert!(s.current_prompt().is_none());
        assert!(s.previous_prompt_key().is_none());
        assert_eq!(s.tracker().attempts(), 0);
    }

    #[test]
    fn start_announces_first_prompt() {
        let mut s = started(1);
        assert_eq!(s.phase(), Phase::AwaitingInput);
        assert_ne!(s.phase(), Phase::Locked);
        let key = current_key(&s);
        assert_eq!(s.stage_mut().effects, vec![Effect::Announce(key)]);
        assert!(s.previous_prompt_key().is_none());
    }

    #[test]
    fn correct_answer_scores_and_locks() {
        let mut s = started(2);
        let prompt = current_key(&s);

        let result = s.submit_answer(&prompt).unwrap();

        assert_eq!(result, Submission::Scored(Outcome::Correct));
        assert_eq!(s.tracker().score(), 1);
        assert_eq!(s.tracker().attempts(), 1);
        assert_eq!(s.phase(), Phase::Locked);
        assert_eq!(s.previous_prompt_key(), Some(prompt.as_str()));
        assert_eq!(
            s.stage_mut().effects[1..],
            [
                Effect::Feedback(prompt, Outcome::Correct),
                Effect::Score(1, 1, 100),
                Effect::Schedule(Duration::from_millis(800)),
            ]
        );
    }

    #[test]
    fn advance_poses_a_different_prompt() {
        for seed in 0..50 {
            let mut s = started(seed);
            let prompt = current_key(&s);
            s.submit_answer(&prompt).unwrap();

            s.advance_to_next_question().unwrap();

            assert_eq!(s.phase(), Phase::AwaitingInput);
            let next = current_key(&s);
            assert_ne!(next, prompt);
            assert_eq!(s.stage_mut().effects.last(), Some(&Effect::Announce(next)));
        }
    }

    #[test]
    fn wrong_answer_emits_wrong_feedback_once() {
        let mut s = started(3);
        let wrong = wrong_key(&s);

        let result = s.submit_answer(&wrong).unwrap();

        assert_eq!(result, Submission::Scored(Outcome::Wrong));
        assert_eq!(s.tracker().score(), 0);
        assert_eq!(s.tracker().attempts(), 1);
        let wrong_feedback = s
            .stage_mut()
            .effects
            .iter()
            .filter(|e| **e == Effect::Feedback(wrong.clone(), Outcome::Wrong))
            .count();
        assert_eq!(wrong_feedback, 1);
        assert_eq!(feedback_count(&mut s), 1);
    }

    #[test]
    fn double_submit_is_scored_once() {
        let mut s = started(4);
        let prompt = current_key(&s);

        s.submit_answer(&prompt).unwrap();
        let effects_after_first = s.stage_mut().effects.len();
        let second = s.submit_answer(&prompt).unwrap();
        let wrong = wrong_key(&s);
        let third = s.submit_answer(&wrong).unwrap();

        assert_eq!(second, Submission::Ignored);
        assert_eq!(third, Submission::Ignored);
        assert_eq!(s.tracker().attempts(), 1);
        assert_eq!(s.tracker().score(), 1);
        assert_eq!(s.stage_mut().effects.len(), effects_after_first);
        assert_eq!(feedback_count(&mut s), 1);
    }

    #[test]
    fn locked_session_ignores_unknown_keys_too() {
        let mut s = started(5);
        let prompt = current_key(&s);
        s.submit_answer(&prompt).unwrap();
        assert_eq!(s.submit_answer("nope").unwrap(), Submission::Ignored);
    }

    #[test]
    fn unknown_choice_fails_without_counting() {
        let mut s = started(6);
        let err = s.submit_answer("Z").unwrap_err();
        assert!(matches!(err, QuizError::InvalidChoice(ref key) if key == "Z"));
        assert_eq!(s.tracker().attempts(), 0);
        assert_eq!(s.phase(), Phase::AwaitingInput);
        assert_eq!(feedback_count(&mut s), 0);
    }

    #[test]
    fn choice_before_start_is_ignored() {
        let mut s = session(abcd(), 7);
        assert_eq!(s.submit_answer("A").unwrap(), Submission::Ignored);
        assert!(s.stage_mut().effects.is_empty());
    }

    #[test]
    fn stale_advance_is_a_no_op() {
        let mut s = started(8);
        let prompt = current_key(&s);
        s.advance_to_next_question().unwrap();
        assert_eq!(current_key(&s), prompt);
        assert_eq!(s.stage_mut().effects.len(), 1);
    }

    #[test]
    fn stop_cancels_pending_advance() {
        let mut s = started(9);
        let prompt = current_key(&s);
        s.submit_answer(&prompt).unwrap();

        s.stop();
        s.advance_to_next_question().unwrap();

        assert_eq!(s.phase(), Phase::Stopped);
        assert_eq!(s.stage_mut().effects.last(), Some(&Effect::Cancel(1)));
        assert_eq!(s.submit_answer(&prompt).unwrap(), Submission::Ignored);
    }

    #[test]
    fn single_item_catalog_repeats() {
        let catalog = Arc::new(Catalog::new(vec![WordItem::new("solo", "sola")]).unwrap());
        let mut s = session(catalog, 10);
        s.start().unwrap();
        s.submit_answer("solo").unwrap();
        s.advance_to_next_question().unwrap();
        assert_eq!(current_key(&s), "solo");
        assert_eq!(s.tracker().score(), 1);
    }

    #[test]
    fn feedback_delay_is_configurable() {
        let mut s = Session::new(
            abcd(),
            RecordingStage::default(),
            StdRng::seed_from_u64(11),
            Duration::from_millis(1500),
        );
        s.start().unwrap();
        let prompt = current_key(&s);
        s.submit_answer(&prompt).unwrap();
        assert_eq!(
            s.stage_mut().effects.last(),
            Some(&Effect::Schedule(Duration::from_millis(1500)))
        );
    }

    #[test]
    fn score_stays_consistent_over_many_rounds() {
        let mut s = started(12);
        let mut rng = StdRng::seed_from_u64(99);
        let mut expected_score = 0;
        for round in 1..=40 {
            let answer_right = rng.gen_bool(0.5);
            let key = if answer_right {
                expected_score += 1;
                current_key(&s)
            } else {
                wrong_key(&s)
            };
            s.submit_answer(&key).unwrap();
            s.submit_answer(&key).unwrap();
            s.advance_to_next_question().unwrap();
            assert_eq!(s.tracker().attempts(), round);
            assert_eq!(s.tracker().score(), expected_score);
        }
    }
}
