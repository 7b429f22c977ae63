use std::path::PathBuf;
use std::time::Duration;

use crate::quiz::session::DEFAULT_FEEDBACK_DELAY;
use crate::quiz::QuizError;

const FEEDBACK_DELAY_VAR: &str = "QUIZ_FEEDBACK_DELAY_MS";
const WORDS_FILE_VAR: &str = "QUIZ_WORDS_FILE";
const AUDIO_DIR_VAR: &str = "QUIZ_AUDIO_DIR";

#[derive(Debug, Clone)]
pub struct Config {
    /// How long feedback plays before the next question.
    pub feedback_delay: Duration,
    /// `key<TAB>label` file; the city catalog is used when unset.
    pub words_file: Option<PathBuf>,
    /// Holds `<key>.mp3` cues plus `correct.mp3` and `wrong.mp3`.
    pub audio_dir: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self, QuizError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, QuizError> {
        let feedback_delay = match lookup(FEEDBACK_DELAY_VAR) {
            Some(raw) => {
                let millis = raw.trim().parse::<u64>().map_err(|_| {
                    QuizError::Configuration(format!(
                        "{} must be a whole number of milliseconds, got {:?}",
                        FEEDBACK_DELAY_VAR, raw
                    ))
                })?;
                Duration::from_millis(millis)
            }
            None => DEFAULT_FEEDBACK_DELAY,
        };

        let path = |name: &str| {
            lookup(name)
                .filter(|value| !value.trim().is_empty())
                .map(PathBuf::from)
        };

        Ok(Self {
            feedback_delay,
            words_file: path(WORDS_FILE_VAR),
            audio_dir: path(AUDIO_DIR_VAR),
        })
    }

    /// Path of an audio cue, if an audio directory is configured.
    pub fn audio_cue(&self, name: &str) -> Option<PathBuf> {
        self.audio_dir
            .as_ref()
            .map(|dir| dir.join(format!("{}.mp3", name)))
    }
}
