use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use teloxide::prelude::*;
use teloxide::types::{InputFile, KeyboardButton, KeyboardMarkup};
use teloxide::utils::command::BotCommands;
use tokio::sync::{mpsc, Mutex};
use tokio::task::AbortHandle;

use crate::config::Config;
use crate::quiz::{Catalog, Outcome, Phase, Session, Stage, Submission, WordItem};

pub type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "These commands are supported:")]
pub enum Command {
    #[command(description = "start a new quiz")]
    Start,
    #[command(description = "show your score")]
    Score,
    #[command(description = "stop the quiz")]
    Stop,
    #[command(description = "show this text")]
    Help,
}

/// Input for a chat's session. Handled strictly one at a time, in arrival order.
#[derive(Debug)]
pub enum Event {
    Choice(String),
    Advance,
    Score,
    Stop,
}

/// Presentation work produced by the session, sent to Telegram after each event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Announce(WordItem),
    Feedback { target: String, outcome: Outcome },
    Score { score: u32, attempts: u32, percentage: u8 },
}

/// Binds a session to one chat. Timers only hold a weak handle to the chat's event queue,
/// so an advance scheduled for a discarded session goes nowhere.
pub struct ChatStage {
    effects: Vec<Effect>,
    events: mpsc::WeakUnboundedSender<Event>,
}

impl ChatStage {
    pub fn new(events: mpsc::WeakUnboundedSender<Event>) -> Self {
        Self {
            effects: Vec::new(),
            events,
        }
    }

    pub fn take_effects(&mut self) -> Vec<Effect> {
        std::mem::take(&mut self.effects)
    }
}

impl Stage for ChatStage {
    type Timer = AbortHandle;

    fn announce_prompt(&mut self, item: &WordItem) {
        self.effects.push(Effect::Announce(item.clone()));
    }

    fn play_feedback(&mut self, target_id: &str, outcome: Outcome) {
        self.effects.push(Effect::Feedback {
            target: target_id.to_string(),
            outcome,
        });
    }

    fn schedule_after(&mut self, delay: Duration) -> AbortHandle {
        let events = self.events.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            match events.upgrade() {
                Some(events) => {
                    if events.send(Event::Advance).is_err() {
                        debug!("session closed before advance fired");
                    }
                }
                None => debug!("session discarded before advance fired"),
            }
        })
        .abort_handle()
    }

    fn cancel(&mut self, timer: AbortHandle) {
        timer.abort();
    }

    fn render_score(&mut self, score: u32, attempts: u32, percentage: u8) {
        self.effects.push(Effect::Score {
            score,
            attempts,
            percentage,
        });
    }
}

type ChatSession = Session<ChatStage, StdRng>;

/// Feeds one event into the session. Returns `false` once the session is over.
fn apply(session: &mut ChatSession, event: Event) -> bool {
    let result = match event {
        Event::Choice(key) => session.submit_answer(&key).map(|submission| {
            if submission == Submission::Ignored {
                match session.phase() {
                    Phase::Locked => debug!("choice {:?} arrived during feedback, dropped", key),
                    phase => debug!("choice {:?} dropped, session is {:?}", key, phase),
                }
            }
        }),
        Event::Advance => session.advance_to_next_question(),
        Event::Score => {
            session.render_score();
            Ok(())
        }
        Event::Stop => {
            session.stop();
            return false;
        }
    };
    if let Err(err) = result {
        error!("session event failed: {}", err);
    }
    true
}

/// Live sessions, one per chat.
#[derive(Default)]
pub struct Sessions {
    chats: Mutex<HashMap<ChatId, mpsc::UnboundedSender<Event>>>,
}

impl Sessions {
    /// Starts a session for the chat, stopping the one it replaces.
    pub async fn open(&self, bot: Bot, chat_id: ChatId, catalog: Arc<Catalog>, config: Arc<Config>) {
        let (weak, rx) = self.register(chat_id).await;
        tokio::spawn(run_session(bot, chat_id, catalog, config, weak, rx));
    }

    /// Installs a fresh event queue for the chat. A queue it replaces gets `Event::Stop`.
    async fn register(
        &self,
        chat_id: ChatId,
    ) -> (
        mpsc::WeakUnboundedSender<Event>,
        mpsc::UnboundedReceiver<Event>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        let weak = tx.downgrade();
        if let Some(previous) = self.chats.lock().await.insert(chat_id, tx) {
            info!("Replacing session in chat {}", chat_id.0);
            let _ = previous.send(Event::Stop);
        }
        (weak, rx)
    }

    /// Returns `false` if the chat has no live session.
    pub async fn send(&self, chat_id: ChatId, event: Event) -> bool {
        let mut chats = self.chats.lock().await;
        let delivered = match chats.get(&chat_id) {
            Some(tx) => tx.send(event).is_ok(),
            None => return false,
        };
        if !delivered {
            chats.remove(&chat_id);
        }
        delivered
    }

    pub async fn close(&self, chat_id: ChatId) -> bool {
        match self.chats.lock().await.remove(&chat_id) {
            Some(tx) => {
                let _ = tx.send(Event::Stop);
                true
            }
            None => false,
        }
    }
}

async fn run_session(
    bot: Bot,
    chat_id: ChatId,
    catalog: Arc<Catalog>,
    config: Arc<Config>,
    weak: mpsc::WeakUnboundedSender<Event>,
    mut events: mpsc::UnboundedReceiver<Event>,
) {
    let mut session = Session::new(
        catalog.clone(),
        ChatStage::new(weak),
        StdRng::from_entropy(),
        config.feedback_delay,
    );
    if let Err(err) = session.start() {
        error!("Cannot start session in chat {}: {}", chat_id.0, err);
        return;
    }
    info!(
        "Session started in chat {}, first prompt {:?}",
        chat_id.0,
        session.current_prompt().map(|prompt| prompt.key.as_str())
    );
    present_all(&bot, chat_id, &catalog, &config, &mut session).await;

    while let Some(event) = events.recv().await {
        let running = apply(&mut session, event);
        present_all(&bot, chat_id, &catalog, &config, &mut session).await;
        if !running {
            break;
        }
    }
    info!(
        "Session in chat {} finished with {}/{}",
        chat_id.0,
        session.tracker().score(),
        session.tracker().attempts()
    );
}

async fn present_all(
    bot: &Bot,
    chat_id: ChatId,
    catalog: &Catalog,
    config: &Config,
    session: &mut ChatSession,
) {
    for effect in session.stage_mut().take_effects() {
        // Presentation failures never stop the quiz
        if let Err(err) = present(bot, chat_id, catalog, config, effect).await {
            warn!("Failed to present in chat {}: {}", chat_id.0, err);
        }
    }
}

async fn present(
    bot: &Bot,
    chat_id: ChatId,
    catalog: &Catalog,
    config: &Config,
    effect: Effect,
) -> HandlerResult {
    match effect {
        Effect::Announce(item) => {
            bot.send_message(chat_id, prompt_text(&item))
                .reply_markup(objects_keyboard(catalog))
                .await?;
            send_cue(bot, chat_id, config, &item.key).await?;
        }
        Effect::Feedback { target, outcome } => {
            bot.send_message(chat_id, feedback_text(&target, outcome))
                .await?;
            send_cue(bot, chat_id, config, outcome_cue(outcome)).await?;
        }
        Effect::Score {
            score,
            attempts,
            percentage,
        } => {
            bot.send_message(chat_id, score_text(score, attempts, percentage))
                .await?;
        }
    }
    Ok(())
}

async fn send_cue(bot: &Bot, chat_id: ChatId, config: &Config, name: &str) -> HandlerResult {
    let Some(path) = config.audio_cue(name) else {
        return Ok(());
    };
    if !path.exists() {
        warn!("Missing audio cue {}", path.display());
        return Ok(());
    }
    bot.send_audio(chat_id, InputFile::file(path)).await?;
    Ok(())
}

fn outcome_cue(outcome: Outcome) -> &'static str {
    match outcome {
        Outcome::Correct => "correct",
        Outcome::Wrong => "wrong",
    }
}

fn prompt_text(item: &WordItem) -> String {
    format!("🔊 {}", item.label)
}

fn feedback_text(target: &str, outcome: Outcome) -> String {
    match outcome {
        Outcome::Correct => format!("✅ {} is right!", target),
        Outcome::Wrong => format!("❌ {} is not it", target),
    }
}

fn score_text(score: u32, attempts: u32, percentage: u8) -> String {
    format!("Score: {} of {} ({}%)", score, attempts, percentage)
}

/// Catalog keys, two buttons per row.
fn keyboard_rows(catalog: &Catalog) -> Vec<Vec<String>> {
    catalog
        .items()
        .chunks(2)
        .map(|row| row.iter().map(|item| item.key.clone()).collect())
        .collect()
}

fn objects_keyboard(catalog: &Catalog) -> KeyboardMarkup {
    KeyboardMarkup::new(
        keyboard_rows(catalog)
            .into_iter()
            .map(|row| row.into_iter().map(KeyboardButton::new).collect::<Vec<_>>())
            .collect::<Vec<_>>(),
    )
}

const GREETING_TEXT: &str =
    "Hi! I will say a word, you tap the object it names. Let's start!";
const NO_SESSION_TEXT: &str = "No quiz is running. Send /start to begin.";
const PICK_OBJECT_TEXT: &str = "Please tap one of the objects on the keyboard.";

pub async fn command_handler(
    bot: Bot,
    msg: Message,
    cmd: Command,
    sessions: Arc<Sessions>,
    catalog: Arc<Catalog>,
    config: Arc<Config>,
) -> HandlerResult {
    match cmd {
        Command::Start => {
            bot.send_message(msg.chat.id, GREETING_TEXT).await?;
            sessions
                .open(bot.clone(), msg.chat.id, catalog, config)
                .await;
        }
        Command::Score => {
            if !sessions.send(msg.chat.id, Event::Score).await {
                bot.send_message(msg.chat.id, NO_SESSION_TEXT).await?;
            }
        }
        Command::Stop => {
            let text = if sessions.close(msg.chat.id).await {
                "Quiz stopped. Send /start to play again."
            } else {
                NO_SESSION_TEXT
            };
            bot.send_message(msg.chat.id, text).await?;
        }
        Command::Help => {
            bot.send_message(msg.chat.id, Command::descriptions().to_string())
                .await?;
        }
    }
    Ok(())
}

/// Any non-command message: a tap on one of the objects, or noise.
pub async fn choice_handler(
    bot: Bot,
    msg: Message,
    sessions: Arc<Sessions>,
    catalog: Arc<Catalog>,
) -> HandlerResult {
    let key = match msg.text() {
        Some(text) if catalog.contains(text) => text.to_string(),
        _ => {
            bot.send_message(msg.chat.id, PICK_OBJECT_TEXT)
                .reply_markup(objects_keyboard(&catalog))
                .await?;
            return Ok(());
        }
    };

    if !sessions.send(msg.chat.id, Event::Choice(key)).await {
        bot.send_message(msg.chat.id, NO_SESSION_TEXT).await?;
    }
    Ok(())
}
