mod chat;
mod config;
mod quiz;

use std::{fs::File, sync::Arc};

use chat::{Command, Sessions};
use config::Config;
use dotenv::dotenv;
use quiz::{Catalog, QuizError};
use teloxide::prelude::*;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();

    pretty_env_logger::init();
    log::info!("Starting picture-word quiz bot...");

    let config = Config::from_env()?;

    let catalog = match &config.words_file {
        Some(path) => {
            let file = File::open(path).map_err(|err| {
                QuizError::Configuration(format!(
                    "cannot open words file {}: {}",
                    path.display(),
                    err
                ))
            })?;
            Catalog::from_file(file)?
        }
        None => Catalog::city(),
    };
    log::info!(
        "Catalog loaded: {} objects, feedback delay {:?}",
        catalog.len(),
        config.feedback_delay
    );

    let bot = Bot::from_env();

    let handler = Update::filter_message()
        .branch(
            dptree::entry()
                .filter_command::<Command>()
                .endpoint(chat::command_handler),
        )
        .branch(dptree::endpoint(chat::choice_handler));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![
            Arc::new(Sessions::default()),
            Arc::new(catalog),
            Arc::new(config)
        ])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}
