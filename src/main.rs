mod bot;
mod config;
mod controller;
mod health;
mod lookup;
mod messages;
mod notifier;
mod store;
mod sweeper;
mod teams;

use std::sync::Arc;

use config::Config;
use controller::Controller;
use dptree::deps;
use lookup::{HttpTicketLookup, TicketLookup};
use notifier::TelegramNotifier;
use store::SubscriptionStore;
use sweeper::Sweeper;
use teams::TeamDirectory;
use teloxide::prelude::*;
use thiserror::Error;
use tokio::sync::watch;

#[derive(Debug, Error)]
enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] config::Error),
    #[error("cannot reach Telegram: {0}")]
    Telegram(#[from] teloxide::RequestError),
    #[error("cannot create http client: {0}")]
    Http(#[from] lookup::Error),
    #[error("cannot open health endpoint: {0}")]
    Health(#[from] std::io::Error),
}

#[tokio::main]
async fn main() -> Result<(), StartupError> {
    env_logger::init();
    log::info!("Starting bot...");

    let config = Config::from_env()?;

    let bot = Bot::new(&config.bot_token);
    let me = bot.get_me().await?;
    log::info!("Logged in as @{}", me.username());

    let client = lookup::http_client(config.fetch_timeout)?;
    let teams = TeamDirectory::load(&client).await;
    let team_count = teams.len();

    let lookup: Arc<dyn TicketLookup> =
        Arc::new(HttpTicketLookup::new(client, lookup::default_sources()));
    let store = SubscriptionStore::open(&config.subscriptions_file);
    let notifier = Arc::new(TelegramNotifier::new(bot.clone()));

    let (stop_tx, stop_rx) = watch::channel(false);

    let listener = health::bind(config.port).await?;
    let health = tokio::spawn(health::serve(listener, stop_rx.clone()));

    let sweeper = Sweeper::new(store.clone(), lookup.clone(), notifier.clone());
    let sweeper = tokio::spawn(sweeper.run(
        config.first_check_delay,
        config.check_interval,
        stop_rx,
    ));

    if let Some(chat_id) = config.fallback_chat {
        notifier.send(chat_id, &messages::started(team_count)).await;
    }

    let controller = Arc::new(Controller::new(lookup, store, teams));

    log::info!("Polling for updates");
    Dispatcher::builder(bot, bot::schema())
        .dependencies(deps![controller])
        .default_handler(|_| async {})
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    log::info!("Shutting down...");
    let _ = stop_tx.send(true);
    let _ = sweeper.await;
    let _ = health.await;

    Ok(())
}
