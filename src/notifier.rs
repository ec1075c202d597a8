use futures_core::future::BoxFuture;
use teloxide::prelude::*;
use teloxide::types::ParseMode;

/// Delivers a MarkdownV2 text to a user. Never fails from the caller's view.
pub trait Notifier: Send + Sync {
    fn notify<'a>(&'a self, user: &'a str, text: &'a str) -> BoxFuture<'a, ()>;
}

#[derive(Clone)]
pub struct TelegramNotifier {
    bot: Bot,
}

impl TelegramNotifier {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    pub async fn send(&self, chat_id: ChatId, text: &str) {
        let result = self
            .bot
            .send_message(chat_id, text)
            .parse_mode(ParseMode::MarkdownV2)
            .await;

        if let Err(e) = result {
            log::warn!("Couldn't send message to {chat_id}: {e}")
        }
    }
}

pub fn parse_user(user: &str) -> Option<ChatId> {
    user.trim().parse().ok().map(ChatId)
}

impl Notifier for TelegramNotifier {
    fn notify<'a>(&'a self, user: &'a str, text: &'a str) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            let Some(chat_id) = parse_user(user) else {
                log::warn!("Invalid user id {user:?}, not notified");
                return;
            };
            self.send(chat_id, text).await
        })
    }
}
