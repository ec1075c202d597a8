use std::sync::Arc;

use teloxide::dispatching::UpdateHandler;
use teloxide::macros::BotCommands;
use teloxide::prelude::*;
use teloxide::types::{MessageId, ParseMode};
use teloxide::RequestError;

use crate::controller::{CallbackAction, Controller, Reply};
use crate::messages;

type HandlerResult = Result<(), RequestError>;

#[derive(BotCommands, Clone, Debug)]
#[command(rename_rule = "lowercase", description = "Desteklenen komutlar:")]
pub enum Command {
    #[command(description = "takım seç ve bilet ara.")]
    Start,
    #[command(description = "bu metni göster.")]
    Help,
}

/// Where the answer to a button press goes.
#[derive(Debug, Clone, Copy)]
enum Target {
    Edit(ChatId, MessageId),
    Send(ChatId),
}

async fn send(bot: &Bot, chat_id: ChatId, reply: Reply) -> HandlerResult {
    match reply {
        Reply::Text(text) => {
            bot.send_message(chat_id, text)
                .parse_mode(ParseMode::MarkdownV2)
                .await?;
        }
        Reply::WithKeyboard(text, keyboard) => {
            bot.send_message(chat_id, text)
                .parse_mode(ParseMode::MarkdownV2)
                .reply_markup(keyboard)
                .await?;
        }
    }
    Ok(())
}

async fn deliver(bot: &Bot, target: Target, reply: Reply) -> HandlerResult {
    let (chat_id, message_id) = match target {
        Target::Edit(chat_id, message_id) => (chat_id, message_id),
        Target::Send(chat_id) => return send(bot, chat_id, reply).await,
    };

    match reply {
        Reply::Text(text) => {
            bot.edit_message_text(chat_id, message_id, text)
                .parse_mode(ParseMode::MarkdownV2)
                .await?;
        }
        Reply::WithKeyboard(text, keyboard) => {
            bot.edit_message_text(chat_id, message_id, text)
                .parse_mode(ParseMode::MarkdownV2)
                .reply_markup(keyboard)
                .await?;
        }
    }
    Ok(())
}

async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
    controller: Arc<Controller>,
) -> HandlerResult {
    log::info!("{cmd:?} from {}", msg.chat.id);
    let reply = match cmd {
        Command::Start => controller.start(),
        Command::Help => Reply::Text(messages::help()),
    };
    send(&bot, msg.chat.id, reply).await
}

async fn handle_text(bot: Bot, msg: Message, controller: Arc<Controller>) -> HandlerResult {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    // unknown commands
    if text.starts_with('/') {
        return Ok(());
    }

    send(&bot, msg.chat.id, controller.text_message(text.trim())).await
}

async fn handle_callback(
    bot: Bot,
    q: CallbackQuery,
    controller: Arc<Controller>,
) -> HandlerResult {
    bot.answer_callback_query(q.id.clone()).await?;

    let Some(action) = q.data.as_deref().and_then(CallbackAction::parse) else {
        log::debug!("Ignoring callback data {:?}", q.data);
        return Ok(());
    };

    let target = match &q.message {
        Some(message) => Target::Edit(message.chat().id, message.id()),
        None => Target::Send(ChatId::from(q.from.id)),
    };
    let user = q.from.id.0.to_string();

    log::info!("{action} from {user}");

    match action {
        CallbackAction::Team(team) => {
            deliver(&bot, target, Reply::Text(messages::searching(&team))).await?;

            // the lookup takes a while; don't hold up the dispatcher
            tokio::spawn(async move {
                let reply = controller.select_team(&team).await;
                if let Err(e) = deliver(&bot, target, reply).await {
                    log::warn!("Couldn't deliver lookup result for {team}: {e}");
                }
            });
            Ok(())
        }
        CallbackAction::NotifyYes(team) => {
            let reply = controller.notify_yes(&team, &user).await;
            deliver(&bot, target, reply).await
        }
        CallbackAction::NotifyNo => deliver(&bot, target, controller.notify_no()).await,
    }
}

pub fn schema() -> UpdateHandler<RequestError> {
    let message_handler = Update::filter_message()
        .branch(
            dptree::entry()
                .filter_command::<Command>()
                .endpoint(handle_command),
        )
        .branch(dptree::endpoint(handle_text));

    let callback_handler = Update::filter_callback_query().endpoint(handle_callback);

    dptree::entry()
        .branch(message_handler)
        .branch(callback_handler)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use axum::body::Bytes;
    use axum::extract::{Path, State};
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use teloxide::utils::command::BotCommands;

    use super::*;
    use crate::controller::tests::FakeLookup;
    use crate::lookup::TicketLink;
    use crate::store::SubscriptionStore;
    use crate::teams::TeamDirectory;

    #[test]
    fn commands_parse() {
        assert!(matches!(
            Command::parse("/start", "FenerMacaBot"),
            Ok(Command::Start)
        ));
        assert!(matches!(
            Command::parse("/help@FenerMacaBot", "FenerMacaBot"),
            Ok(Command::Help)
        ));
        assert!(Command::parse("/unsubscribe", "FenerMacaBot").is_err());
    }

    #[test]
    fn handler_tree_builds() {
        let _ = schema();
    }

    type Calls = Arc<Mutex<Vec<(String, Value)>>>;

    /// Stands in for the Bot API and records every call as (method, body).
    async fn fake_api(
        State(calls): State<Calls>,
        Path((_, method)): Path<(String, String)>,
        body: Bytes,
    ) -> Json<Value> {
        let method = method.to_lowercase();
        let body = serde_json::from_slice(&body).unwrap_or(Value::Null);
        calls.lock().unwrap().push((method.clone(), body));

        let result = if method == "answercallbackquery" {
            json!(true)
        } else {
            json!({
                "message_id": 7,
                "date": 1700000000,
                "chat": { "id": 42, "type": "private", "first_name": "Test" },
                "text": "ok"
            })
        };
        Json(json!({ "ok": true, "result": result }))
    }

    async fn fake_bot() -> (Bot, Calls) {
        let calls = Calls::default();
        let app = Router::new()
            .route("/:token/:method", post(fake_api))
            .with_state(calls.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await });

        let bot = Bot::new("t").set_api_url(format!("http://{addr}/").parse().unwrap());
        (bot, calls)
    }

    fn callback(data: &str, with_message: bool) -> CallbackQuery {
        let mut q = json!({
            "id": "cb1",
            "from": { "id": 42, "is_bot": false, "first_name": "Test" },
            "chat_instance": "ci",
            "data": data
        });
        if with_message {
            q["message"] = json!({
                "message_id": 7,
                "date": 1700000000,
                "chat": { "id": 42, "type": "private", "first_name": "Test" },
                "text": "menu"
            });
        }
        serde_json::from_value(q).unwrap()
    }

    fn controller() -> (tempfile::TempDir, Arc<Controller>) {
        let dir = tempfile::tempdir().unwrap();
        let lookup = FakeLookup::with(
            "Fenerbahçe",
            vec![TicketLink::new("Mobilet", "https://mobilet.com/x")],
        );
        let controller = Controller::new(
            Arc::new(lookup),
            SubscriptionStore::open(dir.path().join("aboneler.json")),
            TeamDirectory::fallback(),
        );
        (dir, Arc::new(controller))
    }

    async fn wait_for_calls(calls: &Calls, n: usize) -> Vec<(String, Value)> {
        for _ in 0..200 {
            if calls.lock().unwrap().len() >= n {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        calls.lock().unwrap().clone()
    }

    #[tokio::test]
    async fn team_choice_is_answered_then_edited_twice() {
        let (bot, calls) = fake_bot().await;
        let (_dir, controller) = controller();

        handle_callback(bot, callback("team:Fenerbahçe", true), controller)
            .await
            .unwrap();

        let calls = wait_for_calls(&calls, 3).await;
        let methods: Vec<_> = calls.iter().map(|(m, _)| m.as_str()).collect();
        assert_eq!(
            methods,
            vec!["answercallbackquery", "editmessagetext", "editmessagetext"]
        );

        assert_eq!(calls[1].1["message_id"], json!(7));
        assert_eq!(calls[1].1["text"], json!(messages::searching("Fenerbahçe")));
        let result = calls[2].1["text"].as_str().unwrap();
        assert!(result.contains("(https://mobilet.com/x)"));
    }

    #[tokio::test]
    async fn callback_without_message_gets_new_messages() {
        let (bot, calls) = fake_bot().await;
        let (_dir, controller) = controller();

        handle_callback(bot, callback("team:Fenerbahçe", false), controller)
            .await
            .unwrap();

        let calls = wait_for_calls(&calls, 3).await;
        let methods: Vec<_> = calls.iter().map(|(m, _)| m.as_str()).collect();
        assert_eq!(
            methods,
            vec!["answercallbackquery", "sendmessage", "sendmessage"]
        );
        assert!(calls[1..].iter().all(|(_, body)| body["chat_id"] == json!(42)));
        assert_eq!(calls[1].1["text"], json!(messages::searching("Fenerbahçe")));
    }

    #[tokio::test]
    async fn unknown_callback_data_is_only_answered() {
        let (bot, calls) = fake_bot().await;
        let (_dir, controller) = controller();

        handle_callback(bot, callback("bogus", true), controller)
            .await
            .unwrap();

        let calls = wait_for_calls(&calls, 1).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "answercallbackquery");
    }
}
