use std::fmt;
use std::sync::Arc;

use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

use crate::lookup::TicketLookup;
use crate::messages;
use crate::store::SubscriptionStore;
use crate::teams::TeamDirectory;

/// Telegram rejects callback data longer than this.
const MAX_CALLBACK_DATA: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackAction {
    Team(String),
    NotifyYes(String),
    NotifyNo,
}

impl CallbackAction {
    pub fn parse(data: &str) -> Option<Self> {
        if data == "notify_no" {
            return Some(Self::NotifyNo);
        }

        let (tag, team) = data.split_once(':')?;
        let team = team.trim();
        if team.is_empty() {
            return None;
        }

        match tag {
            "team" => Some(Self::Team(team.to_owned())),
            "notify_yes" => Some(Self::NotifyYes(team.to_owned())),
            _ => None,
        }
    }

    fn fits(&self) -> bool {
        self.to_string().len() <= MAX_CALLBACK_DATA
    }

    fn button(&self, label: &str) -> InlineKeyboardButton {
        InlineKeyboardButton::callback(label, self.to_string())
    }
}

impl fmt::Display for CallbackAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Team(team) => write!(f, "team:{team}"),
            Self::NotifyYes(team) => write!(f, "notify_yes:{team}"),
            Self::NotifyNo => write!(f, "notify_no"),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Reply {
    Text(String),
    WithKeyboard(String, InlineKeyboardMarkup),
}

impl Reply {
    pub fn text(&self) -> &str {
        match self {
            Reply::Text(text) | Reply::WithKeyboard(text, _) => text,
        }
    }
}

/// The conversation logic, independent of how updates arrive.
pub struct Controller {
    lookup: Arc<dyn TicketLookup>,
    store: SubscriptionStore,
    teams: TeamDirectory,
}

impl Controller {
    pub fn new(lookup: Arc<dyn TicketLookup>, store: SubscriptionStore, teams: TeamDirectory) -> Self {
        Self {
            lookup,
            store,
            teams,
        }
    }

    pub fn team_menu(&self) -> InlineKeyboardMarkup {
        let rows = self.teams.names().filter_map(|name| {
            // the longer notify_yes data has to fit as well
            if !CallbackAction::NotifyYes(name.to_owned()).fits() {
                log::warn!("Team name {name:?} too long for a button, skipped");
                return None;
            }
            Some(vec![CallbackAction::Team(name.to_owned()).button(name)])
        });

        InlineKeyboardMarkup::new(rows)
    }

    pub fn start(&self) -> Reply {
        Reply::WithKeyboard(messages::welcome(), self.team_menu())
    }

    pub async fn select_team(&self, team: &str) -> Reply {
        let links = self.lookup.find_tickets(team).await;
        log::info!("Lookup for {team}: {} links", links.len());

        if !links.is_empty() {
            return Reply::Text(messages::tickets_found(team, &links));
        }

        let keyboard = InlineKeyboardMarkup::new([[
            CallbackAction::NotifyYes(team.to_owned()).button(messages::NOTIFY_YES_BUTTON),
            CallbackAction::NotifyNo.button(messages::NOTIFY_NO_BUTTON),
        ]]);
        Reply::WithKeyboard(messages::tickets_not_found(team), keyboard)
    }

    pub async fn notify_yes(&self, team: &str, user: &str) -> Reply {
        if self.store.subscribe(team, user).await {
            log::info!("{user} subscribed to {team}");
        }
        Reply::Text(messages::subscribed(team))
    }

    pub fn notify_no(&self) -> Reply {
        Reply::Text(messages::not_subscribed())
    }

    pub fn text_message(&self, text: &str) -> Reply {
        if text.to_lowercase().contains("bilet") {
            Reply::Text(messages::ticket_hint())
        } else {
            Reply::Text(messages::acknowledged())
        }
    }
}
