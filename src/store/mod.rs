//! Subscription store backed by a single JSON file.
//!
//! The file maps team names to the users waiting for tickets of that team.
//! All access goes through one worker task, which re-reads the file for
//! every request and rewrites it completely on every change.

mod worker;

use std::collections::BTreeMap;
use std::path::PathBuf;

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

/// Team name -> user ids in subscription order.
pub type Subscriptions = BTreeMap<String, Vec<String>>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to access subscription file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid subscription file: {0}")]
    Json(#[from] serde_json::Error),
}

enum Request {
    Load {
        reply: oneshot::Sender<Subscriptions>,
    },
    Save {
        subscriptions: Subscriptions,
        reply: oneshot::Sender<bool>,
    },
    Subscribe {
        team: String,
        user: String,
        reply: oneshot::Sender<bool>,
    },
    ResolveAndClear {
        team: String,
        reply: oneshot::Sender<Vec<String>>,
    },
}

#[derive(Clone)]
pub struct SubscriptionStore {
    request_tx: mpsc::UnboundedSender<Request>,
}

impl SubscriptionStore {
    /// Spawns the worker owning `path`. It stops once every handle is dropped.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let (request_tx, request_rx) = mpsc::unbounded_channel();
        let worker = worker::StoreWorker {
            path: path.into(),
            request_rx,
        };

        tokio::spawn(worker.run());

        Self { request_tx }
    }

    async fn request<T: Default>(&self, build: impl FnOnce(oneshot::Sender<T>) -> Request) -> T {
        let (reply, reply_rx) = oneshot::channel();
        if self.request_tx.send(build(reply)).is_err() {
            log::error!("Store worker is gone, request dropped");
            return T::default();
        }

        match reply_rx.await {
            Ok(value) => value,
            Err(_) => {
                log::error!("Store worker did not answer");
                T::default()
            }
        }
    }

    /// Current content of the file; empty if it is missing or unreadable.
    pub async fn load(&self) -> Subscriptions {
        self.request(|reply| Request::Load { reply }).await
    }

    /// Replaces the whole file. Returns whether the write succeeded.
    // part of the store contract; the bot itself only subscribes and resolves
    #[allow(unused)]
    pub async fn save(&self, subscriptions: Subscriptions) -> bool {
        self.request(|reply| Request::Save {
            subscriptions,
            reply,
        })
        .await
    }

    /// Adds `user` to the waiting list of `team`. Returns `true` if the user
    /// was newly added and the file was written.
    pub async fn subscribe(&self, team: &str, user: &str) -> bool {
        self.request(|reply| Request::Subscribe {
            team: team.to_owned(),
            user: user.to_owned(),
            reply,
        })
        .await
    }

    /// Removes `team` and returns everyone who was waiting for it.
    pub async fn resolve_and_clear(&self, team: &str) -> Vec<String> {
        self.request(|reply| Request::ResolveAndClear {
            team: team.to_owned(),
            reply,
        })
        .await
    }
}
