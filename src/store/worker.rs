use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::sync::mpsc;

use super::{Error, Request, Subscriptions};

pub(super) async fn read_file(path: &Path) -> Result<Subscriptions, Error> {
    let content = match tokio::fs::read(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Subscriptions::new()),
        Err(e) => return Err(e.into()),
    };

    Ok(serde_json::from_slice(&content)?)
}

pub(super) async fn write_file(path: &Path, subscriptions: &Subscriptions) -> Result<(), Error> {
    let mut subscriptions = subscriptions.clone();
    subscriptions.retain(|_, users| !users.is_empty());

    let content = serde_json::to_string_pretty(&subscriptions)?;

    let mut tmp_name = path.file_name().unwrap_or_default().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    tokio::fs::write(&tmp_path, content).await?;
    tokio::fs::rename(&tmp_path, path).await?;

    Ok(())
}

pub(super) struct StoreWorker {
    pub(super) path: PathBuf,
    pub(super) request_rx: mpsc::UnboundedReceiver<Request>,
}

impl StoreWorker {
    async fn load(&self) -> Subscriptions {
        match read_file(&self.path).await {
            Ok(subscriptions) => subscriptions,
            Err(e) => {
                log::warn!(
                    "Cannot load {}, treating as empty: {e}",
                    self.path.display()
                );
                Subscriptions::new()
            }
        }
    }

    async fn save(&self, subscriptions: &Subscriptions) -> bool {
        match write_file(&self.path, subscriptions).await {
            Ok(()) => true,
            Err(e) => {
                log::error!("Cannot save {}: {e}", self.path.display());
                false
            }
        }
    }

    async fn handle_subscribe(&self, team: String, user: String) -> bool {
        let mut subscriptions = self.load().await;
        let users = subscriptions.entry(team.clone()).or_default();

        if users.contains(&user) {
            log::debug!("{user} already waits for {team}");
            return false;
        }

        users.push(user);
        self.save(&subscriptions).await
    }

    async fn handle_resolve_and_clear(&self, team: &str) -> Vec<String> {
        let mut subscriptions = self.load().await;

        // absent team: nothing to rewrite
        let Some(users) = subscriptions.remove(team) else {
            return Vec::new();
        };

        self.save(&subscriptions).await;
        users
    }

    pub(super) async fn run(mut self) {
        log::info!("Starting store worker for {}", self.path.display());

        while let Some(request) = self.request_rx.recv().await {
            match request {
                Request::Load { reply } => {
                    let _ = reply.send(self.load().await);
                }
                Request::Save {
                    subscriptions,
                    reply,
                } => {
                    let _ = reply.send(self.save(&subscriptions).await);
                }
                Request::Subscribe { team, user, reply } => {
                    let _ = reply.send(self.handle_subscribe(team, user).await);
                }
                Request::ResolveAndClear { team, reply } => {
                    let _ = reply.send(self.handle_resolve_and_clear(&team).await);
                }
            }
        }

        log::info!("Store worker for {} shut down.", self.path.display());
    }
}
