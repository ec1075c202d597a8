use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::lookup::TicketLookup;
use crate::messages;
use crate::notifier::Notifier;
use crate::store::SubscriptionStore;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepReport {
    pub teams_checked: usize,
    pub teams_resolved: usize,
    pub notifications_sent: usize,
}

pub struct Sweeper {
    store: SubscriptionStore,
    lookup: Arc<dyn TicketLookup>,
    notifier: Arc<dyn Notifier>,
}

impl Sweeper {
    pub fn new(
        store: SubscriptionStore,
        lookup: Arc<dyn TicketLookup>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            lookup,
            notifier,
        }
    }

    /// Checks every subscribed team once. Teams with tickets are removed from
    /// the store and all their subscribers are told where to buy.
    pub async fn sweep(&self) -> SweepReport {
        let mut report = SweepReport::default();

        let teams: Vec<String> = self.store.load().await.into_keys().collect();
        if teams.is_empty() {
            log::debug!("No subscriptions, nothing to check");
            return report;
        }

        log::info!("Checking {} subscribed teams", teams.len());

        for team in teams {
            report.teams_checked += 1;

            let links = self.lookup.find_tickets(&team).await;
            if links.is_empty() {
                continue;
            }

            // clear first, so whoever subscribed during the lookup is included
            let users = self.store.resolve_and_clear(&team).await;
            let msg = messages::tickets_available(&team, &links);

            for user in &users {
                self.notifier.notify(user, &msg).await;
            }

            log::info!("Tickets for {team} found, notified {} users", users.len());
            report.teams_resolved += 1;
            report.notifications_sent += users.len();
        }

        report
    }

    pub async fn run(self, first_delay: Duration, period: Duration, mut stop: watch::Receiver<bool>) {
        log::info!("Starting sweeper, every {}s", period.as_secs());

        let mut interval = interval_at(Instant::now() + first_delay, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let report = self.sweep().await;
                    log::debug!("Sweep done: {report:?}");
                }
                changed = stop.changed() => {
                    // a dropped sender counts as stop as well
                    if changed.is_err() || *stop.borrow() {
                        break;
                    }
                }
            }
        }

        log::info!("Sweeper shut down.");
    }
}
