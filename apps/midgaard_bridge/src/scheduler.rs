use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tracing::info;

use crate::session::Event;

/// Feed `Event::Tick` into the session queue: once right away, then every
/// `period`, until shutdown or until the session goes away.
pub async fn run(period: Duration, events: mpsc::Sender<Event>, shutdown: watch::Receiver<bool>) {
    let mut interval = tokio::time::interval(period);
    // A slow session just gets fewer ticks; never a burst of catch-up ticks.
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let stop = crate::wait_for_shutdown(shutdown);
    tokio::pin!(stop);

    loop {
        tokio::select! {
            biased;
            _ = &mut stop => {
                info!("poll scheduler stopping");
                return;
            }
            _ = interval.tick() => {
                if events.send(Event::Tick).await.is_err() {
                    return;
                }
            }
        }
    }
}
