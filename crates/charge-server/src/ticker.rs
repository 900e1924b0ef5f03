//! Ambient growth ticker.
//!
//! Enqueues a [`DispatcherCommand::Tick`](crate::dispatcher::DispatcherCommand)
//! on a fixed interval. The dispatcher decides whether the tick moves
//! progress; the ticker only keeps time.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use crate::dispatcher::DispatcherHandle;

/// Spawn the ticker. It stops by itself once the dispatcher is gone, or
/// when the returned handle is aborted.
pub fn spawn_ticker(handle: DispatcherHandle, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            if handle.tick().is_err() {
                debug!("Dispatcher stopped, ambient ticker exiting");
                return;
            }
        }
    })
}
