//! The broadcast dispatcher: sole owner and writer of the session.
//!
//! Every inbound event (observer connect, submission, ambient tick, reset,
//! export, status read) is a [`DispatcherCommand`] on one bounded queue. A
//! single task drains the queue in arrival order, applies each command to
//! the [`Session`], and publishes the resulting events on a
//! [`broadcast`] channel. Because only this task touches the session, every
//! observer sees the same events in the same order.
//!
//! Connecting is itself a queued command: the dispatcher captures the
//! `init` snapshot and subscribes the new receiver in one step, so the
//! observer's stream starts exactly where its snapshot ends.

use charge_core::{Session, SubmitError, SubmitOutcome, normalize_name};
use charge_types::{InitPayload, ServerEvent, Submission};
use chrono::Utc;
use rand::Rng;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Capacity of the inbound command queue.
const COMMAND_QUEUE_CAPACITY: usize = 1024;

/// Capacity of the outbound event channel.
///
/// An observer that falls further behind than this receives
/// [`broadcast::error::RecvError::Lagged`] and must resynchronise.
pub const BROADCAST_CAPACITY: usize = 1024;

/// A new observer's starting point: a snapshot and the events after it.
#[derive(Debug)]
pub struct Subscription {
    /// State at the moment of subscription.
    pub init: InitPayload,
    /// Every event published after `init` was captured.
    pub events: broadcast::Receiver<ServerEvent>,
}

/// Inbound events, processed strictly in queue order.
#[derive(Debug)]
pub enum DispatcherCommand {
    /// A new observer wants a snapshot and a live subscription.
    Connect {
        /// Receives the subscription.
        reply: oneshot::Sender<Subscription>,
    },
    /// A participant submission. The name is already normalised.
    Submit {
        /// The participant's name.
        name: String,
        /// Receives the outcome.
        reply: oneshot::Sender<Result<SubmitOutcome, SubmitError>>,
    },
    /// One ambient growth tick.
    Tick,
    /// Reset the session and re-broadcast `init`.
    Reset {
        /// Signalled once the reset has been applied.
        reply: oneshot::Sender<()>,
    },
    /// Read the accepted submissions.
    Export {
        /// Receives the submissions, oldest first.
        reply: oneshot::Sender<Vec<Submission>>,
    },
    /// Read the current state and identity.
    Snapshot {
        /// Receives the payload.
        reply: oneshot::Sender<InitPayload>,
    },
}

/// Errors returned by [`DispatcherHandle`] operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    /// The submission was malformed and never queued.
    #[error("submission rejected: {0}")]
    Rejected(#[from] SubmitError),

    /// The dispatcher task has stopped.
    #[error("dispatcher is not running")]
    Closed,
}

/// Cloneable sender side of the dispatcher queue.
#[derive(Debug, Clone)]
pub struct DispatcherHandle {
    commands: mpsc::Sender<DispatcherCommand>,
}

impl DispatcherHandle {
    /// Subscribe a new observer.
    pub async fn connect(&self) -> Result<Subscription, DispatchError> {
        self.request(|reply| DispatcherCommand::Connect { reply })
            .await
    }

    /// Submit a participant name.
    ///
    /// Blank names are rejected here without touching the queue.
    pub async fn submit(&self, raw_name: &str) -> Result<SubmitOutcome, DispatchError> {
        let name = normalize_name(raw_name)?;
        let outcome = self
            .request(|reply| DispatcherCommand::Submit { name, reply })
            .await?;
        Ok(outcome?)
    }

    /// Queue an ambient tick without waiting.
    ///
    /// A full queue drops the tick: ambient growth is cosmetic and the next
    /// tick will follow shortly.
    pub fn tick(&self) -> Result<(), DispatchError> {
        match self.commands.try_send(DispatcherCommand::Tick) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => {
                debug!("Command queue full, dropping ambient tick");
                Ok(())
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Err(DispatchError::Closed),
        }
    }

    /// Reset the session. Resolves once the reset has been applied.
    pub async fn reset(&self) -> Result<(), DispatchError> {
        self.request(|reply| DispatcherCommand::Reset { reply })
            .await
    }

    /// Accepted submissions since the last reset.
    pub async fn export(&self) -> Result<Vec<Submission>, DispatchError> {
        self.request(|reply| DispatcherCommand::Export { reply })
            .await
    }

    /// Current state plus network identity.
    pub async fn snapshot(&self) -> Result<InitPayload, DispatchError> {
        self.request(|reply| DispatcherCommand::Snapshot { reply })
            .await
    }

    async fn request<T, F>(&self, build: F) -> Result<T, DispatchError>
    where
        F: FnOnce(oneshot::Sender<T>) -> DispatcherCommand,
    {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(build(reply))
            .await
            .map_err(|_closed| DispatchError::Closed)?;
        response.await.map_err(|_dropped| DispatchError::Closed)
    }
}

/// The single consumer of the command queue.
#[derive(Debug)]
pub struct Dispatcher<R> {
    session: Session,
    rng: R,
    events: broadcast::Sender<ServerEvent>,
}

impl<R: Rng + Send + 'static> Dispatcher<R> {
    /// Wrap a session. `rng` drives submission deltas.
    pub fn new(session: Session, rng: R) -> Self {
        Self::with_broadcast_capacity(session, rng, BROADCAST_CAPACITY)
    }

    /// Like [`Dispatcher::new`] with an explicit fan-out buffer size.
    pub fn with_broadcast_capacity(session: Session, rng: R, capacity: usize) -> Self {
        let (events, _) = broadcast::channel(capacity.max(1));
        Self {
            session,
            rng,
            events,
        }
    }

    /// Start the dispatcher on a background task.
    ///
    /// The task ends once every [`DispatcherHandle`] has been dropped.
    pub fn spawn(self) -> (DispatcherHandle, JoinHandle<()>) {
        let (commands, queue) = mpsc::channel(COMMAND_QUEUE_CAPACITY);
        let task = tokio::spawn(self.run(queue));
        (DispatcherHandle { commands }, task)
    }

    async fn run(mut self, mut queue: mpsc::Receiver<DispatcherCommand>) {
        debug!("Dispatcher started");
        while let Some(command) = queue.recv().await {
            self.handle(command);
        }
        debug!("Command queue closed, dispatcher stopping");
    }

    /// Apply one command and publish its events.
    fn handle(&mut self, command: DispatcherCommand) {
        match command {
            DispatcherCommand::Connect { reply } => {
                let subscription = Subscription {
                    init: self.session.init_payload(),
                    events: self.events.subscribe(),
                };
                // The observer may have gone away while queued.
                let _ = reply.send(subscription);
            }
            DispatcherCommand::Submit { name, reply } => {
                let result = self.session.submit(&name, Utc::now(), &mut self.rng);
                let outcome = match result {
                    Ok(submitted) => {
                        log_outcome(&name, submitted.outcome);
                        self.publish(submitted.events);
                        Ok(submitted.outcome)
                    }
                    Err(e) => Err(e),
                };
                let _ = reply.send(outcome);
            }
            DispatcherCommand::Tick => {
                let events = self.session.tick();
                self.publish(events);
            }
            DispatcherCommand::Reset { reply } => {
                let events = self.session.reset();
                info!(receivers = self.events.receiver_count(), "Session reset");
                self.publish(events);
                let _ = reply.send(());
            }
            DispatcherCommand::Export { reply } => {
                let _ = reply.send(self.session.export_snapshot());
            }
            DispatcherCommand::Snapshot { reply } => {
                let _ = reply.send(self.session.init_payload());
            }
        }
    }

    /// Fire-and-forget multicast.
    fn publish(&self, events: Vec<ServerEvent>) {
        for event in events {
            // send fails only when there are zero receivers, which is normal
            // when no observer is connected.
            let _ = self.events.send(event);
        }
    }
}

fn log_outcome(name: &str, outcome: SubmitOutcome) {
    match outcome {
        SubmitOutcome::Accepted { progress } => {
            info!(name, progress, "Submission accepted");
        }
        SubmitOutcome::Completed => info!(name, "Completion triggered"),
        SubmitOutcome::Ignored => debug!(name, "Submission ignored, session complete"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use charge_core::ChargeConfig;
    use charge_types::NetworkIdentity;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn spawn() -> DispatcherHandle {
        let session = Session::new(&ChargeConfig::default(), NetworkIdentity::default());
        let (handle, _task) = Dispatcher::new(session, StdRng::seed_from_u64(9)).spawn();
        handle
    }

    #[tokio::test]
    async fn blank_submission_is_rejected_before_queueing() {
        let handle = spawn();
        let result = handle.submit("   ").await;
        assert_eq!(result, Err(DispatchError::Rejected(SubmitError::EmptyName)));
        assert_eq!(handle.snapshot().await.unwrap().snapshot.submission_count, 0);
    }

    #[tokio::test]
    async fn connect_then_events_follow_snapshot() {
        let handle = spawn();
        handle.submit("Alice").await.unwrap();

        let mut sub = handle.connect().await.unwrap();
        assert_eq!(sub.init.snapshot.submission_count, 1);

        handle.submit("Bob").await.unwrap();
        let first = sub.events.recv().await.unwrap();
        assert!(matches!(first, ServerEvent::ProgressUpdate(_)));
        let second = sub.events.recv().await.unwrap();
        assert!(matches!(second, ServerEvent::NewLog(_)));
        let third = sub.events.recv().await.unwrap();
        assert_eq!(third.name(), "spawn_particle");
    }

    #[tokio::test]
    async fn handle_reports_closed_after_dispatcher_stops() {
        let session = Session::new(&ChargeConfig::default(), NetworkIdentity::default());
        let (handle, task) = Dispatcher::new(session, StdRng::seed_from_u64(1)).spawn();
        task.abort();
        let _ = task.await;
        assert_eq!(handle.reset().await, Err(DispatchError::Closed));
        assert_eq!(handle.tick(), Err(DispatchError::Closed));
    }
}
