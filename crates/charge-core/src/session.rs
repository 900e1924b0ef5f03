//! The session state machine.
//!
//! [`Session`] owns the single [`SessionState`] record and turns each inbound
//! command (submission, ambient tick, reset) into a state change plus the
//! ordered list of [`ServerEvent`]s that observers must see. No I/O happens
//! here; the caller delivers the returned events.
//!
//! # States
//!
//! ```text
//!   Accepting --(trigger submission)--> Complete
//!       ^                                   |
//!       +-------------(reset)---------------+
//! ```
//!
//! While `Complete`, submissions and ticks are acknowledged as no-ops.

use chrono::{DateTime, Local, Utc};
use rand::Rng;

use charge_types::{
    COMPLETION_PROGRESS, InitPayload, LogEntry, LogKind, NamePayload, NetworkIdentity,
    ServerEvent, SessionSnapshot, Submission,
};

use crate::config::ChargeConfig;
use crate::log_store::LogStore;
use crate::policy::{self, IncrementPolicy};
use crate::trigger::CompletionMatcher;

/// Longest accepted name, in characters. Longer names are truncated.
pub const MAX_NAME_CHARS: usize = 64;

/// A submission that never reached the state machine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmitError {
    /// The name was missing or only whitespace.
    #[error("submission name is empty")]
    EmptyName,
}

/// Trim `raw` and cap it at [`MAX_NAME_CHARS`].
///
/// # Errors
///
/// Returns [`SubmitError::EmptyName`] if nothing is left after trimming.
pub fn normalize_name(raw: &str) -> Result<String, SubmitError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(SubmitError::EmptyName);
    }
    Ok(trimmed.chars().take(MAX_NAME_CHARS).collect())
}

/// Dispatcher state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Submissions and ticks move progress.
    Accepting,
    /// The trigger fired; progress is frozen at 100 until reset.
    Complete,
}

/// What a submission did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SubmitOutcome {
    /// Counted; progress moved to the contained value.
    Accepted {
        /// Progress after the submission.
        progress: f64,
    },
    /// The name was a completion trigger and the session completed.
    Completed,
    /// The session was already complete; nothing changed.
    Ignored,
}

/// Result of a submission: its outcome and the events to broadcast, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct Submitted {
    /// What happened.
    pub outcome: SubmitOutcome,
    /// Events for every observer, in emission order.
    pub events: Vec<ServerEvent>,
}

/// The single mutable record of one running session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub(crate) progress: f64,
    pub(crate) phase: Phase,
    pub(crate) submission_count: u64,
    pub(crate) logs: LogStore,
    pub(crate) all_submissions: Vec<Submission>,
}

impl SessionState {
    /// Fresh state with a log of capacity `log_cap`.
    pub fn new(log_cap: usize) -> Self {
        Self {
            progress: 0.0,
            phase: Phase::Accepting,
            submission_count: 0,
            logs: LogStore::new(log_cap),
            all_submissions: Vec::new(),
        }
    }

    /// Current progress.
    pub const fn progress(&self) -> f64 {
        self.progress
    }

    /// Whether the completion trigger has fired.
    pub fn is_complete(&self) -> bool {
        self.phase == Phase::Complete
    }

    /// Current dispatcher state.
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// Non-trigger submissions accepted since the last reset.
    pub const fn submission_count(&self) -> u64 {
        self.submission_count
    }

    /// The activity log.
    pub const fn logs(&self) -> &LogStore {
        &self.logs
    }

    /// Accepted submissions, oldest first.
    pub fn all_submissions(&self) -> &[Submission] {
        &self.all_submissions
    }

    /// Observer view for bootstrap. Submissions are left to export.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            progress: self.progress,
            is_complete: self.is_complete(),
            submission_count: self.submission_count,
            logs: self.logs.to_vec(),
        }
    }
}

/// Session state plus the rules that mutate it.
#[derive(Debug, Clone)]
pub struct Session {
    pub(crate) state: SessionState,
    pub(crate) log_cap: usize,
    policy: IncrementPolicy,
    matcher: CompletionMatcher,
    ceiling: f64,
    ambient_enabled: bool,
    ambient_min_submissions: u64,
    identity: NetworkIdentity,
}

impl Session {
    /// Create a session configured by `config`, advertising `identity`.
    pub fn new(config: &ChargeConfig, identity: NetworkIdentity) -> Self {
        Self {
            state: SessionState::new(config.progress.log_cap),
            log_cap: config.progress.log_cap,
            policy: IncrementPolicy::from_config(&config.progress),
            matcher: CompletionMatcher::from_config(&config.triggers),
            ceiling: config.progress.ceiling,
            ambient_enabled: config.ambient.enabled,
            ambient_min_submissions: config.ambient.min_submissions,
            identity,
        }
    }

    /// Read-only view of the state.
    pub const fn state(&self) -> &SessionState {
        &self.state
    }

    /// The advertised network identity.
    pub const fn identity(&self) -> &NetworkIdentity {
        &self.identity
    }

    /// The organic growth ceiling.
    pub const fn ceiling(&self) -> f64 {
        self.ceiling
    }

    /// Immutable copy of the current state.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.snapshot()
    }

    /// Snapshot plus network identity, as sent in `init`.
    pub fn init_payload(&self) -> InitPayload {
        InitPayload {
            snapshot: self.snapshot(),
            identity: self.identity.clone(),
        }
    }

    /// The `init` event for the current state.
    pub fn init_event(&self) -> ServerEvent {
        ServerEvent::Init(Box::new(self.init_payload()))
    }

    /// Handle one participant submission received at `now`.
    ///
    /// # Errors
    ///
    /// Returns [`SubmitError::EmptyName`] for a blank name. The state is
    /// untouched and no events are produced.
    pub fn submit<R: Rng + ?Sized>(
        &mut self,
        raw_name: &str,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<Submitted, SubmitError> {
        let name = normalize_name(raw_name)?;

        if self.state.is_complete() {
            return Ok(Submitted {
                outcome: SubmitOutcome::Ignored,
                events: Vec::new(),
            });
        }

        if self.matcher.is_completion_trigger(&name) {
            return Ok(self.complete(name, now));
        }

        self.state.all_submissions.push(Submission {
            name: name.clone(),
            submitted_at: now,
        });
        self.state.submission_count = self.state.submission_count.saturating_add(1);

        let delta = self.policy.next_user_delta(self.state.progress, rng);
        self.state.progress = policy::advance(self.state.progress, delta, self.ceiling);

        let log = LogEntry {
            timestamp: format_clock(now),
            message: format!("{name} injected energy!"),
            kind: LogKind::Info,
        };
        self.state.logs.append(log.clone());

        Ok(Submitted {
            outcome: SubmitOutcome::Accepted {
                progress: self.state.progress,
            },
            events: vec![
                ServerEvent::ProgressUpdate(self.state.progress),
                ServerEvent::NewLog(log),
                ServerEvent::SpawnParticle(NamePayload::new(name)),
            ],
        })
    }

    /// Handle one ambient tick.
    ///
    /// Moves progress only while accepting, after the minimum submission
    /// count, and below the ceiling. Returns the events to broadcast.
    pub fn tick(&mut self) -> Vec<ServerEvent> {
        if !self.ambient_enabled
            || self.state.is_complete()
            || self.state.submission_count < self.ambient_min_submissions
            || self.state.progress >= self.ceiling
        {
            return Vec::new();
        }

        let delta = IncrementPolicy::next_auto_delta(self.state.progress);
        self.state.progress = policy::advance(self.state.progress, delta, self.ceiling);
        vec![ServerEvent::ProgressUpdate(self.state.progress)]
    }

    /// The trigger path: jump to 100 and freeze.
    fn complete(&mut self, name: String, now: DateTime<Utc>) -> Submitted {
        self.state.progress = COMPLETION_PROGRESS;
        self.state.phase = Phase::Complete;

        let log = LogEntry {
            timestamp: format_clock(now),
            message: format!("{name} injected the key energy, charge complete!"),
            kind: LogKind::Success,
        };
        self.state.logs.append(log.clone());

        Submitted {
            outcome: SubmitOutcome::Completed,
            events: vec![
                ServerEvent::ProgressUpdate(COMPLETION_PROGRESS),
                ServerEvent::Completion(NamePayload::new(name)),
                ServerEvent::NewLog(log),
            ],
        }
    }
}

/// Local wall-clock `HH:MM:SS` for log entries.
fn format_clock(now: DateTime<Utc>) -> String {
    now.with_timezone(&Local).format("%H:%M:%S").to_string()
}
