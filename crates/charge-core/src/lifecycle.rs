//! Session lifecycle: reset to initial state and read-only export.

use charge_types::{ServerEvent, Submission};

use crate::session::{Session, SessionState};

impl Session {
    /// Reinitialize the session and return the `init` event to broadcast.
    ///
    /// Progress, completion, counters, log, and submissions return to their
    /// defaults. The network identity is preserved.
    pub fn reset(&mut self) -> Vec<ServerEvent> {
        self.state = SessionState::new(self.log_cap);
        vec![self.init_event()]
    }

    /// Accepted submissions since the last reset, oldest first.
    pub fn export_snapshot(&self) -> Vec<Submission> {
        self.state.all_submissions().to_vec()
    }
}
