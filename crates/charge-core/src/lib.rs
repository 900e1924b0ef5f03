//! Session state machine for the Charge progress broadcast service.
//!
//! This crate owns everything that decides *what* observers see: the
//! authoritative session record, how submissions and ambient ticks move
//! progress, the completion trigger, and the bounded activity log. It does
//! no I/O. Each operation returns the ordered [`ServerEvent`]s the caller
//! must deliver, so transitions are testable without a transport.
//!
//! # Modules
//!
//! - [`config`] -- Configuration loading from `charge-config.yaml`
//! - [`policy`] -- [`IncrementPolicy`] variants and clamping
//! - [`trigger`] -- [`CompletionMatcher`] allow-list
//! - [`log_store`] -- [`LogStore`] newest-first bounded buffer
//! - [`session`] -- [`Session`] state machine
//! - [`lifecycle`] -- Reset and export
//!
//! [`ServerEvent`]: charge_types::ServerEvent

pub mod config;
pub mod lifecycle;
pub mod log_store;
pub mod policy;
pub mod session;
pub mod trigger;

pub use config::{ChargeConfig, ConfigError, PolicyKind};
pub use log_store::{LOG_CAP, LogStore};
pub use policy::IncrementPolicy;
pub use session::{
    Phase, Session, SessionState, SubmitError, SubmitOutcome, Submitted, normalize_name,
};
pub use trigger::CompletionMatcher;
