//! HTTP and `WebSocket` server for the Charge progress broadcast service.
//!
//! This crate is the I/O shell around [`charge_core`]:
//!
//! - **Dispatcher** ([`dispatcher`]) -- the single task that owns the
//!   session, drains an ordered command queue, and multicasts events via
//!   [`tokio::sync::broadcast`]
//! - **Ambient ticker** ([`ticker`]) -- enqueues growth ticks on an interval
//! - **`WebSocket` endpoint** (`/ws`) -- `init` on connect, then every
//!   event in dispatcher order; accepts `user_submit`
//! - **REST endpoints** -- reset, state, submit, CSV export
//! - **Network identity** ([`network`]) -- the address advertised to
//!   participants
//!
//! # Architecture
//!
//! Handlers never read or write the session directly. They queue commands
//! on a [`DispatcherHandle`](dispatcher::DispatcherHandle), so an HTTP
//! reset, a `WebSocket` submission, and an ambient tick are all serialized
//! in one stream. Delivery is fire-and-forget: a slow observer lags its
//! own receiver and is resynchronised with a fresh `init`, without holding
//! up anyone else.

pub mod dispatcher;
pub mod error;
pub mod export;
pub mod handlers;
pub mod network;
pub mod router;
pub mod server;
pub mod startup;
pub mod state;
pub mod ticker;
pub mod ws;

// Re-export primary types for convenience.
pub use dispatcher::{DispatchError, Dispatcher, DispatcherHandle, Subscription};
pub use router::{build_router, build_router_with_static};
pub use server::{ServerConfig, ServerError, start_server};
pub use startup::{Services, StartupError, run, spawn_services, spawn_services_with_rng};
pub use state::AppState;
