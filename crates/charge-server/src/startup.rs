//! Wiring: session, dispatcher, ticker, router, listener.
//!
//! [`spawn_services`] starts the background tasks around a fresh session;
//! [`run`] adds the HTTP listener and blocks until shutdown. The binary
//! calls [`run`]; tests call [`spawn_services`] and drive the router
//! directly.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use charge_core::{ChargeConfig, Session};
use charge_types::NetworkIdentity;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::task::JoinHandle;
use tracing::info;

use crate::dispatcher::{Dispatcher, DispatcherHandle};
use crate::network;
use crate::router::{build_router, build_router_with_static};
use crate::server::{self, ServerConfig, ServerError};
use crate::state::AppState;
use crate::ticker::spawn_ticker;

/// Errors that can occur when starting the service.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    /// The server failed to bind or serve.
    #[error("server start error: {0}")]
    Server(#[from] ServerError),
}

/// Background tasks backing one session.
#[derive(Debug)]
pub struct Services {
    /// Command handle into the dispatcher.
    pub handle: DispatcherHandle,
    /// The dispatcher task.
    pub dispatcher: JoinHandle<()>,
    /// The ambient ticker task, when ambient growth is enabled.
    pub ticker: Option<JoinHandle<()>>,
}

impl Services {
    /// Stop the ticker. The dispatcher stops once the last handle drops.
    pub fn shutdown(self) {
        if let Some(ticker) = self.ticker {
            ticker.abort();
        }
        drop(self.handle);
    }
}

/// Start the dispatcher (and ticker) with an OS-seeded RNG.
pub fn spawn_services(config: &ChargeConfig, identity: NetworkIdentity) -> Services {
    spawn_services_with_rng(config, identity, StdRng::from_os_rng())
}

/// Start the dispatcher (and ticker) with a caller-supplied RNG.
pub fn spawn_services_with_rng<R>(
    config: &ChargeConfig,
    identity: NetworkIdentity,
    rng: R,
) -> Services
where
    R: Rng + Send + 'static,
{
    let session = Session::new(config, identity);
    let (handle, dispatcher) = Dispatcher::new(session, rng).spawn();

    let ticker = config.ambient.enabled.then(|| {
        let period = Duration::from_millis(config.ambient.interval_ms);
        info!(
            interval_ms = config.ambient.interval_ms,
            min_submissions = config.ambient.min_submissions,
            "Ambient growth enabled"
        );
        spawn_ticker(handle.clone(), period)
    });

    Services {
        handle,
        dispatcher,
        ticker,
    }
}

/// Build the router for `config`, serving static files when configured.
pub fn router_for(config: &ChargeConfig, state: Arc<AppState>) -> Router {
    match config.server.static_dir.as_deref() {
        Some(dir) => {
            info!(static_dir = dir, "Serving front end");
            build_router_with_static(state, Path::new(dir))
        }
        None => build_router(state),
    }
}

/// Run the whole service until `Ctrl-C`.
///
/// # Errors
///
/// Returns [`StartupError::Server`] if the listener cannot bind or serving
/// fails.
pub async fn run(config: ChargeConfig) -> Result<(), StartupError> {
    let identity = network::resolve_identity(&config.server);
    info!(join_url = identity.join_url(), "Participants join here");

    let services = spawn_services(&config, identity);
    let state = Arc::new(AppState::new(services.handle.clone()));
    let router = router_for(&config, state);

    let result = server::start_server(&ServerConfig::from(&config.server), router, server::ctrl_c())
        .await;

    services.shutdown();
    Ok(result?)
}
