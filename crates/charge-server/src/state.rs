//! Shared application state for the HTTP and `WebSocket` handlers.
//!
//! Handlers never touch the session directly. They hold a
//! [`DispatcherHandle`] and queue commands; the dispatcher task is the only
//! writer.

use crate::dispatcher::DispatcherHandle;

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`](std::sync::Arc) and injected via Axum's `State`
/// extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Command queue into the dispatcher.
    pub dispatcher: DispatcherHandle,
}

impl AppState {
    /// Create application state around a running dispatcher.
    pub const fn new(dispatcher: DispatcherHandle) -> Self {
        Self { dispatcher }
    }
}
