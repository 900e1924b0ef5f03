//! Shared type definitions for the Charge progress broadcast service.
//!
//! This crate is the single source of truth for every type that crosses a
//! crate or process boundary. Types defined here flow downstream to
//! `TypeScript` via `ts-rs` for the big-screen and mobile-entry front ends.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe identifier for connected observers
//! - [`structs`] -- Session records (submissions, log entries, snapshots)
//! - [`events`] -- Server-to-client and client-to-server event envelopes

pub mod events;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use events::{ClientEvent, NamePayload, ServerEvent};
pub use ids::ConnectionId;
pub use structs::{
    InitPayload, LogEntry, LogKind, NetworkIdentity, SessionSnapshot, Submission,
    COMPLETION_PROGRESS,
};

#[cfg(test)]
mod tests {
    //! `TypeScript` binding generation.

    #[test]
    fn export_bindings() {
        // The files are written to the `bindings/` directory relative to
        // the crate root.
        use ts_rs::TS;

        let _ = crate::ids::ConnectionId::export_all();
        let _ = crate::structs::Submission::export_all();
        let _ = crate::structs::LogEntry::export_all();
        let _ = crate::structs::LogKind::export_all();
        let _ = crate::structs::SessionSnapshot::export_all();
        let _ = crate::structs::NetworkIdentity::export_all();
        let _ = crate::structs::InitPayload::export_all();
        let _ = crate::events::NamePayload::export_all();
        let _ = crate::events::ServerEvent::export_all();
        let _ = crate::events::ClientEvent::export_all();
    }
}
