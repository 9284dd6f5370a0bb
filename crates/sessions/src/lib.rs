//! Streaming-session tracking for the analytics gateway.
//!
//! A single live client may hold several duplicate transport connections to
//! the same destination (reconnects, multiple tabs). The registry here
//! reference-counts those duplicates under one analytics `session_id` so the
//! telemetry pipeline (C7) opens and closes `UserSessionLog` rows once per
//! *distinct* client, not once per socket.

pub mod registry;

pub use registry::{SessionKey, SessionRegistry};
