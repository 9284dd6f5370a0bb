//! Reference-counted analytics-session registry.
//!
//! Keyed on `(client_ip, destination_name)` — explicitly not on any
//! authentication identity, per the transport's session-dedup contract.
//! Mutations are guarded by a single `RwLock`, mirroring the gateway's
//! existing request-scoped state stores.

use std::collections::HashMap;

use dbmcp_domain::trace::TraceEvent;
use parking_lot::RwLock;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Session key
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey {
    pub client_ip: String,
    pub destination: String,
}

impl SessionKey {
    pub fn new(client_ip: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            client_ip: client_ip.into(),
            destination: destination.into(),
        }
    }
}

struct Entry {
    session_id: String,
    ref_count: u32,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Registry
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// In-memory reference-count table for live streaming connections.
///
/// Does not itself open or close `UserSessionLog` rows — callers do that via
/// C7 using the `is_new` / `closed` signals returned here, so the registry
/// stays free of any control-DB dependency.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<SessionKey, Entry>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a new transport connection to an analytics session.
    ///
    /// If a session already exists for `key`, its ref-count is incremented
    /// and its existing `session_id` is returned with `is_new = false`.
    /// Otherwise `new_session_id` is installed as a fresh session with
    /// ref-count 1 and `is_new = true`.
    pub fn acquire(&self, key: SessionKey, new_session_id: impl FnOnce() -> String) -> Acquired {
        let mut sessions = self.sessions.write();
        let (session_id, ref_count, is_new) = match sessions.get_mut(&key) {
            Some(entry) => {
                entry.ref_count += 1;
                (entry.session_id.clone(), entry.ref_count, false)
            }
            None => {
                let session_id = new_session_id();
                sessions.insert(
                    key.clone(),
                    Entry {
                        session_id: session_id.clone(),
                        ref_count: 1,
                    },
                );
                (session_id, 1, true)
            }
        };
        drop(sessions);

        TraceEvent::SseConnected {
            client_ip: key.client_ip.clone(),
            destination: key.destination.clone(),
            session_id: session_id.clone(),
            is_new,
            ref_count,
        }
        .emit();

        Acquired {
            session_id,
            is_new,
            ref_count,
        }
    }

    /// Release a transport connection. Returns the session's final state;
    /// `closed = true` means the ref-count reached zero and the caller must
    /// close the session via C7.
    pub fn release(&self, key: &SessionKey) -> Option<Released> {
        let mut sessions = self.sessions.write();
        let entry = sessions.get_mut(key)?;
        entry.ref_count = entry.ref_count.saturating_sub(1);
        let ref_count = entry.ref_count;
        let session_id = entry.session_id.clone();

        if ref_count == 0 {
            sessions.remove(key);
        }
        drop(sessions);

        TraceEvent::SseDisconnected {
            client_ip: key.client_ip.clone(),
            destination: key.destination.clone(),
            session_id: session_id.clone(),
            ref_count,
        }
        .emit();

        Some(Released {
            session_id,
            ref_count,
            closed: ref_count == 0,
        })
    }

    /// Number of distinct analytics sessions currently open.
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Acquired {
    pub session_id: String,
    pub is_new: bool,
    pub ref_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Released {
    pub session_id: String,
    pub ref_count: u32,
    pub closed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> SessionKey {
        SessionKey::new("127.0.0.1", "orders_db")
    }

    #[test]
    fn first_acquire_creates_new_session() {
        let reg = SessionRegistry::new();
        let acquired = reg.acquire(key(), || "sess-1".into());
        assert!(acquired.is_new);
        assert_eq!(acquired.ref_count, 1);
        assert_eq!(acquired.session_id, "sess-1");
    }

    #[test]
    fn second_acquire_dedupes_and_increments_ref_count() {
        let reg = SessionRegistry::new();
        let first = reg.acquire(key(), || "sess-1".into());
        let second = reg.acquire(key(), || "sess-2".into());
        assert!(!second.is_new);
        assert_eq!(second.ref_count, 2);
        assert_eq!(second.session_id, first.session_id);
    }

    #[test]
    fn release_decrements_and_closes_at_zero() {
        let reg = SessionRegistry::new();
        reg.acquire(key(), || "sess-1".into());
        reg.acquire(key(), || "sess-2".into());

        let first_release = reg.release(&key()).unwrap();
        assert_eq!(first_release.ref_count, 1);
        assert!(!first_release.closed);
        assert_eq!(reg.len(), 1);

        let second_release = reg.release(&key()).unwrap();
        assert_eq!(second_release.ref_count, 0);
        assert!(second_release.closed);
        assert_eq!(reg.len(), 0);
    }

    #[test]
    fn release_unknown_key_returns_none() {
        let reg = SessionRegistry::new();
        assert!(reg.release(&key()).is_none());
    }

    #[test]
    fn distinct_destinations_get_distinct_sessions() {
        let reg = SessionRegistry::new();
        let a = reg.acquire(SessionKey::new("10.0.0.1", "db_a"), || "sess-a".into());
        let b = reg.acquire(SessionKey::new("10.0.0.1", "db_b"), || "sess-b".into());
        assert_ne!(a.session_id, b.session_id);
        assert_eq!(reg.len(), 2);
    }
}
