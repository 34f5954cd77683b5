use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use crate::models::SessionInfo;

/// Inactivity after which a session is dropped.
pub const DEFAULT_SESSION_MAX_AGE_MINUTES: i64 = 30;

#[derive(Debug, Clone)]
struct Session {
    user_id: Uuid,
    username: String,
    ip_address: String,
    last_activity: DateTime<Utc>,
}

/// SessionTracker
///
/// Active sessions keyed by the session id embedded in each issued token (`sid`).
/// A user holds at most one session: logging in again evicts the previous one,
/// which also invalidates the token that carried it.
#[derive(Debug)]
pub struct SessionTracker {
    sessions: DashMap<Uuid, Session>,
    max_age: Duration,
}

impl Default for SessionTracker {
    fn default() -> Self {
        Self::new(Duration::minutes(DEFAULT_SESSION_MAX_AGE_MINUTES))
    }
}

impl SessionTracker {
    pub fn new(max_age: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            max_age,
        }
    }

    pub fn track(&self, session_id: Uuid, user_id: Uuid, username: &str, ip_address: &str) {
        self.sessions
            .retain(|sid, s| *sid == session_id || s.user_id != user_id);
        self.sessions.insert(
            session_id,
            Session {
                user_id,
                username: username.to_string(),
                ip_address: ip_address.to_string(),
                last_activity: Utc::now(),
            },
        );
        tracing::debug!(%session_id, %user_id, "session tracked");
    }

    /// touch
    ///
    /// Refreshes the activity timestamp. Returns false when the session is unknown or
    /// has expired.
    pub fn touch(&self, session_id: Uuid) -> bool {
        self.sweep();
        match self.sessions.get_mut(&session_id) {
            Some(mut session) => {
                session.last_activity = Utc::now();
                true
            }
            None => false,
        }
    }

    pub fn remove(&self, session_id: Uuid) -> bool {
        self.sessions.remove(&session_id).is_some()
    }

    /// Drops every session belonging to `user_id`; used on deletion and password change.
    pub fn clear_user(&self, user_id: Uuid) {
        self.sessions.retain(|_, s| s.user_id != user_id);
    }

    pub fn active_sessions(&self) -> Vec<SessionInfo> {
        self.sweep();
        let mut sessions: Vec<SessionInfo> = self
            .sessions
            .iter()
            .map(|entry| SessionInfo {
                session_id: *entry.key(),
                user_id: entry.user_id,
                username: entry.username.clone(),
                ip_address: entry.ip_address.clone(),
                last_activity: entry.last_activity,
            })
            .collect();
        sessions.sort_by(|a, b| b.last_activity.cmp(&a.last_activity));
        sessions
    }

    pub fn active_count(&self) -> usize {
        self.sweep();
        self.sessions.len()
    }

    fn sweep(&self) {
        let cutoff = Utc::now() - self.max_age;
        self.sessions.retain(|_, s| s.last_activity > cutoff);
    }
}
