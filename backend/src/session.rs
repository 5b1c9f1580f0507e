use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;

/// Name of the cookie carrying the session token.
pub const SESSION_COOKIE: &str = "catering.sid";

#[derive(Debug, Clone, Copy)]
struct Session {
    user_id: i32,
    expires_at: Instant,
}

/// SessionStore
///
/// Server-side sessions: opaque token -> (user id, expiry). Cheap to clone; all
/// clones share the same map.
#[derive(Debug, Clone)]
pub struct SessionStore {
    inner: Arc<DashMap<String, Session>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
            ttl,
        }
    }

    pub fn with_ttl_hours(hours: u64) -> Self {
        Self::new(Duration::from_secs(hours * 3600))
    }

    /// Starts a session for `user_id` and returns its token.
    pub fn create(&self, user_id: i32) -> String {
        let token = uuid::Uuid::new_v4().simple().to_string();
        let session = Session {
            user_id,
            expires_at: Instant::now() + self.ttl,
        };
        self.inner.insert(token.clone(), session);
        token
    }

    /// Resolves a token to its user id. Expired sessions are dropped on access.
    pub fn get(&self, token: &str) -> Option<i32> {
        let entry = self.inner.get(token)?;
        if entry.expires_at > Instant::now() {
            Some(entry.user_id)
        } else {
            drop(entry);
            self.inner.remove(token);
            None
        }
    }

    pub fn remove(&self, token: &str) {
        self.inner.remove(token);
    }

    /// Ends every session belonging to `user_id` (account deleted or password changed).
    pub fn remove_user(&self, user_id: i32) {
        self.inner.retain(|_, session| session.user_id != user_id);
    }

    /// Drops all expired sessions and returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.inner.len();
        self.inner.retain(|_, session| session.expires_at > now);
        before - self.inner.len()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
