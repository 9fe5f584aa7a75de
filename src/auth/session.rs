use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::Serialize;
use tracing::{debug, info};

/// Server-side view of a bearer token's session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Session {
    pub session_id: String,
    pub owner_id: String,
    pub created_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
    /// When the bearer token carrying this session stops being valid
    pub expires_at: DateTime<Utc>,
    pub revoked: bool,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SessionError {
    #[error("Session {0} has been revoked")]
    Revoked(String),

    #[error("Session {0} expired after inactivity")]
    Expired(String),

    #[error("Session {0} belongs to a different owner")]
    OwnerMismatch(String),
}

/// Tracks sessions for tokens issued elsewhere, so they can be expired and revoked
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Record activity on a session, registering it on first sight.
    /// `expires_at` is the bearer token's own expiry.
    async fn touch(
        &self,
        session_id: &str,
        owner_id: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<Session, SessionError>;

    /// Revoke a live session held by the owner
    async fn revoke(
        &self,
        session_id: &str,
        owner_id: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<Session, SessionError>;
}

/// Process-local session store
#[derive(Debug)]
pub struct InMemorySessionStore {
    sessions: DashMap<String, Session>,
    idle_timeout: Duration,
}

impl InMemorySessionStore {
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            idle_timeout,
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub(crate) fn touch_at(
        &self,
        session_id: &str,
        owner_id: &str,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Session, SessionError> {
        let mut entry = self
            .sessions
            .entry(session_id.to_string())
            .or_insert_with(|| {
                debug!(session_id, owner_id, "Registering session");
                Session {
                    session_id: session_id.to_string(),
                    owner_id: owner_id.to_string(),
                    created_at: now,
                    last_seen_at: now,
                    expires_at,
                    revoked: false,
                }
            });
        let session = entry.value_mut();
        session.expires_at = session.expires_at.max(expires_at);

        if session.owner_id != owner_id {
            return Err(SessionError::OwnerMismatch(session_id.to_string()));
        }
        if session.revoked {
            return Err(SessionError::Revoked(session_id.to_string()));
        }
        if now - session.last_seen_at > self.idle_timeout {
            session.revoked = true;
            info!(session_id, "Session expired after inactivity");
            return Err(SessionError::Expired(session_id.to_string()));
        }

        session.last_seen_at = now;
        Ok(session.clone())
    }

    /// Drop sessions whose bearer tokens have expired.
    ///
    /// Revoked and idle-expired sessions stay until then, otherwise the next
    /// request with the same token would register them again as live.
    pub fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, session| now <= session.expires_at);
        before - self.sessions.len()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn touch(
        &self,
        session_id: &str,
        owner_id: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<Session, SessionError> {
        self.touch_at(session_id, owner_id, expires_at, Utc::now())
    }

    async fn revoke(
        &self,
        session_id: &str,
        owner_id: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<Session, SessionError> {
        let mut session = self.touch_at(session_id, owner_id, expires_at, Utc::now())?;
        session.revoked = true;
        self.sessions.insert(session_id.to_string(), session.clone());
        info!(session_id, "Session revoked");
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day_after(now: DateTime<Utc>) -> DateTime<Utc> {
        now + Duration::hours(24)
    }

    #[tokio::test]
    async fn test_revoked_session_is_rejected() {
        let store = InMemorySessionStore::new(Duration::hours(1));
        let exp = day_after(Utc::now());

        store.touch("s1", "0xowner", exp).await.unwrap();
        assert!(store.revoke("s1", "0xowner", exp).await.unwrap().revoked);

        let again = store.touch("s1", "0xowner", exp).await;
        assert_eq!(again, Err(SessionError::Revoked("s1".to_string())));
    }

    #[test]
    fn test_idle_session_expires() {
        let store = InMemorySessionStore::new(Duration::minutes(30));
        let start = Utc::now();
        let exp = day_after(start);

        store.touch_at("s1", "0xowner", exp, start).unwrap();
        store.touch_at("s1", "0xowner", exp, start + Duration::minutes(20)).unwrap();
        // Activity at minute 20 keeps it alive until minute 50
        store.touch_at("s1", "0xowner", exp, start + Duration::minutes(45)).unwrap();

        let late = store.touch_at("s1", "0xowner", exp, start + Duration::minutes(90));
        assert_eq!(late, Err(SessionError::Expired("s1".to_string())));
        // Expiry is sticky
        let after = store.touch_at("s1", "0xowner", exp, start + Duration::minutes(91));
        assert_eq!(after, Err(SessionError::Revoked("s1".to_string())));
    }

    #[test]
    fn test_session_is_bound_to_owner() {
        let store = InMemorySessionStore::new(Duration::hours(1));
        let exp = day_after(Utc::now());
        store.touch_at("s1", "0xalice", exp, Utc::now()).unwrap();

        let other = store.touch_at("s1", "0xbob", exp, Utc::now());
        assert_eq!(other, Err(SessionError::OwnerMismatch("s1".to_string())));
    }

    #[test]
    fn test_purge_drops_only_expired_tokens() {
        let store = InMemorySessionStore::new(Duration::minutes(5));
        let start = Utc::now();
        store.touch_at("old", "0xowner", start + Duration::minutes(8), start).unwrap();
        store.touch_at("fresh", "0xowner", day_after(start), start + Duration::minutes(9)).unwrap();

        assert_eq!(store.purge_expired(start + Duration::minutes(10)), 1);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_revocation_survives_purge() {
        let store = InMemorySessionStore::new(Duration::minutes(5));
        let start = Utc::now();
        let exp = day_after(start);

        store.touch_at("s1", "0xowner", exp, start).unwrap();
        store.revoke("s1", "0xowner", exp).await.unwrap();

        assert_eq!(store.purge_expired(start + Duration::minutes(10)), 0);
        let again = store.touch_at("s1", "0xowner", exp, start + Duration::minutes(11));
        assert_eq!(again, Err(SessionError::Revoked("s1".to_string())));
    }

    #[test]
    fn test_idle_expiry_survives_purge() {
        let store = InMemorySessionStore::new(Duration::minutes(5));
        let start = Utc::now();
        let exp = day_after(start);

        store.touch_at("s1", "0xowner", exp, start).unwrap();
        store.purge_expired(start + Duration::minutes(30));

        let late = store.touch_at("s1", "0xowner", exp, start + Duration::minutes(31));
        assert_eq!(late, Err(SessionError::Expired("s1".to_string())));
    }
}
