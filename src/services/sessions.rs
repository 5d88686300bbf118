use chrono::Duration;
use tracing::{debug, info};

use crate::{
    errors::SessionError,
    services::{
        database::{Session, Store, User},
        issue_unique_token, IssuedToken,
    },
    utils::{
        clock::Clock,
        crypto::{generate_token, hash_token},
    },
};

pub struct SessionManager<'a> {
    store: &'a dyn Store,
    clock: &'a dyn Clock,
    ttl: Duration,
    token_source: fn() -> String,
}

impl<'a> SessionManager<'a> {
    pub fn new(store: &'a dyn Store, clock: &'a dyn Clock, ttl: Duration) -> Self {
        Self {
            store,
            clock,
            ttl,
            token_source: generate_token,
        }
    }

    pub fn with_token_source(mut self, token_source: fn() -> String) -> Self {
        self.token_source = token_source;
        self
    }

    pub async fn create(&self, user_id: &str) -> Result<IssuedToken, SessionError> {
        self.create_for(user_id, self.ttl).await
    }

    pub async fn create_for(&self, user_id: &str, ttl: Duration) -> Result<IssuedToken, SessionError> {
        let created_at = self.clock.now();
        let expires_at = created_at + ttl;

        let token = issue_unique_token(self.token_source, |digest| {
            self.store.insert_session(Session {
                id: digest,
                user_id: user_id.to_string(),
                created_at,
                expires_at,
            })
        })
        .await?;

        info!(user_id, %expires_at, "session created");
        Ok(IssuedToken { token, expires_at })
    }

    /// Returns the owning user id. Expiry is checked here on every call; background
    /// purging only reclaims space.
    pub async fn validate(&self, token: &str) -> Result<String, SessionError> {
        let session = self
            .store
            .session_by_id(&hash_token(token))
            .await?
            .ok_or(SessionError::InvalidSession)?;

        if self.clock.now() >= session.expires_at {
            debug!(user_id = %session.user_id, "rejected expired session");
            return Err(SessionError::InvalidSession);
        }

        Ok(session.user_id)
    }

    /// Validates the token and loads its user, which must still be active.
    pub async fn authenticate(&self, token: &str) -> Result<User, SessionError> {
        let user_id = self.validate(token).await?;

        match self.store.user_by_id(&user_id).await? {
            Some(user) if user.is_active => Ok(user),
            _ => Err(SessionError::InvalidSession),
        }
    }

    pub async fn revoke(&self, token: &str) -> Result<bool, SessionError> {
        Ok(self.store.delete_session(&hash_token(token)).await?)
    }

    pub async fn revoke_all(&self, user_id: &str) -> Result<usize, SessionError> {
        let revoked = self.store.delete_user_sessions(user_id).await?;

        info!(user_id, revoked, "revoked all sessions");
        Ok(revoked)
    }

    pub async fn purge_expired(&self) -> Result<usize, SessionError> {
        Ok(self.store.purge_expired_sessions(self.clock.now()).await?)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::services::database::{
        AuthProvider, DatabaseError, MemoryStore, Role, SessionStore, UserStore,
    };
    use crate::utils::clock::ManualClock;

    fn clock() -> ManualClock {
        ManualClock::new(Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap())
    }

    fn fixed_token() -> String {
        "fixed-token-that-always-collides".to_string()
    }

    async fn add_user(store: &MemoryStore, id: &str, is_active: bool) {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
        store
            .insert_user(User {
                id: id.to_string(),
                username: id.to_string(),
                email: format!("{id}@example.com"),
                password_hash: None,
                role: Role::Student,
                class_subject: None,
                google_id: None,
                profile_picture: None,
                auth_provider: AuthProvider::Password,
                is_active,
                profile_complete: true,
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn validate_fails_one_nanosecond_past_expiry() {
        let store = MemoryStore::new();
        let clock = clock();
        let sessions = SessionManager::new(&store, &clock, Duration::hours(24));

        let issued = sessions.create("u1").await.unwrap();

        clock.set(issued.expires_at - Duration::nanoseconds(1));
        assert_eq!(sessions.validate(&issued.token).await.unwrap(), "u1");

        clock.set(issued.expires_at);
        assert!(matches!(
            sessions.validate(&issued.token).await,
            Err(SessionError::InvalidSession)
        ));

        clock.set(issued.expires_at + Duration::nanoseconds(1));
        assert!(matches!(
            sessions.validate(&issued.token).await,
            Err(SessionError::InvalidSession)
        ));
    }

    #[tokio::test]
    async fn only_the_digest_is_stored() {
        let store = MemoryStore::new();
        let clock = clock();
        let sessions = SessionManager::new(&store, &clock, Duration::hours(1));

        let issued = sessions.create("u1").await.unwrap();

        assert!(store.session_by_id(&issued.token).await.unwrap().is_none());
        assert!(store
            .session_by_id(&hash_token(&issued.token))
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn colliding_token_is_retried_once_then_fails() {
        let store = MemoryStore::new();
        let clock = clock();
        let sessions =
            SessionManager::new(&store, &clock, Duration::hours(1)).with_token_source(fixed_token);

        let first = sessions.create("u1").await.unwrap();
        let second = sessions.create("u2").await;

        assert_eq!(first.token, fixed_token());
        assert!(matches!(
            second,
            Err(SessionError::Common(crate::errors::CommonError::Database(
                DatabaseError::Conflict(_)
            )))
        ));
        assert_eq!(sessions.validate(&first.token).await.unwrap(), "u1");
    }

    #[tokio::test]
    async fn revoke_and_revoke_all() {
        let store = MemoryStore::new();
        let clock = clock();
        let sessions = SessionManager::new(&store, &clock, Duration::hours(1));

        let a = sessions.create("u1").await.unwrap();
        let b = sessions.create("u1").await.unwrap();
        let other = sessions.create("u2").await.unwrap();

        assert!(sessions.revoke(&a.token).await.unwrap());
        assert!(!sessions.revoke(&a.token).await.unwrap());
        assert_eq!(sessions.revoke_all("u1").await.unwrap(), 1);
        assert!(sessions.validate(&b.token).await.is_err());
        assert_eq!(sessions.validate(&other.token).await.unwrap(), "u2");
    }

    #[tokio::test]
    async fn authenticate_requires_an_active_user() {
        let store = MemoryStore::new();
        add_user(&store, "active", true).await;
        add_user(&store, "inactive", false).await;
        let clock = clock();
        let sessions = SessionManager::new(&store, &clock, Duration::hours(1));

        let good = sessions.create("active").await.unwrap();
        let bad = sessions.create("inactive").await.unwrap();

        assert_eq!(sessions.authenticate(&good.token).await.unwrap().id, "active");
        assert!(matches!(
            sessions.authenticate(&bad.token).await,
            Err(SessionError::InvalidSession)
        ));
    }

    #[tokio::test]
    async fn purge_expired_is_only_cleanup() {
        let store = MemoryStore::new();
        let clock = clock();
        let sessions = SessionManager::new(&store, &clock, Duration::hours(1));

        let short = sessions.create_for("u1", Duration::minutes(5)).await.unwrap();
        let long = sessions.create("u1").await.unwrap();
        clock.advance(Duration::minutes(10));

        assert_eq!(sessions.purge_expired().await.unwrap(), 1);
        assert!(sessions.validate(&short.token).await.is_err());
        assert_eq!(sessions.validate(&long.token).await.unwrap(), "u1");
    }
}
