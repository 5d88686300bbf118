use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use surrealdb::sql::{Datetime, Thing};

use super::{
    constraint,
    surreal::{conflict_or, from_datetime, record_key, to_datetime},
    DatabaseError, SurrealStore,
};

/// A login session. `id` is the SHA-256 digest of the bearer token; the raw token is
/// never stored.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub id: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Fails with `Conflict(SESSION_TOKEN)` when the digest is already present.
    async fn insert_session(&self, session: Session) -> Result<(), DatabaseError>;

    async fn session_by_id(&self, session_id: &str) -> Result<Option<Session>, DatabaseError>;

    /// Returns whether a session was removed.
    async fn delete_session(&self, session_id: &str) -> Result<bool, DatabaseError>;

    async fn delete_user_sessions(&self, user_id: &str) -> Result<usize, DatabaseError>;

    /// Removes sessions with `expires_at <= now`.
    async fn purge_expired_sessions(&self, now: DateTime<Utc>) -> Result<usize, DatabaseError>;
}

#[derive(Serialize)]
struct SessionContent {
    user_id: String,
    created_at: Datetime,
    expires_at: Datetime,
}

#[derive(Deserialize)]
struct SessionRow {
    id: Thing,
    user_id: String,
    created_at: Datetime,
    expires_at: Datetime,
}

impl From<SessionRow> for Session {
    fn from(row: SessionRow) -> Self {
        Session {
            id: record_key(&row.id),
            user_id: row.user_id,
            created_at: from_datetime(row.created_at),
            expires_at: from_datetime(row.expires_at),
        }
    }
}

#[async_trait]
impl SessionStore for SurrealStore {
    async fn insert_session(&self, session: Session) -> Result<(), DatabaseError> {
        let query = r#"
            CREATE type::thing("session", $id) CONTENT $content
        "#;

        let content = SessionContent {
            user_id: session.user_id,
            created_at: to_datetime(session.created_at),
            expires_at: to_datetime(session.expires_at),
        };

        self.db
            .query(query)
            .bind(("id", session.id))
            .bind(("content", content))
            .await?
            .check()
            .map_err(|e| conflict_or(e, constraint::SESSION_TOKEN))?;

        Ok(())
    }

    async fn session_by_id(&self, session_id: &str) -> Result<Option<Session>, DatabaseError> {
        let query = r#"
            SELECT * FROM type::thing("session", $id)
        "#;

        let mut response = self
            .db
            .query(query)
            .bind(("id", session_id.to_string()))
            .await?;
        let rows: Vec<SessionRow> = response.take(0)?;

        Ok(rows.into_iter().next().map(Session::from))
    }

    async fn delete_session(&self, session_id: &str) -> Result<bool, DatabaseError> {
        let query = r#"
            DELETE type::thing("session", $id) RETURN BEFORE
        "#;

        let mut response = self
            .db
            .query(query)
            .bind(("id", session_id.to_string()))
            .await?;
        let rows: Vec<SessionRow> = response.take(0)?;

        Ok(!rows.is_empty())
    }

    async fn delete_user_sessions(&self, user_id: &str) -> Result<usize, DatabaseError> {
        let query = r#"
            DELETE session WHERE user_id = $user_id RETURN BEFORE
        "#;

        let mut response = self
            .db
            .query(query)
            .bind(("user_id", user_id.to_string()))
            .await?;
        let rows: Vec<SessionRow> = response.take(0)?;

        Ok(rows.len())
    }

    async fn purge_expired_sessions(&self, now: DateTime<Utc>) -> Result<usize, DatabaseError> {
        let query = r#"
            DELETE session WHERE expires_at <= $now RETURN BEFORE
        "#;

        let mut response = self.db.query(query).bind(("now", to_datetime(now))).await?;
        let rows: Vec<SessionRow> = response.take(0)?;

        Ok(rows.len())
    }
}
