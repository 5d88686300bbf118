use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use surrealdb::sql::{
    statements::{BeginStatement, CommitStatement},
    Datetime, Thing,
};

use super::{
    constraint,
    surreal::{conflict_or, from_datetime, record_key, to_datetime},
    DatabaseError, SurrealStore,
};

/// Single-use credential recovery token, keyed by the SHA-256 digest of the raw token.
#[derive(Debug, Clone, PartialEq)]
pub struct ResetToken {
    pub id: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub used: bool,
}

impl ResetToken {
    /// Unused and `now < expires_at`.
    pub fn is_redeemable(&self, now: DateTime<Utc>) -> bool {
        !self.used && now < self.expires_at
    }
}

#[async_trait]
pub trait ResetTokenStore: Send + Sync {
    /// Fails with `Conflict(RESET_TOKEN)` when the digest is already present.
    async fn insert_reset_token(&self, token: ResetToken) -> Result<(), DatabaseError>;

    async fn reset_token_by_id(&self, token_id: &str) -> Result<Option<ResetToken>, DatabaseError>;

    /// Atomically marks the token used (only if still redeemable at `now`), stores the
    /// new password hash and deletes every session of the user. Returns `false`
    /// without touching anything when the token could not be claimed.
    async fn complete_password_reset(
        &self,
        token_id: &str,
        user_id: &str,
        password_hash: String,
        now: DateTime<Utc>,
    ) -> Result<bool, DatabaseError>;

    async fn purge_expired_reset_tokens(&self, now: DateTime<Utc>) -> Result<usize, DatabaseError>;
}

const CLAIM_FAILED: &str = "reset token is no longer redeemable";

/// Reads the statement errors of the reset transaction. A failed claim cancels every
/// other statement, so it means "not redeemable" rather than a storage failure.
fn claim_outcome(errors: HashMap<usize, surrealdb::Error>) -> Result<bool, DatabaseError> {
    if errors
        .values()
        .any(|error| error.to_string().contains(CLAIM_FAILED))
    {
        return Ok(false);
    }

    match errors.into_iter().min_by_key(|(index, _)| *index) {
        Some((_, error)) => Err(error.into()),
        None => Ok(true),
    }
}

#[derive(Serialize)]
struct ResetTokenContent {
    email: String,
    created_at: Datetime,
    expires_at: Datetime,
    used: bool,
}

#[derive(Deserialize)]
struct ResetTokenRow {
    id: Thing,
    email: String,
    created_at: Datetime,
    expires_at: Datetime,
    used: bool,
}

impl From<ResetTokenRow> for ResetToken {
    fn from(row: ResetTokenRow) -> Self {
        ResetToken {
            id: record_key(&row.id),
            email: row.email,
            created_at: from_datetime(row.created_at),
            expires_at: from_datetime(row.expires_at),
            used: row.used,
        }
    }
}

#[async_trait]
impl ResetTokenStore for SurrealStore {
    async fn insert_reset_token(&self, token: ResetToken) -> Result<(), DatabaseError> {
        let query = r#"
            CREATE type::thing("reset_token", $id) CONTENT $content
        "#;

        let content = ResetTokenContent {
            email: token.email,
            created_at: to_datetime(token.created_at),
            expires_at: to_datetime(token.expires_at),
            used: token.used,
        };

        self.db
            .query(query)
            .bind(("id", token.id))
            .bind(("content", content))
            .await?
            .check()
            .map_err(|e| conflict_or(e, constraint::RESET_TOKEN))?;

        Ok(())
    }

    async fn reset_token_by_id(&self, token_id: &str) -> Result<Option<ResetToken>, DatabaseError> {
        let query = r#"
            SELECT * FROM type::thing("reset_token", $id)
        "#;

        let mut response = self
            .db
            .query(query)
            .bind(("id", token_id.to_string()))
            .await?;
        let rows: Vec<ResetTokenRow> = response.take(0)?;

        Ok(rows.into_iter().next().map(ResetToken::from))
    }

    async fn complete_password_reset(
        &self,
        token_id: &str,
        user_id: &str,
        password_hash: String,
        now: DateTime<Utc>,
    ) -> Result<bool, DatabaseError> {
        let claim_query = r#"
            LET $claimed = (
                UPDATE type::thing("reset_token", $token_id)
                SET used = true
                WHERE used = false AND expires_at > $now
                RETURN AFTER
            );
            IF array::len($claimed) = 0 { THROW $claim_failed };
        "#;

        let password_query = r#"
            UPDATE type::thing("user", $user_id)
            SET password_hash = $password_hash, updated_at = $now
        "#;

        let revoke_query = r#"
            DELETE session WHERE user_id = $user_id
        "#;

        let mut response = self
            .db
            .query(BeginStatement::default())
            .query(claim_query)
            .query(password_query)
            .query(revoke_query)
            .query(CommitStatement::default())
            .bind(("token_id", token_id.to_string()))
            .bind(("user_id", user_id.to_string()))
            .bind(("password_hash", password_hash))
            .bind(("now", to_datetime(now)))
            .bind(("claim_failed", CLAIM_FAILED))
            .await?;

        claim_outcome(response.take_errors())
    }

    async fn purge_expired_reset_tokens(&self, now: DateTime<Utc>) -> Result<usize, DatabaseError> {
        let query = r#"
            DELETE reset_token WHERE expires_at <= $now RETURN BEFORE
        "#;

        let mut response = self.db.query(query).bind(("now", to_datetime(now))).await?;
        let rows: Vec<ResetTokenRow> = response.take(0)?;

        Ok(rows.len())
    }
}

#[cfg(test)]
mod tests {
    use surrealdb::error::Api;

    use super::*;

    fn query_error(message: &str) -> surrealdb::Error {
        surrealdb::Error::Api(Api::Query(message.to_string()))
    }

    #[test]
    fn committed_transaction_redeems() {
        assert!(matches!(claim_outcome(HashMap::new()), Ok(true)));
    }

    #[test]
    fn failed_claim_is_not_redeemable() {
        let cancelled = "The query was not executed due to a failed transaction";
        let errors = HashMap::from([
            (1, query_error(&format!("An error occurred: {CLAIM_FAILED}"))),
            (2, query_error(cancelled)),
            (3, query_error(cancelled)),
        ]);

        assert!(matches!(claim_outcome(errors), Ok(false)));
    }

    #[test]
    fn other_failures_surface_the_first_statement() {
        let errors = HashMap::from([
            (3, query_error("The query was not executed due to a failed transaction")),
            (2, query_error("Found NONE for field `password_hash`")),
        ]);

        match claim_outcome(errors) {
            Err(DatabaseError::Surreal(error)) => {
                assert!(error.to_string().contains("password_hash"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
}
