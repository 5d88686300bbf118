use chrono::{DateTime, Utc};
use surrealdb::{
    engine::remote::ws::{Client, Ws},
    opt::auth::Root,
    sql::{Datetime, Thing},
    Surreal,
};
use tracing::info;

use super::DatabaseError;

/// SurrealDB-backed store. Uniqueness is enforced with `UNIQUE` indexes and record ids
/// (see `utils::schemas`).
#[derive(Clone)]
pub struct SurrealStore {
    pub(super) db: Surreal<Client>,
}

impl SurrealStore {
    pub async fn connect(
        username: &str,
        password: &str,
        url: &str,
        namespace: &str,
        database: &str,
    ) -> Result<Self, surrealdb::Error> {
        let db = Surreal::new::<Ws>(url).await?;

        db.signin(Root { username, password }).await?;

        db.use_ns(namespace).use_db(database).await?;

        info!(url, namespace, database, "connected to surrealdb");

        Ok(Self { db })
    }

    pub async fn initialize_schemas(&self, schemas: &[&str]) -> Result<(), surrealdb::Error> {
        for schema_query in schemas {
            self.db.query(*schema_query).await?.check()?;
        }

        Ok(())
    }
}

/// Maps a unique-index or duplicate-record failure onto [`DatabaseError::Conflict`].
pub(super) fn conflict_or(error: surrealdb::Error, constraint: &'static str) -> DatabaseError {
    let message = error.to_string();

    if message.contains("already contains") || message.contains("already exists") {
        DatabaseError::Conflict(constraint)
    } else {
        DatabaseError::Surreal(error)
    }
}

pub(super) fn record_key(thing: &Thing) -> String {
    thing.id.to_raw()
}

pub(super) fn to_datetime(value: DateTime<Utc>) -> Datetime {
    Datetime::from(value)
}

pub(super) fn from_datetime(value: Datetime) -> DateTime<Utc> {
    value.0
}

#[cfg(test)]
mod tests {
    use surrealdb::error::Api;

    use super::*;

    fn query_error(message: &str) -> surrealdb::Error {
        surrealdb::Error::Api(Api::Query(message.to_string()))
    }

    #[test]
    fn unique_index_violation_is_a_conflict() {
        let error = query_error(
            "Database index `user_email` already contains 'jane@example.com', with record `user:abc`",
        );

        assert!(matches!(
            conflict_or(error, "user_email"),
            DatabaseError::Conflict("user_email")
        ));
    }

    #[test]
    fn duplicate_record_id_is_a_conflict() {
        let error = query_error("Database record `session:xyz` already exists");

        assert!(matches!(
            conflict_or(error, "session_token"),
            DatabaseError::Conflict("session_token")
        ));
    }

    #[test]
    fn other_failures_pass_through() {
        let error = query_error("Found 'abc' for field `score`, but expected a number");

        match conflict_or(error, "user_email") {
            DatabaseError::Surreal(error) => assert!(error.to_string().contains("`score`")),
            other => panic!("unexpected conflict: {other}"),
        }
    }
}
