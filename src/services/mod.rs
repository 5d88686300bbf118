pub mod courses;
pub mod credentials;
pub mod database;
pub mod email;
pub mod enrollment;
pub mod exams;
pub mod password_reset;
pub mod sessions;

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;

use crate::utils::crypto::hash_token;
use database::DatabaseError;

/// Key collisions on a freshly generated token are retried this many times in total.
const TOKEN_ATTEMPTS: usize = 2;

/// A raw token handed to the client exactly once, with its absolute expiry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Draws a token from `token_source` and lets `insert` persist its digest. A duplicate
/// digest is retried once; any other failure, or a second collision, is returned.
pub(crate) async fn issue_unique_token<F, Fut>(
    token_source: fn() -> String,
    mut insert: F,
) -> Result<String, DatabaseError>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<(), DatabaseError>>,
{
    let mut attempt = 1;

    loop {
        let token = token_source();

        match insert(hash_token(&token)).await {
            Ok(()) => return Ok(token),
            Err(error) if error.is_conflict() && attempt < TOKEN_ATTEMPTS => {
                warn!(attempt, "generated token collided with an existing key, retrying");
                attempt += 1;
            }
            Err(error) => return Err(error),
        }
    }
}
