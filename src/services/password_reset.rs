use argon2::Params;
use chrono::Duration;
use tracing::{info, warn};

use crate::{
    errors::PasswordResetError,
    services::{
        database::{ResetToken, Store},
        issue_unique_token, IssuedToken,
    },
    utils::{
        clock::Clock,
        crypto::{generate_token, hash_password, hash_token},
        validation::normalize_email,
    },
};

/// Issues single-use reset tokens and redeems them. A redeemed token changes the
/// password and signs the user out everywhere in one store operation.
pub struct PasswordResetFlow<'a> {
    store: &'a dyn Store,
    clock: &'a dyn Clock,
    params: &'a Params,
    ttl: Duration,
    token_source: fn() -> String,
}

impl<'a> PasswordResetFlow<'a> {
    pub fn new(store: &'a dyn Store, clock: &'a dyn Clock, params: &'a Params, ttl: Duration) -> Self {
        Self {
            store,
            clock,
            params,
            ttl,
            token_source: generate_token,
        }
    }

    pub fn with_token_source(mut self, token_source: fn() -> String) -> Self {
        self.token_source = token_source;
        self
    }

    pub async fn issue(&self, email: &str) -> Result<IssuedToken, PasswordResetError> {
        let email = normalize_email(email);

        match self.store.user_by_email(&email).await? {
            Some(user) if user.is_active => {}
            _ => return Err(PasswordResetError::UserNotFound),
        }

        let created_at = self.clock.now();
        let expires_at = created_at + self.ttl;

        let token = issue_unique_token(self.token_source, |digest| {
            self.store.insert_reset_token(ResetToken {
                id: digest,
                email: email.clone(),
                created_at,
                expires_at,
                used: false,
            })
        })
        .await?;

        info!(%expires_at, "password reset token issued");
        Ok(IssuedToken { token, expires_at })
    }

    pub async fn consume(&self, token: &str, new_password: &str) -> Result<(), PasswordResetError> {
        let token_id = hash_token(token);
        let now = self.clock.now();

        let reset_token = match self.store.reset_token_by_id(&token_id).await? {
            Some(reset_token) if reset_token.is_redeemable(now) => reset_token,
            _ => return Err(PasswordResetError::InvalidOrExpiredToken),
        };

        let user = match self.store.user_by_email(&reset_token.email).await? {
            Some(user) if user.is_active => user,
            _ => return Err(PasswordResetError::InvalidOrExpiredToken),
        };

        let password_hash = hash_password(new_password, self.params)?;

        // The store re-checks redeemability under its own lock, so two concurrent
        // consumers cannot both succeed.
        let claimed = self
            .store
            .complete_password_reset(&token_id, &user.id, password_hash, now)
            .await?;

        if !claimed {
            warn!(user_id = %user.id, "reset token was claimed concurrently");
            return Err(PasswordResetError::InvalidOrExpiredToken);
        }

        info!(user_id = %user.id, "password reset completed, sessions revoked");
        Ok(())
    }

    pub async fn purge_expired(&self) -> Result<usize, PasswordResetError> {
        Ok(self.store.purge_expired_reset_tokens(self.clock.now()).await?)
    }
}
