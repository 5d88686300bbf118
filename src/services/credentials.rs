use argon2::Params;
use tracing::info;

use crate::{
    errors::{SigninError, SignupError, UserError},
    services::database::{
        AuthProvider, DatabaseError, Role, Store, User, UserPatch, UserProfile,
    },
    utils::{
        clock::Clock,
        crypto::{generate_uuid, hash_password, verify_password_hash},
        validation::normalize_email,
    },
};

/// Student search never returns more than this many rows.
pub const SEARCH_LIMIT: usize = 10;

#[derive(Debug, Clone)]
pub struct NewAccount {
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: Role,
    pub class_subject: Option<String>,
}

#[derive(Debug, Clone)]
pub struct OAuthIdentity {
    pub email: String,
    pub username: String,
    pub google_id: String,
    pub profile_picture: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub username: Option<String>,
    pub class_subject: Option<String>,
    pub profile_picture: Option<String>,
}

/// Account creation, password hashing and verification, and profile maintenance.
pub struct CredentialStore<'a> {
    store: &'a dyn Store,
    clock: &'a dyn Clock,
    params: &'a Params,
}

impl<'a> CredentialStore<'a> {
    pub fn new(store: &'a dyn Store, clock: &'a dyn Clock, params: &'a Params) -> Self {
        Self {
            store,
            clock,
            params,
        }
    }

    pub fn hash(&self, password: &str) -> Result<String, argon2::password_hash::Error> {
        hash_password(password, self.params)
    }

    /// Unknown email, inactive account, password-less account and wrong password are
    /// indistinguishable to the caller.
    pub async fn verify(&self, email: &str, password: &str) -> Result<User, SigninError> {
        let email = normalize_email(email);

        let user = match self.store.user_by_email(&email).await? {
            Some(user) if user.is_active => user,
            _ => return Err(SigninError::InvalidCredentials),
        };

        let Some(password_hash) = user.password_hash.as_deref() else {
            return Err(SigninError::InvalidCredentials);
        };

        if !verify_password_hash(password, password_hash)? {
            return Err(SigninError::InvalidCredentials);
        }

        Ok(user)
    }

    pub async fn signup(&self, account: NewAccount) -> Result<UserProfile, SignupError> {
        let now = self.clock.now();
        let password_hash = self.hash(&account.password)?;

        let user = User {
            id: generate_uuid(),
            username: account.username.trim().to_string(),
            email: normalize_email(&account.email),
            password_hash: Some(password_hash),
            role: account.role,
            class_subject: account.class_subject,
            google_id: None,
            profile_picture: None,
            auth_provider: AuthProvider::Password,
            is_active: true,
            profile_complete: true,
            created_at: now,
            updated_at: now,
        };
        let profile = UserProfile::from(&user);

        match self.store.insert_user(user).await {
            Ok(()) => {}
            Err(DatabaseError::Conflict(_)) => return Err(SignupError::EmailAlreadyExists),
            Err(error) => return Err(error.into()),
        }

        info!(user_id = %profile.id, role = %profile.role, "account created");
        Ok(profile)
    }

    /// Attaches a Google identity to the account with this email, or creates a student
    /// account without a password. The flag is `true` when an account was created.
    ///
    /// This is the entry point for the external OAuth adapter, which calls it only after
    /// it has verified the provider's ID token. No route exposes it, because an identity
    /// asserted by an HTTP caller would let anyone claim any email.
    pub async fn link_oauth_identity(
        &self,
        identity: OAuthIdentity,
    ) -> Result<(UserProfile, bool), UserError> {
        let email = normalize_email(&identity.email);
        let now = self.clock.now();

        if let Some(existing) = self.store.user_by_email(&email).await? {
            return self.attach_google_id(existing, identity, now).await;
        }

        let user = User {
            id: generate_uuid(),
            username: identity.username.clone(),
            email: email.clone(),
            password_hash: None,
            role: Role::Student,
            class_subject: None,
            google_id: Some(identity.google_id.clone()),
            profile_picture: identity.profile_picture.clone(),
            auth_provider: AuthProvider::Google,
            is_active: true,
            profile_complete: false,
            created_at: now,
            updated_at: now,
        };
        let profile = UserProfile::from(&user);

        match self.store.insert_user(user).await {
            Ok(()) => {
                info!(user_id = %profile.id, "account created from google identity");
                Ok((profile, true))
            }
            // Lost a race with another signup for the same email: link instead.
            Err(DatabaseError::Conflict(_)) => match self.store.user_by_email(&email).await? {
                Some(existing) => self.attach_google_id(existing, identity, now).await,
                None => Err(UserError::UserNotFound),
            },
            Err(error) => Err(error.into()),
        }
    }

    async fn attach_google_id(
        &self,
        existing: User,
        identity: OAuthIdentity,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Result<(UserProfile, bool), UserError> {
        if !existing.is_active {
            return Err(UserError::UserNotFound);
        }

        let patch = UserPatch {
            google_id: Some(identity.google_id),
            profile_picture: identity.profile_picture,
            ..UserPatch::default()
        };

        let updated = self
            .store
            .update_user(&existing.id, patch, now)
            .await?
            .ok_or(UserError::UserNotFound)?;

        Ok((UserProfile::from(&updated), false))
    }

    pub async fn update_preferences(
        &self,
        user_id: &str,
        role: Role,
        class_subject: Option<String>,
    ) -> Result<UserProfile, UserError> {
        let patch = UserPatch {
            role: Some(role),
            class_subject,
            profile_complete: Some(true),
            ..UserPatch::default()
        };

        self.apply(user_id, patch).await
    }

    pub async fn update_profile(
        &self,
        user_id: &str,
        update: ProfileUpdate,
    ) -> Result<UserProfile, UserError> {
        let patch = UserPatch {
            username: update.username.map(|username| username.trim().to_string()),
            class_subject: update.class_subject,
            profile_picture: update.profile_picture,
            ..UserPatch::default()
        };

        self.apply(user_id, patch).await
    }

    /// Soft delete: clears the active flag and revokes every session of the user.
    pub async fn deactivate(&self, user_id: &str) -> Result<(), UserError> {
        let patch = UserPatch {
            is_active: Some(false),
            ..UserPatch::default()
        };

        self.apply(user_id, patch).await?;
        let revoked = self.store.delete_user_sessions(user_id).await?;

        info!(user_id, revoked, "account deactivated");
        Ok(())
    }

    pub async fn profile(&self, user_id: &str) -> Result<UserProfile, UserError> {
        match self.active_user(user_id).await? {
            Some(user) => Ok(UserProfile::from(&user)),
            None => Err(UserError::UserNotFound),
        }
    }

    pub async fn active_user(&self, user_id: &str) -> Result<Option<User>, DatabaseError> {
        Ok(self
            .store
            .user_by_id(user_id)
            .await?
            .filter(|user| user.is_active))
    }

    pub async fn search_students(&self, email_fragment: &str) -> Result<Vec<UserProfile>, UserError> {
        let fragment = email_fragment.trim();
        if fragment.is_empty() {
            return Ok(Vec::new());
        }

        let students = self.store.search_students(fragment, SEARCH_LIMIT).await?;

        Ok(students
            .iter()
            .filter(|user| user.is_active)
            .map(UserProfile::from)
            .collect())
    }

    pub async fn list_by_role(&self, role: Role) -> Result<Vec<UserProfile>, UserError> {
        let users = self.store.users_by_role(role).await?;

        Ok(users.iter().map(UserProfile::from).collect())
    }

    async fn apply(&self, user_id: &str, patch: UserPatch) -> Result<UserProfile, UserError> {
        if self.active_user(user_id).await?.is_none() {
            return Err(UserError::UserNotFound);
        }

        let updated = self
            .store
            .update_user(user_id, patch, self.clock.now())
            .await?
            .ok_or(UserError::UserNotFound)?;

        Ok(UserProfile::from(&updated))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::services::database::{MemoryStore, Session, SessionStore, UserStore};
    use crate::utils::clock::ManualClock;

    struct Fixture {
        store: MemoryStore,
        clock: ManualClock,
        params: Params,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                store: MemoryStore::new(),
                clock: ManualClock::new(Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()),
                params: Params::new(8, 1, 1, None).unwrap(),
            }
        }

        fn credentials(&self) -> CredentialStore<'_> {
            CredentialStore::new(&self.store, &self.clock, &self.params)
        }
    }

    fn account(email: &str) -> NewAccount {
        NewAccount {
            username: "Jane".to_string(),
            email: email.to_string(),
            password: "correct horse".to_string(),
            role: Role::Student,
            class_subject: None,
        }
    }

    #[tokio::test]
    async fn signup_rejects_duplicate_email_case_insensitively() {
        let fixture = Fixture::new();
        let credentials = fixture.credentials();

        let profile = credentials.signup(account("Jane@Example.com")).await.unwrap();
        let duplicate = credentials.signup(account("  jane@example.COM")).await;

        assert_eq!(profile.email, "jane@example.com");
        assert!(matches!(duplicate, Err(SignupError::EmailAlreadyExists)));
        assert_eq!(
            fixture.store.users_by_role(Role::Student).await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn verify_accepts_the_right_password_only() {
        let fixture = Fixture::new();
        let credentials = fixture.credentials();
        credentials.signup(account("jane@example.com")).await.unwrap();

        let user = credentials
            .verify("JANE@example.com", "correct horse")
            .await
            .unwrap();
        let wrong = credentials.verify("jane@example.com", "battery staple").await;
        let unknown = credentials.verify("nobody@example.com", "correct horse").await;

        assert_eq!(user.email, "jane@example.com");
        assert!(matches!(wrong, Err(SigninError::InvalidCredentials)));
        assert!(matches!(unknown, Err(SigninError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn deactivated_accounts_cannot_sign_in_and_lose_sessions() {
        let fixture = Fixture::new();
        let credentials = fixture.credentials();
        let profile = credentials.signup(account("jane@example.com")).await.unwrap();
        fixture
            .store
            .insert_session(Session {
                id: "digest".to_string(),
                user_id: profile.id.clone(),
                created_at: fixture.clock.now(),
                expires_at: fixture.clock.now() + chrono::Duration::hours(1),
            })
            .await
            .unwrap();

        credentials.deactivate(&profile.id).await.unwrap();

        let signin = credentials.verify("jane@example.com", "correct horse").await;
        assert!(matches!(signin, Err(SigninError::InvalidCredentials)));
        assert!(fixture.store.session_by_id("digest").await.unwrap().is_none());
        assert!(matches!(
            credentials.profile(&profile.id).await,
            Err(UserError::UserNotFound)
        ));
    }

    #[tokio::test]
    async fn oauth_identity_links_existing_account() {
        let fixture = Fixture::new();
        let credentials = fixture.credentials();
        let existing = credentials.signup(account("jane@example.com")).await.unwrap();

        let (linked, is_new) = credentials
            .link_oauth_identity(OAuthIdentity {
                email: "Jane@example.com".to_string(),
                username: "Jane G".to_string(),
                google_id: "g-123".to_string(),
                profile_picture: Some("https://example.com/jane.png".to_string()),
            })
            .await
            .unwrap();

        assert!(!is_new);
        assert_eq!(linked.id, existing.id);
        assert_eq!(
            linked.profile_picture.as_deref(),
            Some("https://example.com/jane.png")
        );
        let stored = fixture.store.user_by_id(&existing.id).await.unwrap().unwrap();
        assert_eq!(stored.google_id.as_deref(), Some("g-123"));
    }

    #[tokio::test]
    async fn oauth_identity_creates_passwordless_student() {
        let fixture = Fixture::new();
        let credentials = fixture.credentials();

        let (profile, is_new) = credentials
            .link_oauth_identity(OAuthIdentity {
                email: "sam@example.com".to_string(),
                username: "Sam".to_string(),
                google_id: "g-456".to_string(),
                profile_picture: None,
            })
            .await
            .unwrap();

        assert!(is_new);
        assert_eq!(profile.role, Role::Student);
        assert_eq!(profile.auth_provider, AuthProvider::Google);
        assert!(!profile.profile_complete);
        let signin = credentials.verify("sam@example.com", "").await;
        assert!(matches!(signin, Err(SigninError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn preferences_switch_role_and_complete_profile() {
        let fixture = Fixture::new();
        let credentials = fixture.credentials();
        let profile = credentials.signup(account("jane@example.com")).await.unwrap();

        let updated = credentials
            .update_preferences(&profile.id, Role::Teacher, Some("Physics".to_string()))
            .await
            .unwrap();

        assert_eq!(updated.role, Role::Teacher);
        assert_eq!(updated.class_subject.as_deref(), Some("Physics"));
        assert!(updated.profile_complete);
    }

    #[tokio::test]
    async fn student_search_is_capped() {
        let fixture = Fixture::new();
        let credentials = fixture.credentials();
        for index in 0..12 {
            credentials
                .signup(account(&format!("student{index:02}@school.test")))
                .await
                .unwrap();
        }
        let mut teacher = account("teacher@school.test");
        teacher.role = Role::Teacher;
        credentials.signup(teacher).await.unwrap();

        let found = credentials.search_students("SCHOOL.test").await.unwrap();

        assert_eq!(found.len(), SEARCH_LIMIT);
        assert!(found.iter().all(|profile| profile.role == Role::Student));
        assert!(credentials.search_students("   ").await.unwrap().is_empty());
    }
}
