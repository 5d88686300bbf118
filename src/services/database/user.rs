use async_trait::async_trait;
use chrono::{DateTime, Utc};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use surrealdb::sql::{Datetime, Thing};

use super::{
    constraint,
    surreal::{conflict_or, from_datetime, record_key, to_datetime},
    DatabaseError, SurrealStore,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[display("student")]
    Student,
    #[display("teacher")]
    Teacher,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthProvider {
    Password,
    Google,
}

/// Stored account. Deliberately not `Serialize`: callers only ever see [`UserProfile`].
#[derive(Debug, Clone)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password_hash: Option<String>,
    pub role: Role,
    pub class_subject: Option<String>,
    pub google_id: Option<String>,
    pub profile_picture: Option<String>,
    pub auth_provider: AuthProvider,
    pub is_active: bool,
    pub profile_complete: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserProfile {
    pub id: String,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub class_subject: Option<String>,
    pub profile_picture: Option<String>,
    pub auth_provider: AuthProvider,
    pub is_active: bool,
    pub profile_complete: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        UserProfile {
            id: user.id.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            role: user.role,
            class_subject: user.class_subject.clone(),
            profile_picture: user.profile_picture.clone(),
            auth_provider: user.auth_provider,
            is_active: user.is_active,
            profile_complete: user.profile_complete,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Partial update; `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub username: Option<String>,
    pub role: Option<Role>,
    pub class_subject: Option<String>,
    pub google_id: Option<String>,
    pub profile_picture: Option<String>,
    pub is_active: Option<bool>,
    pub profile_complete: Option<bool>,
}

impl UserPatch {
    pub fn apply(self, user: &mut User, now: DateTime<Utc>) {
        if let Some(username) = self.username {
            user.username = username;
        }
        if let Some(role) = self.role {
            user.role = role;
        }
        if let Some(class_subject) = self.class_subject {
            user.class_subject = Some(class_subject);
        }
        if let Some(google_id) = self.google_id {
            user.google_id = Some(google_id);
        }
        if let Some(profile_picture) = self.profile_picture {
            user.profile_picture = Some(profile_picture);
        }
        if let Some(is_active) = self.is_active {
            user.is_active = is_active;
        }
        if let Some(profile_complete) = self.profile_complete {
            user.profile_complete = profile_complete;
        }
        user.updated_at = now;
    }
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with `Conflict(USER_EMAIL)` when the email is taken.
    async fn insert_user(&self, user: User) -> Result<(), DatabaseError>;

    async fn user_by_id(&self, user_id: &str) -> Result<Option<User>, DatabaseError>;

    async fn user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError>;

    async fn update_user(
        &self,
        user_id: &str,
        patch: UserPatch,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, DatabaseError>;

    async fn search_students(
        &self,
        email_fragment: &str,
        limit: usize,
    ) -> Result<Vec<User>, DatabaseError>;

    async fn users_by_role(&self, role: Role) -> Result<Vec<User>, DatabaseError>;
}

#[derive(Serialize)]
struct UserContent {
    username: String,
    email: String,
    password_hash: Option<String>,
    role: Role,
    class_subject: Option<String>,
    google_id: Option<String>,
    profile_picture: Option<String>,
    auth_provider: AuthProvider,
    is_active: bool,
    profile_complete: bool,
    created_at: Datetime,
    updated_at: Datetime,
}

#[derive(Serialize)]
struct UserMerge {
    #[serde(skip_serializing_if = "Option::is_none")]
    username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    class_subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    google_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    profile_picture: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    is_active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    profile_complete: Option<bool>,
    updated_at: Datetime,
}

#[derive(Deserialize)]
struct UserRow {
    id: Thing,
    username: String,
    email: String,
    password_hash: Option<String>,
    role: Role,
    class_subject: Option<String>,
    google_id: Option<String>,
    profile_picture: Option<String>,
    auth_provider: AuthProvider,
    is_active: bool,
    profile_complete: bool,
    created_at: Datetime,
    updated_at: Datetime,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: record_key(&row.id),
            username: row.username,
            email: row.email,
            password_hash: row.password_hash,
            role: row.role,
            class_subject: row.class_subject,
            google_id: row.google_id,
            profile_picture: row.profile_picture,
            auth_provider: row.auth_provider,
            is_active: row.is_active,
            profile_complete: row.profile_complete,
            created_at: from_datetime(row.created_at),
            updated_at: from_datetime(row.updated_at),
        }
    }
}

#[async_trait]
impl UserStore for SurrealStore {
    async fn insert_user(&self, user: User) -> Result<(), DatabaseError> {
        let query = r#"
            CREATE type::thing("user", $id) CONTENT $content
        "#;

        let content = UserContent {
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            role: user.role,
            class_subject: user.class_subject,
            google_id: user.google_id,
            profile_picture: user.profile_picture,
            auth_provider: user.auth_provider,
            is_active: user.is_active,
            profile_complete: user.profile_complete,
            created_at: to_datetime(user.created_at),
            updated_at: to_datetime(user.updated_at),
        };

        self.db
            .query(query)
            .bind(("id", user.id))
            .bind(("content", content))
            .await?
            .check()
            .map_err(|e| conflict_or(e, constraint::USER_EMAIL))?;

        Ok(())
    }

    async fn user_by_id(&self, user_id: &str) -> Result<Option<User>, DatabaseError> {
        let query = r#"
            SELECT * FROM type::thing("user", $id)
        "#;

        let mut response = self.db.query(query).bind(("id", user_id.to_string())).await?;
        let rows: Vec<UserRow> = response.take(0)?;

        Ok(rows.into_iter().next().map(User::from))
    }

    async fn user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        let query = r#"
            SELECT * FROM user
            WHERE email = $email
            LIMIT 1
        "#;

        let mut response = self.db.query(query).bind(("email", email.to_string())).await?;
        let rows: Vec<UserRow> = response.take(0)?;

        Ok(rows.into_iter().next().map(User::from))
    }

    async fn update_user(
        &self,
        user_id: &str,
        patch: UserPatch,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, DatabaseError> {
        let query = r#"
            UPDATE type::thing("user", $id) MERGE $merge RETURN AFTER
        "#;

        let merge = UserMerge {
            username: patch.username,
            role: patch.role,
            class_subject: patch.class_subject,
            google_id: patch.google_id,
            profile_picture: patch.profile_picture,
            is_active: patch.is_active,
            profile_complete: patch.profile_complete,
            updated_at: to_datetime(now),
        };

        let mut response = self
            .db
            .query(query)
            .bind(("id", user_id.to_string()))
            .bind(("merge", merge))
            .await?;
        let rows: Vec<UserRow> = response.take(0)?;

        Ok(rows.into_iter().next().map(User::from))
    }

    async fn search_students(
        &self,
        email_fragment: &str,
        limit: usize,
    ) -> Result<Vec<User>, DatabaseError> {
        let query = r#"
            SELECT * FROM user
            WHERE role = "student" AND string::contains(email, $fragment)
            ORDER BY email
            LIMIT $limit
        "#;

        let mut response = self
            .db
            .query(query)
            .bind(("fragment", email_fragment.to_lowercase()))
            .bind(("limit", limit as i64))
            .await?;
        let rows: Vec<UserRow> = response.take(0)?;

        Ok(rows.into_iter().map(User::from).collect())
    }

    async fn users_by_role(&self, role: Role) -> Result<Vec<User>, DatabaseError> {
        let query = r#"
            SELECT * FROM user
            WHERE role = $role AND is_active = true
            ORDER BY created_at
        "#;

        let mut response = self.db.query(query).bind(("role", role)).await?;
        let rows: Vec<UserRow> = response.take(0)?;

        Ok(rows.into_iter().map(User::from).collect())
    }
}
