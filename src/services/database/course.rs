use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use surrealdb::sql::{Datetime, Thing};
use validator::Validate;

use crate::utils::validation::validate_not_blank;

use super::{
    surreal::{from_datetime, record_key, to_datetime},
    DatabaseError, SurrealStore,
};

/// Teacher-editable course fields. Accepts both snake_case and the camelCase keys older
/// clients send.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct CourseDetails {
    #[validate(
        length(min = 1, max = 120, message = "Course name must be between 1 and 120 characters"),
        custom(function = "validate_not_blank")
    )]
    pub name: String,
    #[serde(default, alias = "teacherName")]
    pub teacher_name: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub schedule: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default, alias = "contactInfo")]
    pub contact_info: Option<String>,
    #[serde(default)]
    pub fees: Option<String>,
    #[serde(default)]
    #[validate(length(max = 2000, message = "Description is too long"))]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Course {
    pub id: String,
    pub owner_id: String,
    #[serde(flatten)]
    pub details: CourseDetails,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[async_trait]
pub trait CourseStore: Send + Sync {
    async fn insert_course(&self, course: Course) -> Result<(), DatabaseError>;

    async fn course_by_id(&self, course_id: &str) -> Result<Option<Course>, DatabaseError>;

    /// Newest first.
    async fn courses_by_owner(&self, owner_id: &str) -> Result<Vec<Course>, DatabaseError>;

    /// `None` when no course with this id belongs to `owner_id`.
    async fn update_course(
        &self,
        course_id: &str,
        owner_id: &str,
        details: CourseDetails,
        now: DateTime<Utc>,
    ) -> Result<Option<Course>, DatabaseError>;

    async fn delete_course(&self, course_id: &str, owner_id: &str) -> Result<bool, DatabaseError>;
}

#[derive(Serialize)]
struct CourseContent {
    owner_id: String,
    name: String,
    teacher_name: Option<String>,
    subject: Option<String>,
    schedule: Option<String>,
    location: Option<String>,
    contact_info: Option<String>,
    fees: Option<String>,
    description: Option<String>,
    created_at: Datetime,
    updated_at: Datetime,
}

#[derive(Serialize)]
struct CourseMerge {
    name: String,
    teacher_name: Option<String>,
    subject: Option<String>,
    schedule: Option<String>,
    location: Option<String>,
    contact_info: Option<String>,
    fees: Option<String>,
    description: Option<String>,
    updated_at: Datetime,
}

#[derive(Deserialize)]
struct CourseRow {
    id: Thing,
    owner_id: String,
    name: String,
    teacher_name: Option<String>,
    subject: Option<String>,
    schedule: Option<String>,
    location: Option<String>,
    contact_info: Option<String>,
    fees: Option<String>,
    description: Option<String>,
    created_at: Datetime,
    updated_at: Datetime,
}

impl From<CourseRow> for Course {
    fn from(row: CourseRow) -> Self {
        Course {
            id: record_key(&row.id),
            owner_id: row.owner_id,
            details: CourseDetails {
                name: row.name,
                teacher_name: row.teacher_name,
                subject: row.subject,
                schedule: row.schedule,
                location: row.location,
                contact_info: row.contact_info,
                fees: row.fees,
                description: row.description,
            },
            created_at: from_datetime(row.created_at),
            updated_at: from_datetime(row.updated_at),
        }
    }
}

#[async_trait]
impl CourseStore for SurrealStore {
    async fn insert_course(&self, course: Course) -> Result<(), DatabaseError> {
        let query = r#"
            CREATE type::thing("course", $id) CONTENT $content
        "#;

        let details = course.details;
        let content = CourseContent {
            owner_id: course.owner_id,
            name: details.name,
            teacher_name: details.teacher_name,
            subject: details.subject,
            schedule: details.schedule,
            location: details.location,
            contact_info: details.contact_info,
            fees: details.fees,
            description: details.description,
            created_at: to_datetime(course.created_at),
            updated_at: to_datetime(course.updated_at),
        };

        self.db
            .query(query)
            .bind(("id", course.id))
            .bind(("content", content))
            .await?
            .check()?;

        Ok(())
    }

    async fn course_by_id(&self, course_id: &str) -> Result<Option<Course>, DatabaseError> {
        let query = r#"
            SELECT * FROM type::thing("course", $id)
        "#;

        let mut response = self
            .db
            .query(query)
            .bind(("id", course_id.to_string()))
            .await?;
        let rows: Vec<CourseRow> = response.take(0)?;

        Ok(rows.into_iter().next().map(Course::from))
    }

    async fn courses_by_owner(&self, owner_id: &str) -> Result<Vec<Course>, DatabaseError> {
        let query = r#"
            SELECT * FROM course
            WHERE owner_id = $owner_id
            ORDER BY created_at DESC
        "#;

        let mut response = self
            .db
            .query(query)
            .bind(("owner_id", owner_id.to_string()))
            .await?;
        let rows: Vec<CourseRow> = response.take(0)?;

        Ok(rows.into_iter().map(Course::from).collect())
    }

    async fn update_course(
        &self,
        course_id: &str,
        owner_id: &str,
        details: CourseDetails,
        now: DateTime<Utc>,
    ) -> Result<Option<Course>, DatabaseError> {
        let query = r#"
            UPDATE type::thing("course", $id) MERGE $merge
            WHERE owner_id = $owner_id
            RETURN AFTER
        "#;

        let merge = CourseMerge {
            name: details.name,
            teacher_name: details.teacher_name,
            subject: details.subject,
            schedule: details.schedule,
            location: details.location,
            contact_info: details.contact_info,
            fees: details.fees,
            description: details.description,
            updated_at: to_datetime(now),
        };

        let mut response = self
            .db
            .query(query)
            .bind(("id", course_id.to_string()))
            .bind(("owner_id", owner_id.to_string()))
            .bind(("merge", merge))
            .await?;
        let rows: Vec<CourseRow> = response.take(0)?;

        Ok(rows.into_iter().next().map(Course::from))
    }

    async fn delete_course(&self, course_id: &str, owner_id: &str) -> Result<bool, DatabaseError> {
        let query = r#"
            DELETE type::thing("course", $id)
            WHERE owner_id = $owner_id
            RETURN BEFORE
        "#;

        let mut response = self
            .db
            .query(query)
            .bind(("id", course_id.to_string()))
            .bind(("owner_id", owner_id.to_string()))
            .await?;
        let rows: Vec<CourseRow> = response.take(0)?;

        Ok(!rows.is_empty())
    }
}
