use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use surrealdb::sql::{Datetime, Thing};

use super::{
    constraint,
    surreal::{conflict_or, from_datetime, record_key, to_datetime},
    DatabaseError, SurrealStore,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Enrollment {
    pub id: String,
    pub course_id: String,
    pub student_id: String,
    pub teacher_id: String,
    pub enrolled_at: DateTime<Utc>,
}

#[async_trait]
pub trait EnrollmentStore: Send + Sync {
    /// Fails with `Conflict(ENROLLMENT_PAIR)` when the student is already enrolled.
    async fn insert_enrollment(&self, enrollment: Enrollment) -> Result<(), DatabaseError>;

    /// Deletes the row matching all three ids. Returns whether one existed.
    async fn delete_enrollment(
        &self,
        course_id: &str,
        student_id: &str,
        teacher_id: &str,
    ) -> Result<bool, DatabaseError>;

    async fn enrollments_for_course(
        &self,
        course_id: &str,
        teacher_id: &str,
    ) -> Result<Vec<Enrollment>, DatabaseError>;

    async fn enrollments_for_student(
        &self,
        student_id: &str,
    ) -> Result<Vec<Enrollment>, DatabaseError>;

    async fn is_enrolled(&self, course_id: &str, student_id: &str) -> Result<bool, DatabaseError>;
}

#[derive(Serialize)]
struct EnrollmentContent {
    course_id: String,
    student_id: String,
    teacher_id: String,
    enrolled_at: Datetime,
}

#[derive(Deserialize)]
struct EnrollmentRow {
    id: Thing,
    course_id: String,
    student_id: String,
    teacher_id: String,
    enrolled_at: Datetime,
}

impl From<EnrollmentRow> for Enrollment {
    fn from(row: EnrollmentRow) -> Self {
        Enrollment {
            id: record_key(&row.id),
            course_id: row.course_id,
            student_id: row.student_id,
            teacher_id: row.teacher_id,
            enrolled_at: from_datetime(row.enrolled_at),
        }
    }
}

#[async_trait]
impl EnrollmentStore for SurrealStore {
    async fn insert_enrollment(&self, enrollment: Enrollment) -> Result<(), DatabaseError> {
        let query = r#"
            CREATE type::thing("enrollment", $id) CONTENT $content
        "#;

        let content = EnrollmentContent {
            course_id: enrollment.course_id,
            student_id: enrollment.student_id,
            teacher_id: enrollment.teacher_id,
            enrolled_at: to_datetime(enrollment.enrolled_at),
        };

        self.db
            .query(query)
            .bind(("id", enrollment.id))
            .bind(("content", content))
            .await?
            .check()
            .map_err(|e| conflict_or(e, constraint::ENROLLMENT_PAIR))?;

        Ok(())
    }

    async fn delete_enrollment(
        &self,
        course_id: &str,
        student_id: &str,
        teacher_id: &str,
    ) -> Result<bool, DatabaseError> {
        let query = r#"
            DELETE enrollment
            WHERE course_id = $course_id AND student_id = $student_id AND teacher_id = $teacher_id
            RETURN BEFORE
        "#;

        let mut response = self
            .db
            .query(query)
            .bind(("course_id", course_id.to_string()))
            .bind(("student_id", student_id.to_string()))
            .bind(("teacher_id", teacher_id.to_string()))
            .await?;
        let rows: Vec<EnrollmentRow> = response.take(0)?;

        Ok(!rows.is_empty())
    }

    async fn enrollments_for_course(
        &self,
        course_id: &str,
        teacher_id: &str,
    ) -> Result<Vec<Enrollment>, DatabaseError> {
        let query = r#"
            SELECT * FROM enrollment
            WHERE course_id = $course_id AND teacher_id = $teacher_id
            ORDER BY enrolled_at
        "#;

        let mut response = self
            .db
            .query(query)
            .bind(("course_id", course_id.to_string()))
            .bind(("teacher_id", teacher_id.to_string()))
            .await?;
        let rows: Vec<EnrollmentRow> = response.take(0)?;

        Ok(rows.into_iter().map(Enrollment::from).collect())
    }

    async fn enrollments_for_student(
        &self,
        student_id: &str,
    ) -> Result<Vec<Enrollment>, DatabaseError> {
        let query = r#"
            SELECT * FROM enrollment
            WHERE student_id = $student_id
            ORDER BY enrolled_at
        "#;

        let mut response = self
            .db
            .query(query)
            .bind(("student_id", student_id.to_string()))
            .await?;
        let rows: Vec<EnrollmentRow> = response.take(0)?;

        Ok(rows.into_iter().map(Enrollment::from).collect())
    }

    async fn is_enrolled(&self, course_id: &str, student_id: &str) -> Result<bool, DatabaseError> {
        let query = r#"
            SELECT * FROM enrollment
            WHERE course_id = $course_id AND student_id = $student_id
            LIMIT 1
        "#;

        let mut response = self
            .db
            .query(query)
            .bind(("course_id", course_id.to_string()))
            .bind(("student_id", student_id.to_string()))
            .await?;
        let rows: Vec<EnrollmentRow> = response.take(0)?;

        Ok(!rows.is_empty())
    }
}
