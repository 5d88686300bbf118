use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use surrealdb::sql::{Datetime, Thing};
use validator::{Validate, ValidationError};

use crate::utils::validation::{normalize_email, validate_not_blank, validate_phone_number};

use super::{
    constraint,
    surreal::{conflict_or, from_datetime, record_key, to_datetime},
    DatabaseError, SurrealStore,
};

const REGISTERED_RESULTS: &str = "exam_results";
const GUEST_SUBMISSIONS: &str = "guest_submissions";

fn validate_guest_contact(guest: &GuestInfo) -> Result<(), ValidationError> {
    match &guest.phone {
        Some(phone) => validate_phone_number(phone),
        None => Ok(()),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_guest_contact"))]
pub struct GuestInfo {
    #[validate(
        length(min = 1, max = 100, message = "Name must be between 1 and 100 characters"),
        custom(function = "validate_not_blank")
    )]
    pub name: String,
    #[serde(default)]
    #[validate(email(message = "The email address is invalid"))]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionType {
    Registered,
    Guest,
}

impl SubmissionType {
    fn table(self) -> &'static str {
        match self {
            SubmissionType::Registered => REGISTERED_RESULTS,
            SubmissionType::Guest => GUEST_SUBMISSIONS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "submission_type", rename_all = "lowercase")]
pub enum Submitter {
    Registered { student_id: String },
    Guest(GuestInfo),
}

impl Submitter {
    pub fn kind(&self) -> SubmissionType {
        match self {
            Submitter::Registered { .. } => SubmissionType::Registered,
            Submitter::Guest(_) => SubmissionType::Guest,
        }
    }

    pub fn student_id(&self) -> Option<&str> {
        match self {
            Submitter::Registered { student_id } => Some(student_id),
            Submitter::Guest(_) => None,
        }
    }

    /// Guest contact details in their stored form: lowercased email, trimmed phone and name.
    pub fn normalized(self) -> Self {
        match self {
            Submitter::Guest(guest) => Submitter::Guest(GuestInfo {
                name: guest.name.trim().to_string(),
                email: guest.email.as_deref().map(normalize_email),
                phone: guest.phone.as_deref().map(|phone| phone.trim().to_string()),
            }),
            registered => registered,
        }
    }

    /// Key of the at-most-once constraint: the student id, or the normalized
    /// `email|phone|name` of a guest.
    pub fn identity_key(&self) -> String {
        match self {
            Submitter::Registered { student_id } => student_id.clone(),
            Submitter::Guest(guest) => format!(
                "{}|{}|{}",
                guest.email.as_deref().map(normalize_email).unwrap_or_default(),
                guest.phone.as_deref().map(str::trim).unwrap_or_default(),
                guest.name.trim().to_lowercase(),
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Submission {
    pub id: String,
    pub exam_id: String,
    #[serde(flatten)]
    pub submitter: Submitter,
    pub course_id: Option<String>,
    pub score: f64,
    pub total_marks: f64,
    pub percentage: f64,
    pub answers: serde_json::Value,
    pub reviewed: bool,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub submitted_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Outcome of a teacher review, applied over a stored submission.
#[derive(Debug, Clone, PartialEq)]
pub struct Review {
    pub score: f64,
    pub percentage: f64,
    pub answers: serde_json::Value,
    pub reviewed_at: DateTime<Utc>,
}

impl Review {
    pub fn apply(self, submission: &mut Submission) {
        submission.score = self.score;
        submission.percentage = self.percentage;
        submission.answers = self.answers;
        submission.reviewed = true;
        submission.reviewed_at = Some(self.reviewed_at);
    }
}

#[async_trait]
pub trait SubmissionStore: Send + Sync {
    /// Fails with `Conflict(SUBMISSION_IDENTITY)` when the identity already submitted.
    async fn insert_submission(&self, submission: Submission) -> Result<(), DatabaseError>;

    /// Registered rows for an exam, in insertion order.
    async fn registered_submissions(&self, exam_id: &str) -> Result<Vec<Submission>, DatabaseError>;

    /// Guest rows for an exam, in insertion order.
    async fn guest_submissions(&self, exam_id: &str) -> Result<Vec<Submission>, DatabaseError>;

    async fn student_submissions(
        &self,
        course_id: &str,
        student_id: &str,
    ) -> Result<Vec<Submission>, DatabaseError>;

    /// Registered rows must also match `student_id`. Returns whether a row was updated.
    async fn apply_review(
        &self,
        exam_id: &str,
        submission_id: &str,
        kind: SubmissionType,
        student_id: Option<&str>,
        review: Review,
    ) -> Result<bool, DatabaseError>;

    async fn guest_submission_count(&self, exam_id: &str) -> Result<usize, DatabaseError>;
}

#[derive(Serialize)]
struct SubmissionContent {
    exam_id: String,
    submission_type: SubmissionType,
    identity_key: String,
    student_id: Option<String>,
    guest_name: Option<String>,
    guest_email: Option<String>,
    guest_phone: Option<String>,
    course_id: Option<String>,
    score: f64,
    total_marks: f64,
    percentage: f64,
    answers: serde_json::Value,
    reviewed: bool,
    reviewed_at: Option<Datetime>,
    submitted_at: Datetime,
    created_at: Datetime,
}

#[derive(Serialize)]
struct ReviewMerge {
    score: f64,
    percentage: f64,
    answers: serde_json::Value,
    reviewed: bool,
    reviewed_at: Datetime,
}

#[derive(Deserialize)]
struct SubmissionRow {
    id: Thing,
    exam_id: String,
    submission_type: SubmissionType,
    student_id: Option<String>,
    guest_name: Option<String>,
    guest_email: Option<String>,
    guest_phone: Option<String>,
    course_id: Option<String>,
    score: f64,
    total_marks: f64,
    percentage: f64,
    #[serde(default)]
    answers: serde_json::Value,
    reviewed: bool,
    reviewed_at: Option<Datetime>,
    submitted_at: Datetime,
    created_at: Datetime,
}

impl From<SubmissionRow> for Submission {
    fn from(row: SubmissionRow) -> Self {
        let submitter = match row.submission_type {
            SubmissionType::Registered => Submitter::Registered {
                student_id: row.student_id.unwrap_or_default(),
            },
            SubmissionType::Guest => Submitter::Guest(GuestInfo {
                name: row.guest_name.unwrap_or_default(),
                email: row.guest_email,
                phone: row.guest_phone,
            }),
        };

        Submission {
            id: record_key(&row.id),
            exam_id: row.exam_id,
            submitter,
            course_id: row.course_id,
            score: row.score,
            total_marks: row.total_marks,
            percentage: row.percentage,
            answers: row.answers,
            reviewed: row.reviewed,
            reviewed_at: row.reviewed_at.map(from_datetime),
            submitted_at: from_datetime(row.submitted_at),
            created_at: from_datetime(row.created_at),
        }
    }
}

impl SurrealStore {
    async fn submissions_in(
        &self,
        table: &'static str,
        exam_id: &str,
    ) -> Result<Vec<Submission>, DatabaseError> {
        let query = r#"
            SELECT * FROM type::table($table)
            WHERE exam_id = $exam_id
            ORDER BY created_at
        "#;

        let mut response = self
            .db
            .query(query)
            .bind(("table", table))
            .bind(("exam_id", exam_id.to_string()))
            .await?;
        let rows: Vec<SubmissionRow> = response.take(0)?;

        Ok(rows.into_iter().map(Submission::from).collect())
    }
}

#[async_trait]
impl SubmissionStore for SurrealStore {
    async fn insert_submission(&self, submission: Submission) -> Result<(), DatabaseError> {
        let query = r#"
            CREATE type::thing($table, $id) CONTENT $content
        "#;

        let kind = submission.submitter.kind();
        let identity_key = submission.submitter.identity_key();
        let (student_id, guest) = match submission.submitter {
            Submitter::Registered { student_id } => (Some(student_id), None),
            Submitter::Guest(guest) => (None, Some(guest)),
        };
        let (guest_name, guest_email, guest_phone) = match guest {
            Some(guest) => (Some(guest.name), guest.email, guest.phone),
            None => (None, None, None),
        };

        let content = SubmissionContent {
            exam_id: submission.exam_id,
            submission_type: kind,
            identity_key,
            student_id,
            guest_name,
            guest_email,
            guest_phone,
            course_id: submission.course_id,
            score: submission.score,
            total_marks: submission.total_marks,
            percentage: submission.percentage,
            answers: submission.answers,
            reviewed: submission.reviewed,
            reviewed_at: submission.reviewed_at.map(to_datetime),
            submitted_at: to_datetime(submission.submitted_at),
            created_at: to_datetime(submission.created_at),
        };

        self.db
            .query(query)
            .bind(("table", kind.table()))
            .bind(("id", submission.id))
            .bind(("content", content))
            .await?
            .check()
            .map_err(|e| conflict_or(e, constraint::SUBMISSION_IDENTITY))?;

        Ok(())
    }

    async fn registered_submissions(&self, exam_id: &str) -> Result<Vec<Submission>, DatabaseError> {
        self.submissions_in(REGISTERED_RESULTS, exam_id).await
    }

    async fn guest_submissions(&self, exam_id: &str) -> Result<Vec<Submission>, DatabaseError> {
        self.submissions_in(GUEST_SUBMISSIONS, exam_id).await
    }

    async fn student_submissions(
        &self,
        course_id: &str,
        student_id: &str,
    ) -> Result<Vec<Submission>, DatabaseError> {
        let query = r#"
            SELECT * FROM exam_results
            WHERE course_id = $course_id AND student_id = $student_id
            ORDER BY submitted_at DESC
        "#;

        let mut response = self
            .db
            .query(query)
            .bind(("course_id", course_id.to_string()))
            .bind(("student_id", student_id.to_string()))
            .await?;
        let rows: Vec<SubmissionRow> = response.take(0)?;

        Ok(rows.into_iter().map(Submission::from).collect())
    }

    async fn apply_review(
        &self,
        exam_id: &str,
        submission_id: &str,
        kind: SubmissionType,
        student_id: Option<&str>,
        review: Review,
    ) -> Result<bool, DatabaseError> {
        let query = match kind {
            SubmissionType::Registered => {
                r#"
                UPDATE type::thing($table, $id) MERGE $merge
                WHERE exam_id = $exam_id AND student_id = $student_id
                RETURN AFTER
            "#
            }
            SubmissionType::Guest => {
                r#"
                UPDATE type::thing($table, $id) MERGE $merge
                WHERE exam_id = $exam_id
                RETURN AFTER
            "#
            }
        };

        let merge = ReviewMerge {
            score: review.score,
            percentage: review.percentage,
            answers: review.answers,
            reviewed: true,
            reviewed_at: to_datetime(review.reviewed_at),
        };

        let mut response = self
            .db
            .query(query)
            .bind(("table", kind.table()))
            .bind(("id", submission_id.to_string()))
            .bind(("exam_id", exam_id.to_string()))
            .bind(("student_id", student_id.map(str::to_string)))
            .bind(("merge", merge))
            .await?;
        let rows: Vec<SubmissionRow> = response.take(0)?;

        Ok(!rows.is_empty())
    }

    async fn guest_submission_count(&self, exam_id: &str) -> Result<usize, DatabaseError> {
        Ok(self.guest_submissions(exam_id).await?.len())
    }
}
