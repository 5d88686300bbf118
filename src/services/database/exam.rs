use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{ser::Serializer, Deserialize, Serialize};
use surrealdb::sql::{Datetime, Thing};
use validator::{Validate, ValidationError};

use crate::utils::validation::validate_not_blank;

use super::{
    surreal::{from_datetime, record_key, to_datetime},
    DatabaseError, SurrealStore,
};

const COURSE_EXAMS: &str = "exams";
const PUBLIC_EXAMS: &str = "public_exams";

/// Where an exam lives. Course exams are visible to enrolled students, public exams to
/// anyone holding the link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ExamScope {
    Course { course_id: String },
    Public { subject: Option<String> },
}

impl ExamScope {
    pub fn is_public(&self) -> bool {
        matches!(self, ExamScope::Public { .. })
    }

    pub fn course_id(&self) -> Option<&str> {
        match self {
            ExamScope::Course { course_id } => Some(course_id),
            ExamScope::Public { .. } => None,
        }
    }

    fn table(&self) -> &'static str {
        match self {
            ExamScope::Course { .. } => COURSE_EXAMS,
            ExamScope::Public { .. } => PUBLIC_EXAMS,
        }
    }
}

/// Half-open availability window `[start_date, end_date)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExamWindow {
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

impl ExamWindow {
    pub fn contains(&self, now: DateTime<Utc>) -> bool {
        self.start_date <= now && now < self.end_date
    }
}

fn validate_window(definition: &ExamDefinition) -> Result<(), ValidationError> {
    if definition.start_date >= definition.end_date {
        let mut error = ValidationError::new("invalid_window");
        error.message = Some("The exam must start before it ends".into());
        return Err(error);
    }

    Ok(())
}

/// The teacher-authored part of an exam.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_window"))]
pub struct ExamDefinition {
    #[validate(
        length(min = 1, max = 200, message = "Title must be between 1 and 200 characters"),
        custom(function = "validate_not_blank")
    )]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[validate(range(min = 1, message = "Duration must be at least one minute"))]
    pub duration_minutes: u32,
    #[validate(range(min = 0.0, message = "Total marks must not be negative"))]
    pub total_marks: f64,
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(default)]
    pub questions: serde_json::Value,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

impl ExamDefinition {
    pub fn window(&self) -> ExamWindow {
        ExamWindow {
            start_date: self.start_date,
            end_date: self.end_date,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Exam {
    pub id: String,
    pub owner_id: String,
    pub scope: ExamScope,
    pub definition: ExamDefinition,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize)]
struct ExamJson<'a> {
    id: &'a str,
    owner_id: &'a str,
    is_public: bool,
    course_id: Option<&'a str>,
    subject: Option<&'a str>,
    title: &'a str,
    description: &'a str,
    duration_minutes: u32,
    total_marks: f64,
    instructions: Option<&'a str>,
    questions: &'a serde_json::Value,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Serialize for Exam {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let subject = match &self.scope {
            ExamScope::Public { subject } => subject.as_deref(),
            ExamScope::Course { .. } => None,
        };

        ExamJson {
            id: &self.id,
            owner_id: &self.owner_id,
            is_public: self.scope.is_public(),
            course_id: self.scope.course_id(),
            subject,
            title: &self.definition.title,
            description: &self.definition.description,
            duration_minutes: self.definition.duration_minutes,
            total_marks: self.definition.total_marks,
            instructions: self.definition.instructions.as_deref(),
            questions: &self.definition.questions,
            start_date: self.definition.start_date,
            end_date: self.definition.end_date,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
        .serialize(serializer)
    }
}

#[async_trait]
pub trait ExamStore: Send + Sync {
    async fn insert_exam(&self, exam: Exam) -> Result<(), DatabaseError>;

    /// Looks in course exams first, then public exams.
    async fn exam_by_id(&self, exam_id: &str) -> Result<Option<Exam>, DatabaseError>;

    async fn public_exam_by_id(&self, exam_id: &str) -> Result<Option<Exam>, DatabaseError>;

    /// Newest first.
    async fn exams_for_course(&self, course_id: &str) -> Result<Vec<Exam>, DatabaseError>;

    /// Both kinds, newest first.
    async fn exams_by_owner(&self, owner_id: &str) -> Result<Vec<Exam>, DatabaseError>;

    async fn delete_exam(&self, exam_id: &str, owner_id: &str) -> Result<bool, DatabaseError>;
}

#[derive(Serialize)]
struct ExamContent {
    owner_id: String,
    course_id: Option<String>,
    subject: Option<String>,
    title: String,
    description: String,
    duration_minutes: u32,
    total_marks: f64,
    instructions: Option<String>,
    questions: serde_json::Value,
    start_date: Datetime,
    end_date: Datetime,
    created_at: Datetime,
    updated_at: Datetime,
}

#[derive(Deserialize)]
struct ExamRow {
    id: Thing,
    owner_id: String,
    course_id: Option<String>,
    subject: Option<String>,
    title: String,
    description: String,
    duration_minutes: u32,
    total_marks: f64,
    instructions: Option<String>,
    #[serde(default)]
    questions: serde_json::Value,
    start_date: Datetime,
    end_date: Datetime,
    created_at: Datetime,
    updated_at: Datetime,
}

impl From<ExamRow> for Exam {
    fn from(row: ExamRow) -> Self {
        let scope = match (row.id.tb.as_str(), row.course_id) {
            (COURSE_EXAMS, Some(course_id)) => ExamScope::Course { course_id },
            _ => ExamScope::Public {
                subject: row.subject,
            },
        };

        Exam {
            id: record_key(&row.id),
            owner_id: row.owner_id,
            scope,
            definition: ExamDefinition {
                title: row.title,
                description: row.description,
                duration_minutes: row.duration_minutes,
                total_marks: row.total_marks,
                instructions: row.instructions,
                questions: row.questions,
                start_date: from_datetime(row.start_date),
                end_date: from_datetime(row.end_date),
            },
            created_at: from_datetime(row.created_at),
            updated_at: from_datetime(row.updated_at),
        }
    }
}

impl SurrealStore {
    async fn exam_in(&self, table: &'static str, exam_id: &str) -> Result<Option<Exam>, DatabaseError> {
        let query = r#"
            SELECT * FROM type::thing($table, $id)
        "#;

        let mut response = self
            .db
            .query(query)
            .bind(("table", table))
            .bind(("id", exam_id.to_string()))
            .await?;
        let rows: Vec<ExamRow> = response.take(0)?;

        Ok(rows.into_iter().next().map(Exam::from))
    }
}

#[async_trait]
impl ExamStore for SurrealStore {
    async fn insert_exam(&self, exam: Exam) -> Result<(), DatabaseError> {
        let query = r#"
            CREATE type::thing($table, $id) CONTENT $content
        "#;

        let table = exam.scope.table();
        let (course_id, subject) = match exam.scope {
            ExamScope::Course { course_id } => (Some(course_id), None),
            ExamScope::Public { subject } => (None, subject),
        };
        let definition = exam.definition;

        let content = ExamContent {
            owner_id: exam.owner_id,
            course_id,
            subject,
            title: definition.title,
            description: definition.description,
            duration_minutes: definition.duration_minutes,
            total_marks: definition.total_marks,
            instructions: definition.instructions,
            questions: definition.questions,
            start_date: to_datetime(definition.start_date),
            end_date: to_datetime(definition.end_date),
            created_at: to_datetime(exam.created_at),
            updated_at: to_datetime(exam.updated_at),
        };

        self.db
            .query(query)
            .bind(("table", table))
            .bind(("id", exam.id))
            .bind(("content", content))
            .await?
            .check()?;

        Ok(())
    }

    async fn exam_by_id(&self, exam_id: &str) -> Result<Option<Exam>, DatabaseError> {
        match self.exam_in(COURSE_EXAMS, exam_id).await? {
            Some(exam) => Ok(Some(exam)),
            None => self.exam_in(PUBLIC_EXAMS, exam_id).await,
        }
    }

    async fn public_exam_by_id(&self, exam_id: &str) -> Result<Option<Exam>, DatabaseError> {
        self.exam_in(PUBLIC_EXAMS, exam_id).await
    }

    async fn exams_for_course(&self, course_id: &str) -> Result<Vec<Exam>, DatabaseError> {
        let query = r#"
            SELECT * FROM exams
            WHERE course_id = $course_id
            ORDER BY created_at DESC
        "#;

        let mut response = self
            .db
            .query(query)
            .bind(("course_id", course_id.to_string()))
            .await?;
        let rows: Vec<ExamRow> = response.take(0)?;

        Ok(rows.into_iter().map(Exam::from).collect())
    }

    async fn exams_by_owner(&self, owner_id: &str) -> Result<Vec<Exam>, DatabaseError> {
        let query = r#"
            SELECT * FROM exams WHERE owner_id = $owner_id;
            SELECT * FROM public_exams WHERE owner_id = $owner_id;
        "#;

        let mut response = self
            .db
            .query(query)
            .bind(("owner_id", owner_id.to_string()))
            .await?;
        let course_rows: Vec<ExamRow> = response.take(0)?;
        let public_rows: Vec<ExamRow> = response.take(1)?;

        let mut exams: Vec<Exam> = course_rows
            .into_iter()
            .chain(public_rows)
            .map(Exam::from)
            .collect();
        exams.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(exams)
    }

    async fn delete_exam(&self, exam_id: &str, owner_id: &str) -> Result<bool, DatabaseError> {
        let query = r#"
            DELETE type::thing($table, $id)
            WHERE owner_id = $owner_id
            RETURN BEFORE
        "#;

        for table in [COURSE_EXAMS, PUBLIC_EXAMS] {
            let mut response = self
                .db
                .query(query)
                .bind(("table", table))
                .bind(("id", exam_id.to_string()))
                .bind(("owner_id", owner_id.to_string()))
                .await?;
            let rows: Vec<ExamRow> = response.take(0)?;

            if !rows.is_empty() {
                return Ok(true);
            }
        }

        Ok(false)
    }
}
