use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{
    constraint, Course, CourseDetails, CourseStore, DatabaseError, Enrollment, EnrollmentStore,
    Exam, ExamScope, ExamStore, ResetToken, ResetTokenStore, Review, Role, Session, SessionStore,
    Submission, SubmissionStore, SubmissionType, User, UserPatch, UserStore,
};

#[derive(Default)]
struct Tables {
    users: HashMap<String, User>,
    sessions: HashMap<String, Session>,
    reset_tokens: HashMap<String, ResetToken>,
    courses: HashMap<String, Course>,
    enrollments: Vec<Enrollment>,
    exams: Vec<Exam>,
    submissions: Vec<Submission>,
}

/// In-process store with the same uniqueness guarantees as the SurrealDB schemas. Every
/// check-and-write happens under one write lock.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first<T>(items: &mut [T], created_at: impl Fn(&T) -> DateTime<Utc>) {
    items.sort_by(|a, b| created_at(b).cmp(&created_at(a)));
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, user: User) -> Result<(), DatabaseError> {
        let mut tables = self.tables.write().await;

        if tables.users.contains_key(&user.id) {
            return Err(DatabaseError::Conflict(constraint::RECORD_ID));
        }
        if tables.users.values().any(|existing| existing.email == user.email) {
            return Err(DatabaseError::Conflict(constraint::USER_EMAIL));
        }

        tables.users.insert(user.id.clone(), user);
        Ok(())
    }

    async fn user_by_id(&self, user_id: &str) -> Result<Option<User>, DatabaseError> {
        Ok(self.tables.read().await.users.get(user_id).cloned())
    }

    async fn user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        let tables = self.tables.read().await;

        Ok(tables.users.values().find(|user| user.email == email).cloned())
    }

    async fn update_user(
        &self,
        user_id: &str,
        patch: UserPatch,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, DatabaseError> {
        let mut tables = self.tables.write().await;

        Ok(tables.users.get_mut(user_id).map(|user| {
            patch.apply(user, now);
            user.clone()
        }))
    }

    async fn search_students(
        &self,
        email_fragment: &str,
        limit: usize,
    ) -> Result<Vec<User>, DatabaseError> {
        let fragment = email_fragment.to_lowercase();
        let tables = self.tables.read().await;

        let mut students: Vec<User> = tables
            .users
            .values()
            .filter(|user| user.role == Role::Student && user.email.contains(&fragment))
            .cloned()
            .collect();
        students.sort_by(|a, b| a.email.cmp(&b.email));
        students.truncate(limit);

        Ok(students)
    }

    async fn users_by_role(&self, role: Role) -> Result<Vec<User>, DatabaseError> {
        let tables = self.tables.read().await;

        let mut users: Vec<User> = tables
            .users
            .values()
            .filter(|user| user.role == role && user.is_active)
            .cloned()
            .collect();
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at));

        Ok(users)
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn insert_session(&self, session: Session) -> Result<(), DatabaseError> {
        let mut tables = self.tables.write().await;

        if tables.sessions.contains_key(&session.id) {
            return Err(DatabaseError::Conflict(constraint::SESSION_TOKEN));
        }

        tables.sessions.insert(session.id.clone(), session);
        Ok(())
    }

    async fn session_by_id(&self, session_id: &str) -> Result<Option<Session>, DatabaseError> {
        Ok(self.tables.read().await.sessions.get(session_id).cloned())
    }

    async fn delete_session(&self, session_id: &str) -> Result<bool, DatabaseError> {
        Ok(self
            .tables
            .write()
            .await
            .sessions
            .remove(session_id)
            .is_some())
    }

    async fn delete_user_sessions(&self, user_id: &str) -> Result<usize, DatabaseError> {
        let mut tables = self.tables.write().await;
        let before = tables.sessions.len();

        tables.sessions.retain(|_, session| session.user_id != user_id);

        Ok(before - tables.sessions.len())
    }

    async fn purge_expired_sessions(&self, now: DateTime<Utc>) -> Result<usize, DatabaseError> {
        let mut tables = self.tables.write().await;
        let before = tables.sessions.len();

        tables.sessions.retain(|_, session| session.expires_at > now);

        Ok(before - tables.sessions.len())
    }
}

#[async_trait]
impl ResetTokenStore for MemoryStore {
    async fn insert_reset_token(&self, token: ResetToken) -> Result<(), DatabaseError> {
        let mut tables = self.tables.write().await;

        if tables.reset_tokens.contains_key(&token.id) {
            return Err(DatabaseError::Conflict(constraint::RESET_TOKEN));
        }

        tables.reset_tokens.insert(token.id.clone(), token);
        Ok(())
    }

    async fn reset_token_by_id(&self, token_id: &str) -> Result<Option<ResetToken>, DatabaseError> {
        Ok(self.tables.read().await.reset_tokens.get(token_id).cloned())
    }

    async fn complete_password_reset(
        &self,
        token_id: &str,
        user_id: &str,
        password_hash: String,
        now: DateTime<Utc>,
    ) -> Result<bool, DatabaseError> {
        let mut tables = self.tables.write().await;

        let claimable = tables
            .reset_tokens
            .get(token_id)
            .is_some_and(|token| token.is_redeemable(now));
        if !claimable || !tables.users.contains_key(user_id) {
            return Ok(false);
        }

        if let Some(token) = tables.reset_tokens.get_mut(token_id) {
            token.used = true;
        }
        if let Some(user) = tables.users.get_mut(user_id) {
            user.password_hash = Some(password_hash);
            user.updated_at = now;
        }
        tables.sessions.retain(|_, session| session.user_id != user_id);

        Ok(true)
    }

    async fn purge_expired_reset_tokens(&self, now: DateTime<Utc>) -> Result<usize, DatabaseError> {
        let mut tables = self.tables.write().await;
        let before = tables.reset_tokens.len();

        tables.reset_tokens.retain(|_, token| token.expires_at > now);

        Ok(before - tables.reset_tokens.len())
    }
}

#[async_trait]
impl CourseStore for MemoryStore {
    async fn insert_course(&self, course: Course) -> Result<(), DatabaseError> {
        let mut tables = self.tables.write().await;

        if tables.courses.contains_key(&course.id) {
            return Err(DatabaseError::Conflict(constraint::RECORD_ID));
        }

        tables.courses.insert(course.id.clone(), course);
        Ok(())
    }

    async fn course_by_id(&self, course_id: &str) -> Result<Option<Course>, DatabaseError> {
        Ok(self.tables.read().await.courses.get(course_id).cloned())
    }

    async fn courses_by_owner(&self, owner_id: &str) -> Result<Vec<Course>, DatabaseError> {
        let tables = self.tables.read().await;

        let mut courses: Vec<Course> = tables
            .courses
            .values()
            .filter(|course| course.owner_id == owner_id)
            .cloned()
            .collect();
        newest_first(&mut courses, |course| course.created_at);

        Ok(courses)
    }

    async fn update_course(
        &self,
        course_id: &str,
        owner_id: &str,
        details: CourseDetails,
        now: DateTime<Utc>,
    ) -> Result<Option<Course>, DatabaseError> {
        let mut tables = self.tables.write().await;

        Ok(tables
            .courses
            .get_mut(course_id)
            .filter(|course| course.owner_id == owner_id)
            .map(|course| {
                course.details = details;
                course.updated_at = now;
                course.clone()
            }))
    }

    async fn delete_course(&self, course_id: &str, owner_id: &str) -> Result<bool, DatabaseError> {
        let mut tables = self.tables.write().await;

        let owned = tables
            .courses
            .get(course_id)
            .is_some_and(|course| course.owner_id == owner_id);
        if owned {
            tables.courses.remove(course_id);
        }

        Ok(owned)
    }
}

#[async_trait]
impl EnrollmentStore for MemoryStore {
    async fn insert_enrollment(&self, enrollment: Enrollment) -> Result<(), DatabaseError> {
        let mut tables = self.tables.write().await;

        let duplicate = tables.enrollments.iter().any(|existing| {
            existing.course_id == enrollment.course_id && existing.student_id == enrollment.student_id
        });
        if duplicate {
            return Err(DatabaseError::Conflict(constraint::ENROLLMENT_PAIR));
        }

        tables.enrollments.push(enrollment);
        Ok(())
    }

    async fn delete_enrollment(
        &self,
        course_id: &str,
        student_id: &str,
        teacher_id: &str,
    ) -> Result<bool, DatabaseError> {
        let mut tables = self.tables.write().await;
        let before = tables.enrollments.len();

        tables.enrollments.retain(|enrollment| {
            !(enrollment.course_id == course_id
                && enrollment.student_id == student_id
                && enrollment.teacher_id == teacher_id)
        });

        Ok(tables.enrollments.len() < before)
    }

    async fn enrollments_for_course(
        &self,
        course_id: &str,
        teacher_id: &str,
    ) -> Result<Vec<Enrollment>, DatabaseError> {
        let tables = self.tables.read().await;

        Ok(tables
            .enrollments
            .iter()
            .filter(|enrollment| {
                enrollment.course_id == course_id && enrollment.teacher_id == teacher_id
            })
            .cloned()
            .collect())
    }

    async fn enrollments_for_student(
        &self,
        student_id: &str,
    ) -> Result<Vec<Enrollment>, DatabaseError> {
        let tables = self.tables.read().await;

        Ok(tables
            .enrollments
            .iter()
            .filter(|enrollment| enrollment.student_id == student_id)
            .cloned()
            .collect())
    }

    async fn is_enrolled(&self, course_id: &str, student_id: &str) -> Result<bool, DatabaseError> {
        let tables = self.tables.read().await;

        Ok(tables.enrollments.iter().any(|enrollment| {
            enrollment.course_id == course_id && enrollment.student_id == student_id
        }))
    }
}

#[async_trait]
impl ExamStore for MemoryStore {
    async fn insert_exam(&self, exam: Exam) -> Result<(), DatabaseError> {
        let mut tables = self.tables.write().await;

        if tables.exams.iter().any(|existing| existing.id == exam.id) {
            return Err(DatabaseError::Conflict(constraint::RECORD_ID));
        }

        tables.exams.push(exam);
        Ok(())
    }

    async fn exam_by_id(&self, exam_id: &str) -> Result<Option<Exam>, DatabaseError> {
        let tables = self.tables.read().await;

        Ok(tables.exams.iter().find(|exam| exam.id == exam_id).cloned())
    }

    async fn public_exam_by_id(&self, exam_id: &str) -> Result<Option<Exam>, DatabaseError> {
        let tables = self.tables.read().await;

        Ok(tables
            .exams
            .iter()
            .find(|exam| exam.id == exam_id && exam.scope.is_public())
            .cloned())
    }

    async fn exams_for_course(&self, course_id: &str) -> Result<Vec<Exam>, DatabaseError> {
        let tables = self.tables.read().await;

        let mut exams: Vec<Exam> = tables
            .exams
            .iter()
            .filter(|exam| matches!(&exam.scope, ExamScope::Course { course_id: id } if id == course_id))
            .cloned()
            .collect();
        newest_first(&mut exams, |exam| exam.created_at);

        Ok(exams)
    }

    async fn exams_by_owner(&self, owner_id: &str) -> Result<Vec<Exam>, DatabaseError> {
        let tables = self.tables.read().await;

        let mut exams: Vec<Exam> = tables
            .exams
            .iter()
            .filter(|exam| exam.owner_id == owner_id)
            .cloned()
            .collect();
        newest_first(&mut exams, |exam| exam.created_at);

        Ok(exams)
    }

    async fn delete_exam(&self, exam_id: &str, owner_id: &str) -> Result<bool, DatabaseError> {
        let mut tables = self.tables.write().await;
        let before = tables.exams.len();

        tables
            .exams
            .retain(|exam| !(exam.id == exam_id && exam.owner_id == owner_id));

        Ok(tables.exams.len() < before)
    }
}

#[async_trait]
impl SubmissionStore for MemoryStore {
    async fn insert_submission(&self, submission: Submission) -> Result<(), DatabaseError> {
        let mut tables = self.tables.write().await;

        let kind = submission.submitter.kind();
        let identity_key = submission.submitter.identity_key();
        let duplicate = tables.submissions.iter().any(|existing| {
            existing.exam_id == submission.exam_id
                && existing.submitter.kind() == kind
                && existing.submitter.identity_key() == identity_key
        });
        if duplicate {
            return Err(DatabaseError::Conflict(constraint::SUBMISSION_IDENTITY));
        }

        tables.submissions.push(submission);
        Ok(())
    }

    async fn registered_submissions(&self, exam_id: &str) -> Result<Vec<Submission>, DatabaseError> {
        let tables = self.tables.read().await;

        Ok(tables
            .submissions
            .iter()
            .filter(|row| row.exam_id == exam_id && row.submitter.kind() == SubmissionType::Registered)
            .cloned()
            .collect())
    }

    async fn guest_submissions(&self, exam_id: &str) -> Result<Vec<Submission>, DatabaseError> {
        let tables = self.tables.read().await;

        Ok(tables
            .submissions
            .iter()
            .filter(|row| row.exam_id == exam_id && row.submitter.kind() == SubmissionType::Guest)
            .cloned()
            .collect())
    }

    async fn student_submissions(
        &self,
        course_id: &str,
        student_id: &str,
    ) -> Result<Vec<Submission>, DatabaseError> {
        let tables = self.tables.read().await;

        let mut rows: Vec<Submission> = tables
            .submissions
            .iter()
            .filter(|row| {
                row.course_id.as_deref() == Some(course_id)
                    && row.submitter.student_id() == Some(student_id)
            })
            .cloned()
            .collect();
        newest_first(&mut rows, |row| row.submitted_at);

        Ok(rows)
    }

    async fn apply_review(
        &self,
        exam_id: &str,
        submission_id: &str,
        kind: SubmissionType,
        student_id: Option<&str>,
        review: Review,
    ) -> Result<bool, DatabaseError> {
        let mut tables = self.tables.write().await;

        let row = tables.submissions.iter_mut().find(|row| {
            row.id == submission_id
                && row.exam_id == exam_id
                && row.submitter.kind() == kind
                && (kind == SubmissionType::Guest || row.submitter.student_id() == student_id)
        });

        match row {
            Some(row) => {
                review.apply(row);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn guest_submission_count(&self, exam_id: &str) -> Result<usize, DatabaseError> {
        let tables = self.tables.read().await;

        Ok(tables
            .submissions
            .iter()
            .filter(|row| row.exam_id == exam_id && row.submitter.kind() == SubmissionType::Guest)
            .count())
    }
}
