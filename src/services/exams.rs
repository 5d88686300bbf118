use chrono::{DateTime, Utc};
use futures_util::future::try_join;
use serde::Serialize;
use tracing::{debug, info};

use crate::{
    errors::ExamError,
    services::database::{
        Course, DatabaseError, Exam, ExamDefinition, ExamScope, Review, Role, Store, Submission,
        SubmissionType, Submitter, User,
    },
    utils::{clock::Clock, crypto::generate_uuid},
};

/// `score / total * 100`, rounded to two decimals. Zero when there is nothing to score.
pub fn percentage(score: f64, total_marks: f64) -> f64 {
    if total_marks == 0.0 {
        return 0.0;
    }

    (score / total_marks * 100.0 * 100.0).round() / 100.0
}

/// A course exam currently open to a student, with the course context it belongs to.
#[derive(Debug, Clone, Serialize)]
pub struct AvailableExam {
    #[serde(flatten)]
    pub exam: Exam,
    pub course_name: String,
    pub course_subject: Option<String>,
    pub teacher_name: Option<String>,
}

/// One row of an exam's merged result list.
#[derive(Debug, Clone, Serialize)]
pub struct ResultView {
    #[serde(flatten)]
    pub submission: Submission,
    pub student_name: Option<String>,
    pub student_email: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PublicExamSummary {
    #[serde(flatten)]
    pub exam: Exam,
    pub submission_count: usize,
}

#[derive(Debug, Clone)]
pub struct SubmissionInput {
    pub score: f64,
    pub total_marks: f64,
    pub answers: serde_json::Value,
    pub submitted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct ReviewInput {
    pub submission_id: String,
    pub submission_type: SubmissionType,
    /// Required to match for registered submissions, ignored for guests.
    pub student_id: Option<String>,
    pub score: f64,
    pub answers: serde_json::Value,
}

pub struct ExamEngine<'a> {
    store: &'a dyn Store,
    clock: &'a dyn Clock,
}

impl<'a> ExamEngine<'a> {
    pub fn new(store: &'a dyn Store, clock: &'a dyn Clock) -> Self {
        Self { store, clock }
    }

    pub async fn create(
        &self,
        owner_id: &str,
        scope: ExamScope,
        definition: ExamDefinition,
    ) -> Result<Exam, ExamError> {
        match &scope {
            ExamScope::Course { course_id } => {
                self.owned_course(course_id, owner_id).await?;
            }
            ExamScope::Public { .. } => match self.store.user_by_id(owner_id).await? {
                Some(owner) if owner.is_active && owner.role == Role::Teacher => {}
                _ => return Err(ExamError::Forbidden),
            },
        }

        let now = self.clock.now();
        let exam = Exam {
            id: generate_uuid(),
            owner_id: owner_id.to_string(),
            scope,
            definition,
            created_at: now,
            updated_at: now,
        };

        self.store.insert_exam(exam.clone()).await?;

        info!(exam_id = %exam.id, owner_id, is_public = exam.scope.is_public(), "exam created");
        Ok(exam)
    }

    /// Open exams from every course the student is enrolled in, latest start first.
    pub async fn available_for(&self, student_id: &str) -> Result<Vec<AvailableExam>, ExamError> {
        let now = self.clock.now();
        let enrollments = self.store.enrollments_for_student(student_id).await?;

        let mut available = Vec::new();
        for enrollment in enrollments {
            let Some(course) = self.store.course_by_id(&enrollment.course_id).await? else {
                continue;
            };
            let teacher_name = self
                .store
                .user_by_id(&course.owner_id)
                .await?
                .map(|teacher| teacher.username);

            for exam in self.store.exams_for_course(&course.id).await? {
                if !exam.definition.window().contains(now) {
                    continue;
                }

                available.push(AvailableExam {
                    exam,
                    course_name: course.details.name.clone(),
                    course_subject: course.details.subject.clone(),
                    teacher_name: teacher_name.clone(),
                });
            }
        }

        available.sort_by(|a, b| {
            b.exam
                .definition
                .start_date
                .cmp(&a.exam.definition.start_date)
        });

        Ok(available)
    }

    /// Records a submission at most once per (exam, identity). Registered submitters
    /// may answer public exams and exams of courses they are enrolled in; guests only
    /// public exams.
    pub async fn submit(
        &self,
        exam_id: &str,
        submitter: Submitter,
        input: SubmissionInput,
    ) -> Result<Submission, ExamError> {
        let submitter = submitter.normalized();
        let exam = self
            .store
            .exam_by_id(exam_id)
            .await?
            .ok_or(ExamError::ExamNotFound)?;

        let course_id = match (&exam.scope, &submitter) {
            (ExamScope::Public { .. }, _) => None,
            (ExamScope::Course { course_id }, Submitter::Registered { student_id }) => {
                if !self.store.is_enrolled(course_id, student_id).await? {
                    return Err(ExamError::ExamNotFound);
                }
                Some(course_id.clone())
            }
            (ExamScope::Course { .. }, Submitter::Guest(_)) => {
                return Err(ExamError::ExamNotFound);
            }
        };

        let now = self.clock.now();
        let submission = Submission {
            id: generate_uuid(),
            exam_id: exam.id.clone(),
            submitter,
            course_id,
            score: input.score,
            total_marks: input.total_marks,
            percentage: percentage(input.score, input.total_marks),
            answers: input.answers,
            reviewed: false,
            reviewed_at: None,
            submitted_at: input.submitted_at.unwrap_or(now),
            created_at: now,
        };

        match self.store.insert_submission(submission.clone()).await {
            Ok(()) => {}
            Err(DatabaseError::Conflict(_)) => return Err(ExamError::AlreadySubmitted),
            Err(error) => return Err(error.into()),
        }

        info!(
            exam_id,
            submission_id = %submission.id,
            submission_type = ?submission.submitter.kind(),
            "exam submitted"
        );
        Ok(submission)
    }

    /// Registered rows then guest rows, each in submission order, stably ranked by
    /// score. Registered rows carry the student's name and email.
    pub async fn all_results(&self, exam_id: &str, owner_id: &str) -> Result<Vec<ResultView>, ExamError> {
        self.owned_exam(exam_id, owner_id).await?;

        let (registered, guests) = try_join(
            self.store.registered_submissions(exam_id),
            self.store.guest_submissions(exam_id),
        )
        .await?;

        let mut results = Vec::with_capacity(registered.len() + guests.len());
        for submission in registered {
            let student = match submission.submitter.student_id() {
                Some(student_id) => self.store.user_by_id(student_id).await?,
                None => None,
            };
            results.push(ResultView {
                student_name: student.as_ref().map(|user| user.username.clone()),
                student_email: student.map(|user| user.email),
                submission,
            });
        }
        for submission in guests {
            let (student_name, student_email) = match &submission.submitter {
                Submitter::Guest(guest) => (Some(guest.name.clone()), guest.email.clone()),
                Submitter::Registered { .. } => (None, None),
            };
            results.push(ResultView {
                submission,
                student_name,
                student_email,
            });
        }

        results.sort_by(|a, b| b.submission.score.total_cmp(&a.submission.score));

        Ok(results)
    }

    /// Overwrites score and answers, recomputes the percentage from the stored total
    /// and marks the row reviewed. Repeating the same review is harmless.
    pub async fn review(&self, exam_id: &str, reviewer_id: &str, input: ReviewInput) -> Result<Submission, ExamError> {
        self.owned_exam(exam_id, reviewer_id).await?;

        let rows = match input.submission_type {
            SubmissionType::Registered => self.store.registered_submissions(exam_id).await?,
            SubmissionType::Guest => self.store.guest_submissions(exam_id).await?,
        };
        let mut submission = rows
            .into_iter()
            .find(|row| row.id == input.submission_id)
            .ok_or(ExamError::SubmissionNotFound)?;

        let student_id = match input.submission_type {
            SubmissionType::Registered => {
                let claimed = input.student_id.as_deref();
                if claimed.is_none() || submission.submitter.student_id() != claimed {
                    return Err(ExamError::SubmissionNotFound);
                }
                claimed
            }
            SubmissionType::Guest => None,
        };

        let review = Review {
            score: input.score,
            percentage: percentage(input.score, submission.total_marks),
            answers: input.answers,
            reviewed_at: self.clock.now(),
        };

        let applied = self
            .store
            .apply_review(
                exam_id,
                &input.submission_id,
                input.submission_type,
                student_id,
                review.clone(),
            )
            .await?;
        if !applied {
            return Err(ExamError::SubmissionNotFound);
        }

        review.apply(&mut submission);
        info!(exam_id, submission_id = %submission.id, "submission reviewed");
        Ok(submission)
    }

    /// Copies the exam under the same scope with a "(Copy)" title. Results stay behind.
    pub async fn duplicate(&self, exam_id: &str, owner_id: &str) -> Result<Exam, ExamError> {
        let original = self.owned_exam(exam_id, owner_id).await?;
        let now = self.clock.now();

        let mut definition = original.definition;
        definition.title = format!("{} (Copy)", definition.title);

        let copy = Exam {
            id: generate_uuid(),
            owner_id: original.owner_id,
            scope: original.scope,
            definition,
            created_at: now,
            updated_at: now,
        };

        self.store.insert_exam(copy.clone()).await?;

        info!(exam_id, copy_id = %copy.id, "exam duplicated");
        Ok(copy)
    }

    /// Course exams are visible to the owner and to enrolled students; public exams to
    /// any signed-in user.
    pub async fn get(&self, exam_id: &str, viewer: &User) -> Result<Exam, ExamError> {
        let exam = self
            .store
            .exam_by_id(exam_id)
            .await?
            .ok_or(ExamError::ExamNotFound)?;

        if exam.owner_id == viewer.id {
            return Ok(exam);
        }

        match &exam.scope {
            ExamScope::Public { .. } => Ok(exam),
            ExamScope::Course { course_id } => {
                if self.store.is_enrolled(course_id, &viewer.id).await? {
                    Ok(exam)
                } else {
                    debug!(exam_id, viewer_id = %viewer.id, "exam hidden from non-member");
                    Err(ExamError::ExamNotFound)
                }
            }
        }
    }

    pub async fn get_public(&self, exam_id: &str) -> Result<Exam, ExamError> {
        self.store
            .public_exam_by_id(exam_id)
            .await?
            .ok_or(ExamError::ExamNotFound)
    }

    pub async fn course_exams(&self, course_id: &str, viewer: &User) -> Result<Vec<Exam>, ExamError> {
        let course = self
            .store
            .course_by_id(course_id)
            .await?
            .ok_or(ExamError::CourseNotFound)?;

        if course.owner_id != viewer.id && !self.store.is_enrolled(course_id, &viewer.id).await? {
            return Err(ExamError::CourseNotFound);
        }

        Ok(self.store.exams_for_course(course_id).await?)
    }

    pub async fn delete(&self, exam_id: &str, owner_id: &str) -> Result<(), ExamError> {
        if !self.store.delete_exam(exam_id, owner_id).await? {
            return Err(ExamError::ExamNotFound);
        }

        info!(exam_id, owner_id, "exam deleted");
        Ok(())
    }

    pub async fn owner_exams(&self, owner_id: &str) -> Result<Vec<Exam>, ExamError> {
        Ok(self.store.exams_by_owner(owner_id).await?)
    }

    pub async fn owner_public_exams(&self, owner_id: &str) -> Result<Vec<PublicExamSummary>, ExamError> {
        let exams = self.store.exams_by_owner(owner_id).await?;

        let mut summaries = Vec::new();
        for exam in exams.into_iter().filter(|exam| exam.scope.is_public()) {
            let submission_count = self.store.guest_submission_count(&exam.id).await?;
            summaries.push(PublicExamSummary {
                exam,
                submission_count,
            });
        }

        Ok(summaries)
    }

    pub async fn guest_submissions(&self, exam_id: &str, owner_id: &str) -> Result<Vec<Submission>, ExamError> {
        let exam = self.owned_exam(exam_id, owner_id).await?;
        if !exam.scope.is_public() {
            return Err(ExamError::ExamNotFound);
        }

        Ok(self.store.guest_submissions(exam_id).await?)
    }

    /// A student may read their own results; the course owner may read anyone's.
    pub async fn student_results(
        &self,
        course_id: &str,
        student_id: &str,
        viewer: &User,
    ) -> Result<Vec<Submission>, ExamError> {
        let course = self
            .store
            .course_by_id(course_id)
            .await?
            .ok_or(ExamError::CourseNotFound)?;

        if viewer.id != student_id && viewer.id != course.owner_id {
            return Err(ExamError::Forbidden);
        }

        Ok(self.store.student_submissions(course_id, student_id).await?)
    }

    async fn owned_course(&self, course_id: &str, owner_id: &str) -> Result<Course, ExamError> {
        match self.store.course_by_id(course_id).await? {
            Some(course) if course.owner_id == owner_id => Ok(course),
            _ => Err(ExamError::CourseNotFound),
        }
    }

    async fn owned_exam(&self, exam_id: &str, owner_id: &str) -> Result<Exam, ExamError> {
        match self.store.exam_by_id(exam_id).await? {
            Some(exam) if exam.owner_id == owner_id => Ok(exam),
            _ => Err(ExamError::ExamNotFound),
        }
    }
}
