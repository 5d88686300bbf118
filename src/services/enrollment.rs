use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::{
    errors::EnrollmentError,
    services::database::{Course, DatabaseError, Enrollment, Role, Store, UserProfile},
    utils::{clock::Clock, crypto::generate_uuid},
};

#[derive(Debug, Clone, Serialize)]
pub struct EnrolledStudent {
    #[serde(flatten)]
    pub student: UserProfile,
    pub enrolled_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EnrolledCourse {
    #[serde(flatten)]
    pub course: Course,
    pub enrolled_at: DateTime<Utc>,
}

/// Links students to teacher-owned courses. The store owns the (course, student)
/// uniqueness; the ledger only translates its verdicts.
pub struct EnrollmentLedger<'a> {
    store: &'a dyn Store,
    clock: &'a dyn Clock,
}

impl<'a> EnrollmentLedger<'a> {
    pub fn new(store: &'a dyn Store, clock: &'a dyn Clock) -> Self {
        Self { store, clock }
    }

    pub async fn enroll(
        &self,
        course_id: &str,
        student_id: &str,
        teacher_id: &str,
    ) -> Result<Enrollment, EnrollmentError> {
        self.owned_course(course_id, teacher_id).await?;

        match self.store.user_by_id(student_id).await? {
            Some(student) if student.is_active && student.role == Role::Student => {}
            _ => return Err(EnrollmentError::StudentNotFound),
        }

        let enrollment = Enrollment {
            id: generate_uuid(),
            course_id: course_id.to_string(),
            student_id: student_id.to_string(),
            teacher_id: teacher_id.to_string(),
            enrolled_at: self.clock.now(),
        };

        match self.store.insert_enrollment(enrollment.clone()).await {
            Ok(()) => {}
            Err(DatabaseError::Conflict(_)) => return Err(EnrollmentError::AlreadyEnrolled),
            Err(error) => return Err(error.into()),
        }

        info!(course_id, student_id, "student enrolled");
        Ok(enrollment)
    }

    pub async fn unenroll(
        &self,
        course_id: &str,
        student_id: &str,
        teacher_id: &str,
    ) -> Result<(), EnrollmentError> {
        if !self
            .store
            .delete_enrollment(course_id, student_id, teacher_id)
            .await?
        {
            return Err(EnrollmentError::EnrollmentNotFound);
        }

        info!(course_id, student_id, "student unenrolled");
        Ok(())
    }

    pub async fn students_of(
        &self,
        course_id: &str,
        teacher_id: &str,
    ) -> Result<Vec<EnrolledStudent>, EnrollmentError> {
        self.owned_course(course_id, teacher_id).await?;

        let enrollments = self
            .store
            .enrollments_for_course(course_id, teacher_id)
            .await?;

        let mut students = Vec::with_capacity(enrollments.len());
        for enrollment in enrollments {
            if let Some(student) = self.store.user_by_id(&enrollment.student_id).await? {
                students.push(EnrolledStudent {
                    student: UserProfile::from(&student),
                    enrolled_at: enrollment.enrolled_at,
                });
            }
        }

        Ok(students)
    }

    pub async fn courses_of(&self, student_id: &str) -> Result<Vec<EnrolledCourse>, EnrollmentError> {
        let enrollments = self.store.enrollments_for_student(student_id).await?;

        let mut courses = Vec::with_capacity(enrollments.len());
        for enrollment in enrollments {
            // Courses deleted after enrolling simply drop out of the list.
            if let Some(course) = self.store.course_by_id(&enrollment.course_id).await? {
                courses.push(EnrolledCourse {
                    course,
                    enrolled_at: enrollment.enrolled_at,
                });
            }
        }

        Ok(courses)
    }

    async fn owned_course(&self, course_id: &str, teacher_id: &str) -> Result<Course, EnrollmentError> {
        match self.store.course_by_id(course_id).await? {
            Some(course) if course.owner_id == teacher_id => Ok(course),
            _ => Err(EnrollmentError::CourseNotFound),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::services::database::{
        AuthProvider, CourseDetails, CourseStore, MemoryStore, User, UserStore,
    };
    use crate::utils::clock::ManualClock;

    async fn seed() -> (MemoryStore, ManualClock) {
        let store = MemoryStore::new();
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();

        for (id, role) in [
            ("teacher", Role::Teacher),
            ("other-teacher", Role::Teacher),
            ("student", Role::Student),
        ] {
            store
                .insert_user(User {
                    id: id.to_string(),
                    username: id.to_string(),
                    email: format!("{id}@example.com"),
                    password_hash: Some("secret-hash".to_string()),
                    role,
                    class_subject: None,
                    google_id: None,
                    profile_picture: None,
                    auth_provider: AuthProvider::Password,
                    is_active: true,
                    profile_complete: true,
                    created_at: now,
                    updated_at: now,
                })
                .await
                .unwrap();
        }

        store
            .insert_course(Course {
                id: "algebra".to_string(),
                owner_id: "teacher".to_string(),
                details: CourseDetails {
                    name: "Algebra".to_string(),
                    ..CourseDetails::default()
                },
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();

        (store, ManualClock::new(now))
    }

    #[tokio::test]
    async fn enrolling_twice_is_rejected() {
        let (store, clock) = seed().await;
        let ledger = EnrollmentLedger::new(&store, &clock);

        ledger.enroll("algebra", "student", "teacher").await.unwrap();
        let again = ledger.enroll("algebra", "student", "teacher").await;

        assert!(matches!(again, Err(EnrollmentError::AlreadyEnrolled)));
        assert_eq!(ledger.students_of("algebra", "teacher").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unenroll_then_enroll_succeeds() {
        let (store, clock) = seed().await;
        let ledger = EnrollmentLedger::new(&store, &clock);

        ledger.enroll("algebra", "student", "teacher").await.unwrap();
        ledger.unenroll("algebra", "student", "teacher").await.unwrap();
        ledger.enroll("algebra", "student", "teacher").await.unwrap();

        assert_eq!(ledger.courses_of("student").await.unwrap().len(), 1);
        assert!(matches!(
            ledger.unenroll("algebra", "student", "other-teacher").await,
            Err(EnrollmentError::EnrollmentNotFound)
        ));
    }

    #[tokio::test]
    async fn enroll_checks_course_owner_and_student_role() {
        let (store, clock) = seed().await;
        let ledger = EnrollmentLedger::new(&store, &clock);

        assert!(matches!(
            ledger.enroll("algebra", "student", "other-teacher").await,
            Err(EnrollmentError::CourseNotFound)
        ));
        assert!(matches!(
            ledger.enroll("algebra", "other-teacher", "teacher").await,
            Err(EnrollmentError::StudentNotFound)
        ));
        assert!(matches!(
            ledger.enroll("missing", "student", "teacher").await,
            Err(EnrollmentError::CourseNotFound)
        ));
    }

    #[tokio::test]
    async fn roster_never_exposes_password_hashes() {
        let (store, clock) = seed().await;
        let ledger = EnrollmentLedger::new(&store, &clock);
        ledger.enroll("algebra", "student", "teacher").await.unwrap();

        let roster = ledger.students_of("algebra", "teacher").await.unwrap();
        let json = serde_json::to_value(&roster).unwrap();

        assert_eq!(json[0]["email"], "student@example.com");
        assert!(json[0].get("password_hash").is_none());
        assert!(!json.to_string().contains("secret-hash"));
    }

    #[tokio::test]
    async fn enrolled_courses_carry_course_details() {
        let (store, clock) = seed().await;
        let ledger = EnrollmentLedger::new(&store, &clock);
        ledger.enroll("algebra", "student", "teacher").await.unwrap();

        let courses = ledger.courses_of("student").await.unwrap();

        assert_eq!(courses[0].course.details.name, "Algebra");
        assert_eq!(courses[0].enrolled_at, clock.now());
    }
}
