pub mod course;
pub mod enrollment;
pub mod exam;
pub mod memory;
pub mod reset_token;
pub mod session;
pub mod submission;
pub mod surreal;
pub mod user;

use std::sync::Arc;

use derive_more::Display;

pub use course::{Course, CourseDetails, CourseStore};
pub use enrollment::{Enrollment, EnrollmentStore};
pub use exam::{Exam, ExamDefinition, ExamScope, ExamStore, ExamWindow};
pub use memory::MemoryStore;
pub use reset_token::{ResetToken, ResetTokenStore};
pub use session::{Session, SessionStore};
pub use submission::{GuestInfo, Review, Submission, SubmissionStore, SubmissionType, Submitter};
pub use surreal::SurrealStore;
pub use user::{AuthProvider, Role, User, UserPatch, UserProfile, UserStore};

/// Names of the uniqueness constraints the store enforces.
pub mod constraint {
    pub const USER_EMAIL: &str = "user_email";
    pub const SESSION_TOKEN: &str = "session_token";
    pub const RESET_TOKEN: &str = "reset_token";
    pub const ENROLLMENT_PAIR: &str = "enrollment_pair";
    pub const SUBMISSION_IDENTITY: &str = "submission_identity";
    pub const RECORD_ID: &str = "record_id";
}

#[derive(Debug, Display)]
pub enum DatabaseError {
    #[display("unique constraint `{_0}` violated")]
    Conflict(&'static str),
    #[display("{_0}")]
    Surreal(surrealdb::Error),
}

impl std::error::Error for DatabaseError {}

impl From<surrealdb::Error> for DatabaseError {
    fn from(error: surrealdb::Error) -> Self {
        DatabaseError::Surreal(error)
    }
}

impl DatabaseError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, DatabaseError::Conflict(_))
    }
}

/// Everything the components need from persistence. Implemented by [`MemoryStore`]
/// and [`SurrealStore`].
pub trait Store:
    UserStore + SessionStore + ResetTokenStore + CourseStore + EnrollmentStore + ExamStore + SubmissionStore
{
}

impl<T> Store for T where
    T: UserStore
        + SessionStore
        + ResetTokenStore
        + CourseStore
        + EnrollmentStore
        + ExamStore
        + SubmissionStore
{
}

/// Explicitly constructed storage handle passed to every component.
#[derive(Clone)]
pub struct DatabaseLayer {
    store: Arc<dyn Store>,
}

impl DatabaseLayer {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::default()))
    }

    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }
}
