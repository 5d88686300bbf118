pub mod auth;
pub mod courses;
pub mod exams;
pub mod users;

pub use auth::*;
pub use courses::*;
pub use exams::ExamError;
pub use users::UserError;
