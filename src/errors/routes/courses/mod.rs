mod course;
mod enrollment;

pub use course::CourseError;
pub use enrollment::EnrollmentError;
