use tracing::info;

use crate::{
    errors::CourseError,
    services::database::{Course, CourseDetails, Role, Store},
    utils::{clock::Clock, crypto::generate_uuid},
};

pub struct CourseCatalog<'a> {
    store: &'a dyn Store,
    clock: &'a dyn Clock,
}

impl<'a> CourseCatalog<'a> {
    pub fn new(store: &'a dyn Store, clock: &'a dyn Clock) -> Self {
        Self { store, clock }
    }

    pub async fn create(&self, owner_id: &str, details: CourseDetails) -> Result<Course, CourseError> {
        match self.store.user_by_id(owner_id).await? {
            Some(owner) if owner.is_active && owner.role == Role::Teacher => {}
            _ => return Err(CourseError::TeacherRequired),
        }

        let now = self.clock.now();
        let course = Course {
            id: generate_uuid(),
            owner_id: owner_id.to_string(),
            details,
            created_at: now,
            updated_at: now,
        };

        self.store.insert_course(course.clone()).await?;

        info!(course_id = %course.id, owner_id, "course created");
        Ok(course)
    }

    /// Newest first.
    pub async fn list_for_owner(&self, owner_id: &str) -> Result<Vec<Course>, CourseError> {
        Ok(self.store.courses_by_owner(owner_id).await?)
    }

    /// A course that exists but belongs to someone else is reported as missing.
    pub async fn get_owned(&self, course_id: &str, owner_id: &str) -> Result<Course, CourseError> {
        match self.store.course_by_id(course_id).await? {
            Some(course) if course.owner_id == owner_id => Ok(course),
            _ => Err(CourseError::CourseNotFound),
        }
    }

    pub async fn update(
        &self,
        course_id: &str,
        owner_id: &str,
        details: CourseDetails,
    ) -> Result<Course, CourseError> {
        self.store
            .update_course(course_id, owner_id, details, self.clock.now())
            .await?
            .ok_or(CourseError::CourseNotFound)
    }

    pub async fn delete(&self, course_id: &str, owner_id: &str) -> Result<(), CourseError> {
        if !self.store.delete_course(course_id, owner_id).await? {
            return Err(CourseError::CourseNotFound);
        }

        info!(course_id, owner_id, "course deleted");
        Ok(())
    }
}
