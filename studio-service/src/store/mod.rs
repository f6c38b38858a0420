//! Data-store collaborator consulted by the session and authorization layers.
//!
//! Every method is a point lookup or a single-row update. Nothing here
//! caches: callers see the store's current state on each call.

mod memory;
mod postgres;

use async_trait::async_trait;
use service_core::error::AppError;

use crate::models::{
    NewUser, Student, StudentProfileUpdate, StudioClient, StudioInstructor, StudioStudent,
    UserRecord, UserType,
};

pub use memory::MemoryStore;
pub use postgres::{create_pool, run_migrations, PgStore};

#[async_trait]
pub trait StudioStore: Send + Sync {
    async fn health_check(&self) -> Result<(), AppError>;

    // Users

    async fn find_user(
        &self,
        user_type: UserType,
        email: &str,
    ) -> Result<Option<UserRecord>, AppError>;

    /// Emails are unique per user type, ignoring case; a clash is `Conflict`.
    async fn insert_user(&self, user_type: UserType, user: NewUser)
        -> Result<UserRecord, AppError>;

    async fn set_user_password(
        &self,
        user_type: UserType,
        user_id: i64,
        password_hash: &str,
    ) -> Result<(), AppError>;

    // Relationship facts

    async fn find_studio_instructor(
        &self,
        instructor_id: i64,
        studio_id: i64,
    ) -> Result<Option<StudioInstructor>, AppError>;

    async fn find_studio_instructor_by_id(
        &self,
        id: i64,
    ) -> Result<Option<StudioInstructor>, AppError>;

    async fn find_studio_student_by_id(&self, id: i64)
        -> Result<Option<StudioStudent>, AppError>;

    /// Returns false when no row matched.
    async fn set_studio_instructor_approval(
        &self,
        id: i64,
        approved: bool,
    ) -> Result<bool, AppError>;

    /// Returns false when no row matched.
    async fn set_studio_student_approval(&self, id: i64, approved: bool)
        -> Result<bool, AppError>;

    // Clients and student profiles

    /// Ordered by last name, then first name; missing names sort last.
    async fn list_studio_clients(&self, studio_id: i64) -> Result<Vec<StudioClient>, AppError>;

    async fn find_studio_client(
        &self,
        studio_id: i64,
        student_id: i64,
    ) -> Result<Option<StudioClient>, AppError>;

    async fn find_student(&self, student_id: i64) -> Result<Option<Student>, AppError>;

    async fn update_student_profile(
        &self,
        student_id: i64,
        update: &StudentProfileUpdate,
    ) -> Result<Option<Student>, AppError>;

    async fn set_student_profile_picture(
        &self,
        student_id: i64,
        url: &str,
    ) -> Result<(), AppError>;
}
