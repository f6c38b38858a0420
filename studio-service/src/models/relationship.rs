//! Relationship facts linking users to studios.

use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct StudioInstructor {
    pub id: i64,
    pub studio_id: i64,
    pub instructor_id: i64,
    pub is_approved: bool,
    pub is_admin: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct StudioStudent {
    pub id: i64,
    pub studio_id: i64,
    pub student_id: i64,
    pub is_approved: bool,
}
