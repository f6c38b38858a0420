use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Student profile as exposed to instructors and to the student.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: i64,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub notes: Option<String>,
    pub profile_picture_url: Option<String>,
}

/// A studio's client: the `studio_student` row with the student inlined.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct StudioClient {
    pub relationship_id: i64,
    pub studio_id: i64,
    pub is_approved: bool,
    #[sqlx(flatten)]
    pub student: Student,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct StudentProfileUpdate {
    #[validate(length(max = 100, message = "First name is too long"))]
    pub first_name: Option<String>,
    #[validate(length(max = 100, message = "Last name is too long"))]
    pub last_name: Option<String>,
    #[validate(length(max = 32, message = "Phone number is too long"))]
    pub phone: Option<String>,
    #[validate(length(max = 4000, message = "Notes are too long"))]
    pub notes: Option<String>,
}

impl StudentProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none()
            && self.last_name.is_none()
            && self.phone.is_none()
            && self.notes.is_none()
    }
}
