use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::{UserResponse, UserType};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,

    pub user_type: UserType,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,

    #[validate(length(max = 100, message = "First name is too long"))]
    pub first_name: Option<String>,

    #[validate(length(max = 100, message = "Last name is too long"))]
    pub last_name: Option<String>,

    pub user_type: UserType,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CheckUserRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    pub user_type: UserType,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckUserResponse {
    pub success: bool,
    pub exists: bool,
    pub has_password: bool,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SetPasswordRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,

    pub user_type: UserType,
}

/// Body for login, signup and "current user". Never carries the password hash.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUserResponse {
    pub success: bool,
    pub user: UserResponse,
    pub user_type: UserType,
}
