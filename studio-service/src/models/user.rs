//! User accounts. Each role lives in its own table with the same shape.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Role claimed by a session token and used to pick the user table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    Student,
    Instructor,
    Admin,
}

impl UserType {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserType::Student => "student",
            UserType::Instructor => "instructor",
            UserType::Admin => "admin",
        }
    }

    /// Backing table. Only ever interpolated from this closed set.
    pub fn table(&self) -> &'static str {
        match self {
            UserType::Student => "students",
            UserType::Instructor => "instructors",
            UserType::Admin => "admins",
        }
    }
}

impl std::fmt::Display for UserType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for UserType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "student" => Ok(UserType::Student),
            "instructor" => Ok(UserType::Instructor),
            "admin" => Ok(UserType::Admin),
            _ => Err(format!("Invalid user type: {}", s)),
        }
    }
}

/// Stored user row. Holds the password hash, so never serialize it directly.
#[derive(Debug, Clone, FromRow)]
pub struct UserRecord {
    pub id: i64,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub password_hash: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl UserRecord {
    pub fn has_password(&self) -> bool {
        self.password_hash.as_deref().is_some_and(|h| !h.is_empty())
    }

    /// Strip secret fields for any response body.
    pub fn sanitized(&self) -> UserResponse {
        UserResponse::from(self.clone())
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub password_hash: Option<String>,
}

/// User as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: i64,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<UserRecord> for UserResponse {
    fn from(u: UserRecord) -> Self {
        Self {
            id: u.id,
            email: u.email,
            first_name: u.first_name,
            last_name: u.last_name,
            created_at: u.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitized_user_has_no_password_field() {
        let user = UserRecord {
            id: 1,
            email: "ana@studio.test".to_string(),
            first_name: Some("Ana".to_string()),
            last_name: None,
            password_hash: Some("$argon2id$secret".to_string()),
            created_at: Utc::now(),
        };

        let json = serde_json::to_value(user.sanitized()).unwrap();
        assert_eq!(json["email"], "ana@studio.test");
        assert!(json.get("passwordHash").is_none());
        assert!(json.get("password_hash").is_none());
        assert!(!json.to_string().contains("argon2"));
    }

    #[test]
    fn test_user_type_parsing() {
        assert_eq!("Instructor".parse::<UserType>(), Ok(UserType::Instructor));
        assert_eq!("student".parse::<UserType>(), Ok(UserType::Student));
        assert!("owner".parse::<UserType>().is_err());
        assert_eq!(UserType::Admin.table(), "admins");
    }
}
