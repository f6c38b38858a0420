pub mod auth;
pub mod clients;

use serde::Serialize;

/// Edge-filter rejection body for the protected API namespace.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}
