use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::{Student, StudioClient};

/// `?studioId=` scoping parameter. Kept as a string so a missing value can be
/// told apart from a malformed one.
#[derive(Debug, Default, Deserialize)]
pub struct StudioQuery {
    #[serde(rename = "studioId")]
    pub studio_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ClientListResponse {
    pub success: bool,
    pub clients: Vec<StudioClient>,
}

#[derive(Debug, Serialize)]
pub struct ClientResponse {
    pub success: bool,
    pub client: StudioClient,
}

#[derive(Debug, Serialize)]
pub struct StudentResponse {
    pub success: bool,
    pub student: Student,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ApprovalRequest {
    pub approved: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePictureResponse {
    pub success: bool,
    pub profile_picture_url: String,
}
