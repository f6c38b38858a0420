//! Approval of studio membership requests.

use axum::{
    extract::{Path, State},
    Json,
};
use service_core::error::{ApiMessage, AppError};

use crate::{
    auth::ResourceScope,
    dtos::clients::ApprovalRequest,
    middleware::CurrentUser,
    utils::ValidatedJson,
    AppState,
};

fn link_not_found() -> AppError {
    AppError::NotFound(anyhow::anyhow!("Relationship not found"))
}

fn approval_message(approved: bool) -> &'static str {
    if approved {
        "Request approved"
    } else {
        "Request rejected"
    }
}

/// Studio admins approve or reject instructors joining their studio.
#[tracing::instrument(skip_all, fields(link_id = %link_id))]
pub async fn set_instructor_approval(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(link_id): Path<String>,
    ValidatedJson(req): ValidatedJson<ApprovalRequest>,
) -> Result<Json<ApiMessage>, AppError> {
    state
        .authorize(
            &current.identity,
            ResourceScope::StudioInstructorLink {
                link_id: link_id.clone(),
            },
        )
        .await?;

    let id: i64 = link_id.trim().parse().map_err(|_| link_not_found())?;
    if !state
        .store
        .set_studio_instructor_approval(id, req.approved)
        .await?
    {
        return Err(link_not_found());
    }

    tracing::info!(approved = req.approved, "Instructor membership updated");
    Ok(Json(ApiMessage::ok(approval_message(req.approved))))
}

/// Approved instructors approve or reject students joining their studio.
#[tracing::instrument(skip_all, fields(link_id = %link_id))]
pub async fn set_student_approval(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(link_id): Path<String>,
    ValidatedJson(req): ValidatedJson<ApprovalRequest>,
) -> Result<Json<ApiMessage>, AppError> {
    state
        .authorize(
            &current.identity,
            ResourceScope::StudioStudentLink {
                link_id: link_id.clone(),
            },
        )
        .await?;

    let id: i64 = link_id.trim().parse().map_err(|_| link_not_found())?;
    if !state
        .store
        .set_studio_student_approval(id, req.approved)
        .await?
    {
        return Err(link_not_found());
    }

    tracing::info!(approved = req.approved, "Student membership updated");
    Ok(Json(ApiMessage::ok(approval_message(req.approved))))
}
