//! Student self-service.

use axum::{
    extract::{multipart::MultipartError, FromRequest, Multipart, Path, Request, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;
use std::path::Path as FsPath;

use crate::{
    auth::ResourceScope,
    dtos::clients::{ProfilePictureResponse, StudentResponse},
    middleware::CurrentUser,
    utils::uploads::{image_extension, save_profile_picture},
    AppState,
};

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(anyhow::anyhow!(err.body_text()))
    } else {
        AppError::BadRequest(anyhow::anyhow!(err.body_text()))
    }
}

pub async fn get_student(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(student_id): Path<String>,
) -> Result<Json<StudentResponse>, AppError> {
    state
        .authorize(
            &current.identity,
            ResourceScope::OwnRecord {
                target_id: student_id,
            },
        )
        .await?;

    let student = state
        .store
        .find_student(current.identity.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Student not found")))?;

    Ok(Json(StudentResponse {
        success: true,
        student,
    }))
}

/// The body is only parsed once the caller is known to own the record.
#[tracing::instrument(skip_all, fields(student_id = %student_id))]
pub async fn upload_profile_picture(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(student_id): Path<String>,
    request: Request,
) -> Result<Json<ProfilePictureResponse>, AppError> {
    state
        .authorize(
            &current.identity,
            ResourceScope::OwnRecord {
                target_id: student_id,
            },
        )
        .await?;

    let mut multipart = Multipart::from_request(request, &state)
        .await
        .map_err(|e| AppError::BadRequest(anyhow::anyhow!(e.body_text())))?;

    let max_bytes = state.config.uploads.max_bytes;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(multipart_error)?
    {
        if field.name() != Some("file") {
            continue;
        }

        let content_type = field.content_type().unwrap_or_default().to_string();
        let extension = image_extension(&content_type).ok_or_else(|| {
            AppError::BadRequest(anyhow::anyhow!("Only image uploads are allowed"))
        })?;

        let bytes = field.bytes().await.map_err(multipart_error)?;

        if bytes.is_empty() {
            return Err(AppError::BadRequest(anyhow::anyhow!("Uploaded file is empty")));
        }
        if bytes.len() > max_bytes {
            return Err(AppError::PayloadTooLarge(anyhow::anyhow!(
                "File exceeds the {} byte limit",
                max_bytes
            )));
        }

        let url = save_profile_picture(
            FsPath::new(&state.config.uploads.dir),
            current.identity.user_id,
            extension,
            &bytes,
        )
        .await?;

        state
            .store
            .set_student_profile_picture(current.identity.user_id, &url)
            .await?;

        tracing::info!(bytes = bytes.len(), "Profile picture stored");

        return Ok(Json(ProfilePictureResponse {
            success: true,
            profile_picture_url: url,
        }));
    }

    Err(AppError::BadRequest(anyhow::anyhow!("Missing file field")))
}
