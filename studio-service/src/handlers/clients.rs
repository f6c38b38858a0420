//! Studio client records, reachable by instructors of the owning studio.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use service_core::error::AppError;

use crate::{
    auth::ResourceScope,
    dtos::clients::{ClientListResponse, ClientResponse, StudioQuery},
    middleware::{require_param, CurrentUser},
    models::StudentProfileUpdate,
    utils::ValidatedJson,
    AppState,
};

fn parse_client_id(client_id: &str) -> Result<i64, AppError> {
    client_id
        .trim()
        .parse()
        .map_err(|_| AppError::NotFound(anyhow::anyhow!("Client not found")))
}

pub async fn list_clients(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(studio_id): Path<String>,
) -> Result<Json<ClientListResponse>, AppError> {
    let actor = state
        .authorize(
            &current.identity,
            ResourceScope::Studio {
                studio_id: Some(studio_id),
            },
        )
        .await?;

    let studio_id = actor.studio_id.ok_or_else(|| {
        AppError::InternalError(anyhow::anyhow!("Studio decision without a studio id"))
    })?;

    let clients = state.store.list_studio_clients(studio_id).await?;

    Ok(Json(ClientListResponse {
        success: true,
        clients,
    }))
}

pub async fn get_client(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(client_id): Path<String>,
    Query(query): Query<StudioQuery>,
) -> Result<Json<ClientResponse>, AppError> {
    let studio_id = require_param(query.studio_id, "studioId")?;

    let actor = state
        .authorize(
            &current.identity,
            ResourceScope::StudioClient {
                studio_id: Some(studio_id),
                client_id: client_id.clone(),
            },
        )
        .await?;

    let studio_id = actor.studio_id.ok_or_else(|| {
        AppError::InternalError(anyhow::anyhow!("Studio decision without a studio id"))
    })?;
    let client_id = parse_client_id(&client_id)?;

    let client = state
        .store
        .find_studio_client(studio_id, client_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Client not found")))?;

    Ok(Json(ClientResponse {
        success: true,
        client,
    }))
}

/// Access is checked, then the update runs as a separate store call.
/// A membership revoked in between is not re-checked.
#[tracing::instrument(skip_all, fields(client_id = %client_id))]
pub async fn update_client(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(client_id): Path<String>,
    Query(query): Query<StudioQuery>,
    ValidatedJson(update): ValidatedJson<StudentProfileUpdate>,
) -> Result<Json<ClientResponse>, AppError> {
    let studio_id = require_param(query.studio_id, "studioId")?;

    let actor = state
        .authorize(
            &current.identity,
            ResourceScope::StudioClient {
                studio_id: Some(studio_id),
                client_id: client_id.clone(),
            },
        )
        .await?;

    let studio_id = actor.studio_id.ok_or_else(|| {
        AppError::InternalError(anyhow::anyhow!("Studio decision without a studio id"))
    })?;
    let client_id = parse_client_id(&client_id)?;

    let not_found = || AppError::NotFound(anyhow::anyhow!("Client not found"));

    // The student must belong to this studio, not just exist.
    state
        .store
        .find_studio_client(studio_id, client_id)
        .await?
        .ok_or_else(not_found)?;

    if update.is_empty() {
        return Err(AppError::BadRequest(anyhow::anyhow!("No fields to update")));
    }

    state
        .store
        .update_student_profile(client_id, &update)
        .await?
        .ok_or_else(not_found)?;

    let client = state
        .store
        .find_studio_client(studio_id, client_id)
        .await?
        .ok_or_else(not_found)?;

    tracing::info!(
        instructor_id = current.identity.user_id,
        studio_id,
        "Client profile updated"
    );

    Ok(Json(ClientResponse {
        success: true,
        client,
    }))
}
