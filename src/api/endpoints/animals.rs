//! Animal CRUD plus knowledge-base maintenance.

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{owner_id_from_headers, AppContext};
use crate::db::repository::{animal, owner};
use crate::models::{Animal, AnimalPatch, NewAnimal};

/// `GET /api/animals` — the calling owner's animals.
pub async fn list(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
) -> Result<Json<Vec<Animal>>, ApiError> {
    let owner_id = owner_id_from_headers(&headers)?;
    let conn = ctx.db.conn();
    Ok(Json(animal::get_animals_by_owner(&conn, &owner_id)?))
}

/// `GET /api/animals/:id`.
pub async fn detail(
    State(ctx): State<AppContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<Animal>, ApiError> {
    let conn = ctx.db.conn();
    let found = animal::get_animal(&conn, &id)?
        .ok_or_else(|| ApiError::NotFound("Animal not found".into()))?;
    Ok(Json(found))
}

/// `POST /api/animals` — create. The knowledge base is NOT created
/// here; it appears lazily with the first synced document.
pub async fn create(
    State(ctx): State<AppContext>,
    Json(new): Json<NewAnimal>,
) -> Result<Json<Animal>, ApiError> {
    let conn = ctx.db.conn();
    if owner::get_owner(&conn, &new.owner_id)?.is_none() {
        return Err(ApiError::NotFound("Owner not found".into()));
    }
    let created = animal::insert_animal(&conn, &new)?;
    info!(animal_id = %created.id, owner_id = %created.owner_id, "animal created");
    Ok(Json(created))
}

/// `PATCH /api/animals/:id`.
pub async fn update(
    State(ctx): State<AppContext>,
    Path(id): Path<Uuid>,
    Json(patch): Json<AnimalPatch>,
) -> Result<Json<Animal>, ApiError> {
    let conn = ctx.db.conn();
    let updated = animal::update_animal(&conn, &id, &patch)?
        .ok_or_else(|| ApiError::NotFound("Animal not found".into()))?;
    Ok(Json(updated))
}

#[derive(Serialize)]
pub struct DeletedResponse {
    pub success: bool,
}

/// `DELETE /api/animals/:id` — removes the animal with all of its data
/// (rows cascade) and tears down its external resources best-effort.
pub async fn delete(
    State(ctx): State<AppContext>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Json<DeletedResponse>, ApiError> {
    let owner_id = owner_id_from_headers(&headers)?;
    let existing = {
        let conn = ctx.db.conn();
        animal::get_animal(&conn, &id)?
            .ok_or_else(|| ApiError::NotFound("Animal not found".into()))?
    };
    if existing.owner_id != owner_id {
        return Err(ApiError::Forbidden(
            "Not authorized to delete this animal".into(),
        ));
    }

    if let Some(knowledge) = &ctx.knowledge {
        knowledge.remove_index_best_effort(&id).await;
    }
    if let Some(chat) = &ctx.chat {
        chat.forget_animal(&id).await;
    }

    let deleted = {
        let conn = ctx.db.conn();
        animal::delete_animal(&conn, &id)?
    };
    if !deleted {
        return Err(ApiError::Internal("animal row vanished mid-delete".into()));
    }
    info!(animal_id = %id, "animal deleted with all related data");
    Ok(Json(DeletedResponse { success: true }))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResyncResponse {
    pub synced: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// `POST /api/animals/:id/resync` — re-upload every lab test whose
/// index document is missing.
pub async fn resync(
    State(ctx): State<AppContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<ResyncResponse>, ApiError> {
    let knowledge = ctx
        .knowledge
        .as_ref()
        .ok_or_else(|| ApiError::from(crate::knowledge::SyncError::NotConfigured))?;
    {
        let conn = ctx.db.conn();
        animal::get_animal(&conn, &id)?
            .ok_or_else(|| ApiError::NotFound("Animal not found".into()))?;
    }
    let report = knowledge.reconcile_animal(&id).await?;
    Ok(Json(ResyncResponse {
        synced: report.synced,
        skipped: report.skipped,
        failed: report.failed,
    }))
}
