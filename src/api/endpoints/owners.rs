//! Owner profile endpoints.

use axum::extract::{Path, State};
use axum::Json;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::messages;
use crate::api::types::AppContext;
use crate::db::repository::owner;
use crate::models::{NewOwner, Owner, OwnerPatch};

/// `POST /api/owners` — register an owner profile.
pub async fn create(
    State(ctx): State<AppContext>,
    Json(new): Json<NewOwner>,
) -> Result<Json<Owner>, ApiError> {
    let conn = ctx.db.conn();
    if owner::get_owner_by_email(&conn, &new.email)?.is_some() {
        return Err(ApiError::BadRequest(messages::EMAIL_TAKEN.to_string()));
    }
    let created = owner::insert_owner(&conn, &new)?;
    Ok(Json(created))
}

/// `GET /api/owners/:id` — owner profile.
pub async fn detail(
    State(ctx): State<AppContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<Owner>, ApiError> {
    let conn = ctx.db.conn();
    let found = owner::get_owner(&conn, &id)?
        .ok_or_else(|| ApiError::NotFound("Owner not found".into()))?;
    Ok(Json(found))
}

/// `PUT /api/owners/:id` — partial profile update.
pub async fn update(
    State(ctx): State<AppContext>,
    Path(id): Path<Uuid>,
    Json(patch): Json<OwnerPatch>,
) -> Result<Json<Owner>, ApiError> {
    let conn = ctx.db.conn();
    if let Some(email) = &patch.email {
        if let Some(existing) = owner::get_owner_by_email(&conn, email)? {
            if existing.id != id {
                return Err(ApiError::BadRequest(messages::EMAIL_TAKEN.to_string()));
            }
        }
    }
    let updated = owner::update_owner(&conn, &id, &patch)?
        .ok_or_else(|| ApiError::NotFound("Owner not found".into()))?;
    Ok(Json(updated))
}
