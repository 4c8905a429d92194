//! Bulk data removal (settings screen).

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{owner_id_from_headers, AppContext};
use crate::db::repository::{animal, chat_message, health_metric, lab_test};

#[derive(Serialize)]
pub struct WipedResponse {
    pub success: bool,
}

/// `DELETE /api/animals/:id/data` — erase the animal's medical history
/// and knowledge base but keep the animal itself.
pub async fn wipe_animal(
    State(ctx): State<AppContext>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Json<WipedResponse>, ApiError> {
    let owner_id = owner_id_from_headers(&headers)?;
    let existing = {
        let conn = ctx.db.conn();
        animal::get_animal(&conn, &id)?
            .ok_or_else(|| ApiError::NotFound("Animal not found".into()))?
    };
    if existing.owner_id != owner_id {
        return Err(ApiError::Forbidden(
            "Not authorized to clear this animal's data".into(),
        ));
    }

    // The whole index goes away at once; per-document deletes would
    // just be slower with the same end state.
    if let Some(knowledge) = &ctx.knowledge {
        knowledge.remove_index_best_effort(&id).await;
    }
    if let Some(chat) = &ctx.chat {
        chat.forget_animal(&id).await;
    }

    {
        let conn = ctx.db.conn();
        // The stored handle goes even when the remote teardown above
        // was unavailable.
        animal::set_knowledge_base_id(&conn, &id, None)?;
        for test in lab_test::get_lab_tests_by_animal(&conn, &id)? {
            lab_test::delete_lab_test(&conn, &test.id)?;
        }
        health_metric::delete_standalone_metrics_by_animal(&conn, &id)?;
        chat_message::delete_chat_messages_by_animal(&conn, &id)?;
    }
    info!(animal_id = %id, "animal data wiped");
    Ok(Json(WipedResponse { success: true }))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearAllResponse {
    pub success: bool,
    pub deleted_animals: usize,
}

/// `DELETE /api/data/clear-all` — remove every animal belonging to the
/// calling owner, along with all derived data.
pub async fn clear_all(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
) -> Result<Json<ClearAllResponse>, ApiError> {
    let owner_id = owner_id_from_headers(&headers)?;
    let animals = {
        let conn = ctx.db.conn();
        animal::get_animals_by_owner(&conn, &owner_id)?
    };

    for item in &animals {
        if let Some(knowledge) = &ctx.knowledge {
            knowledge.remove_index_best_effort(&item.id).await;
        }
        if let Some(chat) = &ctx.chat {
            chat.forget_animal(&item.id).await;
        }
        let conn = ctx.db.conn();
        animal::delete_animal(&conn, &item.id)?;
    }

    info!(%owner_id, deleted = animals.len(), "all owner data cleared");
    Ok(Json(ClearAllResponse {
        success: true,
        deleted_animals: animals.len(),
    }))
}
