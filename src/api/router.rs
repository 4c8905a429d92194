//! API router. All routes are nested under `/api/`.
//!
//! Handlers use `State<AppContext>`; CORS is permissive because the
//! browser client is served from a separate origin in development.

use axum::routing::{delete, get, patch, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::api::endpoints;
use crate::api::types::AppContext;

pub fn api_router(ctx: AppContext) -> Router {
    let routes = Router::new()
        .route("/health", get(endpoints::health::check))
        .route("/owners", post(endpoints::owners::create))
        .route(
            "/owners/:id",
            get(endpoints::owners::detail).put(endpoints::owners::update),
        )
        .route(
            "/animals",
            get(endpoints::animals::list).post(endpoints::animals::create),
        )
        .route(
            "/animals/:id",
            get(endpoints::animals::detail)
                .patch(endpoints::animals::update)
                .delete(endpoints::animals::delete),
        )
        .route("/animals/:id/resync", post(endpoints::animals::resync))
        .route("/animals/:id/data", delete(endpoints::data::wipe_animal))
        .route("/lab-tests", post(endpoints::lab_tests::create))
        .route(
            "/lab-tests/:id",
            get(endpoints::lab_tests::detail)
                .patch(endpoints::lab_tests::update)
                .delete(endpoints::lab_tests::delete),
        )
        .route(
            "/lab-tests/animal/:animal_id",
            get(endpoints::lab_tests::list_by_animal),
        )
        .route("/health-metrics", post(endpoints::metrics::create))
        .route(
            "/health-metrics/:id",
            patch(endpoints::metrics::update).delete(endpoints::metrics::delete),
        )
        .route(
            "/health-metrics/animal/:animal_id",
            get(endpoints::metrics::list_by_animal),
        )
        .route("/ocr/analyze", post(endpoints::ocr::analyze))
        .route(
            "/chat/:animal_id",
            get(endpoints::chat::history)
                .post(endpoints::chat::send)
                .delete(endpoints::chat::clear),
        )
        .route("/data/clear-all", delete(endpoints::data::clear_all))
        .with_state(ctx);

    Router::new()
        .nest("/api", routes)
        .layer(CorsLayer::permissive())
}
