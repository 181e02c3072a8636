pub mod health;
pub mod media;
pub mod openapi;
pub mod schemas;

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post, put};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use mediagate_gateway::MediaManager;

use crate::config::{RouteConfig, UploadConfig};

use self::openapi::ApiDoc;

/// Room left for multipart framing and the text fields on top of the file.
const MULTIPART_OVERHEAD: u64 = 64 * 1024;

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<MediaManager>,
    /// Upload validation rules.
    pub upload: Arc<UploadConfig>,
    /// Where the media routes are mounted.
    pub route: Arc<RouteConfig>,
}

impl AppState {
    pub fn new(manager: Arc<MediaManager>, upload: UploadConfig, route: RouteConfig) -> Self {
        Self {
            manager,
            upload: Arc::new(upload),
            route: Arc::new(route),
        }
    }
}

/// Build the Axum router with the media routes, health endpoints and
/// Swagger UI.
pub fn router(state: AppState) -> Router {
    let route = Arc::clone(&state.route);
    let body_limit = usize::try_from(state.upload.max_bytes().saturating_add(MULTIPART_OVERHEAD))
        .unwrap_or(usize::MAX);

    Router::new()
        .route("/health", get(health::health))
        .route("/metrics", get(health::metrics))
        .route(&route.secure_path(), get(media::serve))
        .route(
            &route.collection_path(),
            post(media::store).layer(DefaultBodyLimit::max(body_limit)),
        )
        .route(
            &route.item_path(&["{id}", "update-filename"]),
            put(media::update_filename),
        )
        .route(&route.item_path(&["{id}"]), delete(media::destroy))
        .route(&route.item_path(&["{id}", "url"]), post(media::generate_url))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
