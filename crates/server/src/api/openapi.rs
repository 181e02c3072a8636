#![allow(clippy::needless_for_each)]

use super::schemas::{
    ApiResponse, HealthResponse, MediaItemResource, MetricsResponse, ResultKind,
    UpdateFilenameRequest, UploadForm, UrlRequest, UrlResponse,
};

#[derive(utoipa::OpenApi)]
#[openapi(
    info(
        title = "mediagate API",
        version = "0.1.0",
        description = "Upload files, issue signed expiring links and serve files through them.",
        license(name = "Apache-2.0")
    ),
    tags(
        (name = "Health", description = "Service health and metrics"),
        (name = "Media", description = "Uploads, signed links and file serving")
    ),
    paths(
        super::health::health,
        super::health::metrics,
        super::media::serve,
        super::media::store,
        super::media::update_filename,
        super::media::destroy,
        super::media::generate_url,
    ),
    components(schemas(
        ApiResponse,
        ResultKind,
        MediaItemResource,
        UploadForm,
        UpdateFilenameRequest,
        UrlRequest,
        UrlResponse,
        HealthResponse,
        MetricsResponse,
    ))
)]
pub struct ApiDoc;
