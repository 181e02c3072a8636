use std::path::Path as FsPath;

use axum::Json;
use axum::body::Body;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Multipart, Path, Query, State};
use axum::http::header::{
    CACHE_CONTROL, CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE, ETAG, IF_NONE_MATCH,
};
use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;
use serde_json::Value;
use tracing::debug;

use mediagate_core::{Expiration, GenerateOptions, MediaAction, MediaId, MediaItem};
use mediagate_gateway::uploader::detect_mime;
use mediagate_gateway::{ServeStatus, ServedMedia, SignatureQuery, UploadedFile};

use super::AppState;
use super::schemas::{
    ApiResponse, ErrorList, MediaItemResource, UpdateFilenameRequest, UploadForm, UrlRequest,
    UrlResponse,
};
use crate::config::UploadConfig;
use crate::error::ServerError;

const UPLOAD_SUCCESS: &str = "File uploaded successfully.";
const FILENAME_UPDATED: &str = "Filename updated successfully.";
const DELETE_SUCCESS: &str = "Deleted.";

/// Longest accepted display name, in characters.
const MAX_NAME_CHARS: usize = 255;

/// `GET /{prefix}/{path}` -- validate a signed link and stream the file.
#[utoipa::path(
    get,
    path = "/api/media-items/secure",
    tag = "Media",
    summary = "Serve a file through a signed link",
    params(
        ("data" = String, Query, description = "Base64 capability payload, exactly as signed"),
        ("signature" = String, Query, description = "Lowercase hex HMAC of `data`"),
        ("If-None-Match" = Option<String>, Header, description = "ETag from an earlier response")
    ),
    responses(
        (status = 200, description = "File contents, streamed"),
        (status = 304, description = "Client copy is current"),
        (status = 400, description = "Missing or malformed link", body = ApiResponse),
        (status = 403, description = "Forged or expired link", body = ApiResponse),
        (status = 404, description = "Record or file not found", body = ApiResponse)
    )
)]
pub async fn serve(
    State(state): State<AppState>,
    headers: HeaderMap,
    query: Result<Query<SignatureQuery>, QueryRejection>,
) -> Result<Response, ServerError> {
    let query = query.map_or_else(
        |rejection| {
            debug!(error = %rejection, "unreadable capability query");
            SignatureQuery::default()
        },
        |Query(query)| query,
    );
    let if_none_match = headers.get(IF_NONE_MATCH).and_then(|v| v.to_str().ok());

    let served = state.manager.validate_and_serve(&query, if_none_match).await?;
    file_response(served)
}

fn file_response(served: ServedMedia) -> Result<Response, ServerError> {
    let status = match served.status {
        ServeStatus::Ok => StatusCode::OK,
        ServeStatus::NotModified => StatusCode::NOT_MODIFIED,
    };

    let headers = &served.headers;
    let mut builder = Response::builder()
        .status(status)
        .header(CONTENT_TYPE, headers.content_type.as_str())
        .header(CONTENT_LENGTH, headers.content_length)
        .header(CONTENT_DISPOSITION, headers.content_disposition.as_str());
    if let Some(cache_control) = &headers.cache_control {
        builder = builder.header(CACHE_CONTROL, cache_control.as_str());
    }
    if let Some(etag) = &headers.etag {
        builder = builder.header(ETAG, etag.as_str());
    }

    let body = served.body.map_or_else(Body::empty, Body::from_stream);
    Ok(builder.body(body)?)
}

/// `POST /{prefix}` -- upload a file and create its record.
#[utoipa::path(
    post,
    path = "/api/media-items",
    tag = "Media",
    summary = "Upload a file",
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Created; `model` is the media item resource", body = ApiResponse),
        (status = 422, description = "Validation failed", body = ApiResponse),
        (status = 500, description = "The file could not be stored", body = ApiResponse)
    )
)]
pub async fn store(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse>), ServerError> {
    let mut file = None;
    let mut custom_filename = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_owned();
        match name.as_str() {
            "file" => {
                let original_name = field.file_name().map(str::to_owned);
                let content_type = field.content_type().map(str::to_owned);
                let data = field.bytes().await?;
                file = original_name
                    .filter(|n| !n.is_empty())
                    .map(|original_name| UploadedFile {
                        original_name,
                        content_type,
                        data,
                    });
            }
            "custom_filename" => {
                custom_filename = Some(field.text().await?).filter(|t| !t.is_empty());
            }
            _ => {}
        }
    }

    let file = validate_upload(&state.upload, file, custom_filename.as_deref())?;
    let media = state
        .manager
        .upload_and_create(file, custom_filename.as_deref(), None)
        .await?;

    let model = serde_json::to_value(resource(&state, &media))?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(201, Some(UPLOAD_SUCCESS), model)),
    ))
}

/// `PUT /{prefix}/{id}/update-filename` -- rename a record, keeping its extension.
#[utoipa::path(
    put,
    path = "/api/media-items/{id}/update-filename",
    tag = "Media",
    summary = "Rename a media item",
    params(("id" = String, Path, description = "Media item id")),
    request_body = UpdateFilenameRequest,
    responses(
        (status = 200, description = "Renamed; `model` is the media item resource", body = ApiResponse),
        (status = 404, description = "Unknown id", body = ApiResponse),
        (status = 422, description = "Validation failed", body = ApiResponse)
    )
)]
pub async fn update_filename(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<UpdateFilenameRequest>, JsonRejection>,
) -> Result<Json<ApiResponse>, ServerError> {
    let Json(body) = body.map_err(|e| ServerError::BadRequest(e.body_text()))?;
    let new_name = validate_new_name(body.new_file_name.as_deref())?;

    let media = state.manager.update_filename(&media_id(&id), new_name).await?;
    let model = serde_json::to_value(resource(&state, &media))?;
    Ok(Json(ApiResponse::success(200, Some(FILENAME_UPDATED), model)))
}

/// `DELETE /{prefix}/{id}` -- remove the file and then its record.
#[utoipa::path(
    delete,
    path = "/api/media-items/{id}",
    tag = "Media",
    summary = "Delete a media item",
    params(("id" = String, Path, description = "Media item id")),
    responses(
        (status = 200, description = "Deleted", body = ApiResponse),
        (status = 404, description = "Unknown id", body = ApiResponse),
        (status = 409, description = "The stored file could not be deleted", body = ApiResponse)
    )
)]
pub async fn destroy(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse>, ServerError> {
    state.manager.delete(&media_id(&id)).await?;
    Ok(Json(ApiResponse::success(200, Some(DELETE_SUCCESS), Value::Null)))
}

/// `POST /{prefix}/{id}/url` -- issue a signed link for an existing record.
#[utoipa::path(
    post,
    path = "/api/media-items/{id}/url",
    tag = "Media",
    summary = "Issue a signed link",
    params(("id" = String, Path, description = "Media item id")),
    request_body = UrlRequest,
    responses(
        (status = 200, description = "`model` holds the url and its expiry", body = ApiResponse),
        (status = 404, description = "Unknown id", body = ApiResponse),
        (status = 422, description = "Validation failed", body = ApiResponse)
    )
)]
pub async fn generate_url(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<UrlRequest>, JsonRejection>,
) -> Result<Json<ApiResponse>, ServerError> {
    let Json(body) = body.map_err(|e| ServerError::BadRequest(e.body_text()))?;
    let (action, options) = url_options(body)?;

    let media = state.manager.find_media_item_or_fail(&media_id(&id)).await?;
    let link = state.manager.issue(&media, action, &options);
    let model = serde_json::to_value(UrlResponse {
        url: link.url(state.manager.url_generator().base_url()),
        expires_at: link.expires_at(),
    })?;
    Ok(Json(ApiResponse::success(200, None, model)))
}

fn media_id(raw: &str) -> MediaId {
    let Ok(id) = raw.parse::<MediaId>();
    id
}

fn resource(state: &AppState, media: &MediaItem) -> MediaItemResource {
    let link = state
        .manager
        .issue(media, MediaAction::View, &GenerateOptions::default());
    MediaItemResource::new(media, &link, state.manager.url_generator().base_url())
}

fn validate_upload(
    rules: &UploadConfig,
    file: Option<UploadedFile>,
    custom_filename: Option<&str>,
) -> Result<UploadedFile, ServerError> {
    let mut errors = ErrorList::default();

    match &file {
        None => errors.add("file", "The file field is required."),
        Some(file) => {
            if file.data.len() as u64 > rules.max_bytes() {
                errors.add(
                    "file",
                    format!(
                        "The file field must not be greater than {} kilobytes.",
                        rules.max_kb
                    ),
                );
            }
            if !rules.mimetypes.is_empty() {
                let mime = detect_mime(file.content_type.as_deref(), &file.original_name);
                let allowed = mime.is_some_and(|mime| {
                    rules.mimetypes.iter().any(|a| a.eq_ignore_ascii_case(&mime))
                });
                if !allowed {
                    errors.add("file", type_message(&rules.mimetypes));
                }
            }
            if !rules.mimes.is_empty() {
                let extension = FsPath::new(&file.original_name)
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .unwrap_or_default();
                if !rules.mimes.iter().any(|a| a.eq_ignore_ascii_case(extension)) {
                    errors.add("file", type_message(&rules.mimes));
                }
            }
        }
    }

    if let Some(name) = custom_filename
        && name.chars().count() > MAX_NAME_CHARS
    {
        errors.add(
            "custom_filename",
            format!("The custom filename field must not be greater than {MAX_NAME_CHARS} characters."),
        );
    }

    match file {
        Some(file) if errors.is_empty() => Ok(file),
        _ => Err(ServerError::Validation(errors)),
    }
}

fn type_message(allowed: &[String]) -> String {
    format!("The file field must be a file of type: {}.", allowed.join(", "))
}

fn validate_new_name(name: Option<&str>) -> Result<&str, ServerError> {
    let mut errors = ErrorList::default();
    match name {
        Some(name) if !name.trim().is_empty() => {
            if name.chars().count() <= MAX_NAME_CHARS {
                return Ok(name);
            }
            errors.add(
                "new_file_name",
                format!("The new file name field must not be greater than {MAX_NAME_CHARS} characters."),
            );
        }
        _ => errors.add("new_file_name", "The new file name field is required."),
    }
    Err(ServerError::Validation(errors))
}

fn url_options(body: UrlRequest) -> Result<(MediaAction, GenerateOptions), ServerError> {
    let mut errors = ErrorList::default();

    let action = match body.action.as_deref() {
        None => MediaAction::View,
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            errors.add("action", "The selected action is invalid.");
            MediaAction::View
        }),
    };

    let expiration = match body.expiration_minutes {
        None => Expiration::Default,
        Some(None) => Expiration::Never,
        Some(Some(minutes)) if minutes >= 1 => Expiration::Minutes(minutes),
        Some(Some(_)) => {
            errors.add(
                "expiration_minutes",
                "The expiration minutes field must be at least 1.",
            );
            Expiration::Default
        }
    };

    if !errors.is_empty() {
        return Err(ServerError::Validation(errors));
    }

    let options = GenerateOptions {
        expiration,
        metadata: body.metadata.unwrap_or_default(),
    };
    Ok((action, options))
}
