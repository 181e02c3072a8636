use axum::Json;
use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

use mediagate_core::MediaError;
use mediagate_crypto::SignerError;
use mediagate_gateway::GatewayError;

use crate::api::schemas::{ApiResponse, ErrorList};

/// Message returned with every 422 response.
pub const VALIDATION_MESSAGE: &str = "The given data was invalid.";

/// Errors that can occur when running the mediagate server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// A configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// An I/O error (e.g. binding the listener).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The media manager could not be assembled.
    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// The signing secret or algorithm was rejected.
    #[error("signer error: {0}")]
    Signer(#[from] SignerError),

    /// A domain failure from the media manager.
    #[error(transparent)]
    Media(#[from] MediaError),

    /// Request fields failed validation.
    #[error("The given data was invalid.")]
    Validation(ErrorList),

    /// The request body could not be parsed.
    #[error("{0}")]
    BadRequest(String),

    /// A multipart body could not be read.
    #[error(transparent)]
    Multipart(#[from] MultipartError),

    /// A response model could not be serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A response could not be assembled from stored metadata.
    #[error("http error: {0}")]
    Http(#[from] axum::http::Error),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Media(e) => {
                StatusCode::from_u16(e.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Multipart(e) => e.status(),
            Self::Config(_)
            | Self::Io(_)
            | Self::Gateway(_)
            | Self::Signer(_)
            | Self::Serialization(_)
            | Self::Http(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();

        let (message, errors) = match self {
            Self::Media(MediaError::Storage(detail)) => {
                error!(error = %detail, "storage backend failure");
                (MediaError::Storage(String::new()).to_string(), ErrorList::default())
            }
            Self::Media(e) => (e.to_string(), ErrorList::default()),
            Self::Validation(errors) => (VALIDATION_MESSAGE.to_owned(), errors),
            Self::BadRequest(msg) => (msg, ErrorList::default()),
            Self::Multipart(e) => (e.body_text(), ErrorList::default()),
            other => {
                error!(error = %other, "request failed");
                ("Internal server error.".to_owned(), ErrorList::default())
            }
        };

        let body = ApiResponse::error(status.as_u16(), message, errors);
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use mediagate_core::MediaId;

    use super::*;

    #[test]
    fn media_errors_keep_their_status() {
        let cases = [
            (ServerError::from(MediaError::MissingSignatureData), 400),
            (ServerError::from(MediaError::InvalidSignature), 403),
            (ServerError::from(MediaError::ExpiredLink), 403),
            (
                ServerError::from(MediaError::MediaNotFound { id: MediaId::Int(1) }),
                404,
            ),
            (ServerError::from(MediaError::FileMissingOnDisk), 404),
            (ServerError::from(MediaError::DeleteFailed), 409),
            (ServerError::from(MediaError::UploadFailed), 500),
        ];
        for (err, status) in cases {
            assert_eq!(err.status().as_u16(), status, "{err}");
        }
    }

    #[test]
    fn validation_is_unprocessable() {
        let mut errors = ErrorList::default();
        errors.add("file", "The file field is required.");
        let err = ServerError::Validation(errors);
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.to_string(), VALIDATION_MESSAGE);
    }

    #[tokio::test]
    async fn storage_detail_is_not_leaked() {
        let response =
            ServerError::from(MediaError::Storage("/srv/secret/path: EACCES".into())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(!text.contains("/srv/secret"), "{text}");
        assert!(text.contains("Storage error."));
    }

    #[tokio::test]
    async fn internal_errors_are_generic() {
        let response = ServerError::Config("hmac secret missing".into()).into_response();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["message"], "Internal server error.");
        assert_eq!(json["code"], 500);
        assert_eq!(json["result"], "error");
    }
}
