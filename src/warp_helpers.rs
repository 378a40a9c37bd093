use crate::cache::ResponseCache;
use crate::config::Config;
use crate::immich_client::{ImmichClient, ImmichError};
use log::warn;
use serde::Serialize;
use std::convert::Infallible;
use std::sync::Arc;

use warp::http::StatusCode;
use warp::{reject, Filter, Rejection, Reply};

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
    pub timestamp: String,
}

/// Immich answered with an error status (or could not be reached).
#[derive(Debug)]
pub struct UpstreamError {
    pub status: StatusCode,
    pub message: String,
}

impl reject::Reject for UpstreamError {}

impl UpstreamError {
    /// Keeps the upstream status but replaces the detail with `message`.
    pub fn with_message(err: &ImmichError, message: &str) -> Self {
        Self {
            status: upstream_status(err),
            message: message.to_string(),
        }
    }
}

impl From<ImmichError> for UpstreamError {
    fn from(err: ImmichError) -> Self {
        Self {
            status: upstream_status(&err),
            message: err.detail(),
        }
    }
}

fn upstream_status(err: &ImmichError) -> StatusCode {
    StatusCode::from_u16(err.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY)
}

#[derive(Debug)]
pub struct ForbiddenError {
    pub message: String,
}

impl reject::Reject for ForbiddenError {}

#[derive(Debug)]
pub struct ValidationError {
    pub message: String,
}

impl reject::Reject for ValidationError {}

pub fn with_client(
    client: ImmichClient,
) -> impl Filter<Extract = (ImmichClient,), Error = Infallible> + Clone {
    warp::any().map(move || client.clone())
}

pub fn with_cache(
    cache: ResponseCache,
) -> impl Filter<Extract = (ResponseCache,), Error = Infallible> + Clone {
    warp::any().map(move || cache.clone())
}

pub fn with_config(
    config: Arc<Config>,
) -> impl Filter<Extract = (Arc<Config>,), Error = Infallible> + Clone {
    warp::any().map(move || config.clone())
}

pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let code;
    let message;
    let timestamp = chrono::Utc::now().to_rfc3339();

    if err.is_not_found() {
        code = StatusCode::NOT_FOUND;
        message = "Not Found".to_string();
    } else if let Some(upstream_error) = err.find::<UpstreamError>() {
        code = upstream_error.status;
        message = upstream_error.message.clone();
    } else if let Some(forbidden) = err.find::<ForbiddenError>() {
        code = StatusCode::FORBIDDEN;
        message = forbidden.message.clone();
    } else if let Some(validation_error) = err.find::<ValidationError>() {
        code = StatusCode::BAD_REQUEST;
        message = validation_error.message.clone();
    } else if let Some(body_error) = err.find::<warp::filters::body::BodyDeserializeError>() {
        code = StatusCode::UNPROCESSABLE_ENTITY;
        message = body_error.to_string();
    } else if let Some(query_error) = err.find::<warp::reject::InvalidQuery>() {
        code = StatusCode::BAD_REQUEST;
        message = query_error.to_string();
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        code = StatusCode::PAYLOAD_TOO_LARGE;
        message = "Payload too large".to_string();
    } else if err.find::<warp::reject::UnsupportedMediaType>().is_some() {
        code = StatusCode::UNSUPPORTED_MEDIA_TYPE;
        message = "Unsupported media type".to_string();
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        code = StatusCode::METHOD_NOT_ALLOWED;
        message = "Method not allowed".to_string();
    } else {
        log::error!("Unhandled rejection: {:?}", err);
        code = StatusCode::INTERNAL_SERVER_ERROR;
        message = "Internal server error".to_string();
    }

    let error_response = ErrorResponse {
        error: message,
        code: code.as_u16(),
        timestamp,
    };

    Ok(warp::reply::with_status(
        warp::reply::json(&error_response),
        code,
    ))
}

/// Configured origins that warp accepts: bare http(s) origins without a
/// path. A trailing slash is dropped; anything else is logged and skipped.
pub fn valid_origins(origins: &[String]) -> Vec<&str> {
    origins
        .iter()
        .map(|origin| origin.trim_end_matches('/'))
        .filter(|origin| match url::Url::parse(origin) {
            Ok(url)
                if matches!(url.scheme(), "http" | "https")
                    && url.origin().ascii_serialization() == *origin =>
            {
                true
            }
            _ => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                false
            }
        })
        .collect()
}

pub fn cors(origins: &[String]) -> warp::cors::Builder {
    warp::cors()
        .allow_origins(valid_origins(origins))
        .allow_credentials(true)
        .allow_headers(vec!["content-type", "authorization", "range"])
        .allow_methods(vec!["GET", "POST", "OPTIONS"])
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn status_of(rejection: Rejection) -> StatusCode {
        handle_rejection(rejection)
            .await
            .unwrap()
            .into_response()
            .status()
    }

    #[tokio::test]
    async fn test_rejection_status_codes() {
        assert_eq!(status_of(reject::not_found()).await, StatusCode::NOT_FOUND);
        assert_eq!(
            status_of(reject::custom(ValidationError {
                message: "bad".to_string()
            }))
            .await,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(reject::custom(ForbiddenError {
                message: "Video downloads are disabled".to_string()
            }))
            .await,
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_of(reject::custom(UpstreamError {
                status: StatusCode::SERVICE_UNAVAILABLE,
                message: "down".to_string()
            }))
            .await,
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_upstream_error_keeps_status() {
        let err = ImmichError::Status {
            status: reqwest::StatusCode::NOT_FOUND,
            detail: "no such asset".to_string(),
        };
        let upstream = UpstreamError::with_message(&err, "Asset not found");
        assert_eq!(upstream.status, StatusCode::NOT_FOUND);
        assert_eq!(upstream.message, "Asset not found");

        let upstream = UpstreamError::from(err);
        assert_eq!(upstream.message, "no such asset");
    }

    #[test]
    fn test_valid_origins() {
        let origins = vec![
            "http://localhost:3000".to_string(),
            "https://photos.example.com/".to_string(),
            "https://photos.example.com/album".to_string(),
            "ftp://files.example.com".to_string(),
            "*".to_string(),
            "https://gallery.example.com".to_string(),
        ];
        assert_eq!(
            valid_origins(&origins),
            vec![
                "http://localhost:3000",
                "https://photos.example.com",
                "https://gallery.example.com"
            ]
        );
    }
}
