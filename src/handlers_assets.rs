use serde::Deserialize;
use serde_json::Value;
use warp::http::header::{self, HeaderName, HeaderValue};
use warp::http::StatusCode;
use warp::{reject, Filter, Rejection, Reply};

use crate::image_compressor::limit_thumbnail;
use crate::immich_client::{ImmichClient, MediaHeaders, MediaResponse};
use crate::thumbnail_types::ThumbnailSize;
use crate::validation::validate_uuid;
use crate::warp_helpers::{with_client, ForbiddenError, UpstreamError, ValidationError};

#[derive(Debug, Deserialize)]
pub struct ThumbnailQuery {
    pub size: Option<String>,
}

fn asset_not_found(e: crate::immich_client::ImmichError) -> Rejection {
    log::debug!("Asset request failed: {}", e);
    reject::custom(UpstreamError::with_message(&e, "Asset not found"))
}

fn validated_asset_id(asset_id: &str) -> Result<(), Rejection> {
    validate_uuid(asset_id, "asset_id").map_err(reject::custom)
}

pub fn is_video(asset: &Value) -> bool {
    asset.get("type").and_then(Value::as_str) == Some("VIDEO")
}

/// Range forwarded to Immich for playback. Always ranged so the upstream
/// answers with partial content the browser can seek in.
pub fn playback_range(client_range: Option<&str>) -> &str {
    client_range.filter(|r| !r.trim().is_empty()).unwrap_or("bytes=0-")
}

pub fn attachment_disposition(media: &MediaHeaders, asset_id: &str) -> String {
    let filename = media
        .filename()
        .unwrap_or_else(|| format!("{}.bin", asset_id));
    format!("attachment; filename=\"{}\"", filename)
}

fn set_header(response: &mut warp::reply::Response, name: HeaderName, value: &str) {
    match HeaderValue::from_str(value) {
        Ok(value) => {
            response.headers_mut().insert(name, value);
        }
        Err(_) => log::warn!("Dropping unrepresentable {} header: {:?}", name, value),
    }
}

/// Relays an upstream media body chunk by chunk, so originals and videos are
/// never held in memory. Status, type and length come from the upstream.
pub fn media_reply(
    media: MediaResponse,
    default_content_type: &str,
    cache_control: Option<&str>,
) -> warp::reply::Response {
    let headers = media.headers.clone();
    let mut response = warp::reply::stream(media.into_stream()).into_response();

    // Upstream decides between 200 (full) and 206 (partial)
    *response.status_mut() =
        StatusCode::from_u16(headers.status.as_u16()).unwrap_or(StatusCode::OK);
    set_header(
        &mut response,
        header::CONTENT_TYPE,
        headers.content_type.as_deref().unwrap_or(default_content_type),
    );
    if let Some(length) = headers.content_length.as_deref() {
        set_header(&mut response, header::CONTENT_LENGTH, length);
    }
    if let Some(cache_control) = cache_control {
        set_header(&mut response, header::CACHE_CONTROL, cache_control);
    }

    response
}

pub async fn get_asset(asset_id: String, client: ImmichClient) -> Result<impl Reply, Rejection> {
    validated_asset_id(&asset_id)?;

    let asset = client.asset(&asset_id).await.map_err(asset_not_found)?;
    Ok(warp::reply::json(&asset))
}

pub async fn get_asset_thumbnail(
    asset_id: String,
    query: ThumbnailQuery,
    client: ImmichClient,
) -> Result<Box<dyn Reply>, Rejection> {
    validated_asset_id(&asset_id)?;

    let size = match query.size.as_deref() {
        None => ThumbnailSize::default(),
        Some(raw) => raw.parse::<ThumbnailSize>().map_err(|_| {
            reject::custom(ValidationError {
                message: "size must be one of thumbnail, preview".to_string(),
            })
        })?,
    };

    let media = client
        .asset_thumbnail(&asset_id, size)
        .await
        .map_err(|e| reject::custom(UpstreamError::with_message(&e, "Thumbnail not found")))?;

    let content_type = media
        .headers
        .content_type
        .clone()
        .unwrap_or_else(|| "image/jpeg".to_string());
    let body = media.bytes().await.map_err(|e| {
        reject::custom(UpstreamError::with_message(&e, "Thumbnail not found"))
    })?;

    let limited = limit_thumbnail(body, content_type, asset_id).await.map_err(|e| {
        log::error!("Thumbnail recompression failed: {:#}", e);
        reject::custom(UpstreamError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: "Failed to process thumbnail".to_string(),
        })
    })?;

    let reply = warp::reply::with_header(limited.body, "content-type", limited.content_type);
    let reply = warp::reply::with_header(reply, "cache-control", "public, max-age=86400");

    Ok(Box::new(reply))
}

pub async fn get_asset_original(
    asset_id: String,
    client: ImmichClient,
) -> Result<Box<dyn Reply>, Rejection> {
    validated_asset_id(&asset_id)?;

    let media = client
        .asset_original(&asset_id)
        .await
        .map_err(asset_not_found)?;

    Ok(Box::new(media_reply(
        media,
        "application/octet-stream",
        Some("public, max-age=3600"),
    )))
}

pub async fn download_asset(
    asset_id: String,
    client: ImmichClient,
) -> Result<Box<dyn Reply>, Rejection> {
    validated_asset_id(&asset_id)?;

    // Photos only: videos are viewable but not downloadable
    let asset = client.asset(&asset_id).await.map_err(asset_not_found)?;
    if is_video(&asset) {
        return Err(reject::custom(ForbiddenError {
            message: "Video downloads are disabled".to_string(),
        }));
    }

    let media = client
        .asset_original(&asset_id)
        .await
        .map_err(asset_not_found)?;

    let disposition = attachment_disposition(&media.headers, &asset_id);
    let mut response = media_reply(media, "application/octet-stream", Some("public, max-age=3600"));
    set_header(&mut response, header::CONTENT_DISPOSITION, &disposition);

    Ok(Box::new(response))
}

pub async fn get_video_playback(
    asset_id: String,
    range: Option<String>,
    client: ImmichClient,
) -> Result<Box<dyn Reply>, Rejection> {
    validated_asset_id(&asset_id)?;

    let media = client
        .video_playback(&asset_id, playback_range(range.as_deref()))
        .await
        .map_err(|e| reject::custom(UpstreamError::with_message(&e, "Video not found")))?;

    let accept_ranges = media
        .headers
        .accept_ranges
        .clone()
        .unwrap_or_else(|| "bytes".to_string());
    let content_range = media.headers.content_range.clone();

    let mut response = media_reply(media, "video/mp4", None);
    set_header(&mut response, header::ACCEPT_RANGES, &accept_ranges);
    if let Some(content_range) = content_range {
        set_header(&mut response, header::CONTENT_RANGE, &content_range);
    }

    Ok(Box::new(response))
}

pub fn build_asset_routes(
    client: ImmichClient,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let asset = warp::path!("api" / "assets" / String)
        .and(warp::get())
        .and(with_client(client.clone()))
        .and_then(get_asset);

    let thumbnail = warp::path!("api" / "assets" / String / "thumbnail")
        .and(warp::get())
        .and(warp::query::<ThumbnailQuery>())
        .and(with_client(client.clone()))
        .and_then(get_asset_thumbnail);

    let original = warp::path!("api" / "assets" / String / "original")
        .and(warp::get())
        .and(with_client(client.clone()))
        .and_then(get_asset_original);

    let download = warp::path!("api" / "assets" / String / "download")
        .and(warp::get())
        .and(with_client(client.clone()))
        .and_then(download_asset);

    let playback = warp::path!("api" / "assets" / String / "video" / "playback")
        .and(warp::get())
        .and(warp::header::optional::<String>("range"))
        .and(with_client(client))
        .and_then(get_video_playback);

    asset
        .or(thumbnail)
        .or(original)
        .or(download)
        .or(playback)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn media(disposition: Option<&str>) -> MediaHeaders {
        MediaHeaders {
            status: reqwest::StatusCode::OK,
            content_type: None,
            content_length: None,
            content_range: None,
            accept_ranges: None,
            content_disposition: disposition.map(|d| d.to_string()),
        }
    }

    fn upstream(builder: warp::http::response::Builder) -> MediaResponse {
        MediaResponse::new(reqwest::Response::from(builder.body("0123456789").unwrap()))
    }

    #[test]
    fn test_playback_range_defaults_to_open_range() {
        assert_eq!(playback_range(None), "bytes=0-");
        assert_eq!(playback_range(Some("")), "bytes=0-");
        assert_eq!(playback_range(Some("bytes=100-200")), "bytes=100-200");
    }

    #[test]
    fn test_is_video() {
        assert!(is_video(&json!({"type": "VIDEO"})));
        assert!(!is_video(&json!({"type": "IMAGE"})));
        assert!(!is_video(&json!({})));
    }

    #[test]
    fn test_attachment_disposition() {
        let id = "550e8400-e29b-41d4-a716-446655440000";
        assert_eq!(
            attachment_disposition(&media(Some("attachment; filename=\"beach.jpg\"")), id),
            "attachment; filename=\"beach.jpg\""
        );
        assert_eq!(
            attachment_disposition(&media(None), id),
            format!("attachment; filename=\"{}.bin\"", id)
        );
    }

    #[test]
    fn test_media_reply_relays_upstream_headers() {
        let response = media_reply(
            upstream(
                warp::http::Response::builder()
                    .status(206)
                    .header("content-type", "video/quicktime")
                    .header("content-length", "10"),
            ),
            "video/mp4",
            None,
        );

        assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
        assert_eq!(response.headers()["content-type"], "video/quicktime");
        assert_eq!(response.headers()["content-length"], "10");
        assert!(response.headers().get("cache-control").is_none());
    }

    #[test]
    fn test_media_reply_defaults_content_type() {
        let response = media_reply(
            upstream(warp::http::Response::builder()),
            "application/octet-stream",
            Some("public, max-age=3600"),
        );

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["content-type"], "application/octet-stream");
        assert_eq!(response.headers()["cache-control"], "public, max-age=3600");
        assert!(response.headers().get("content-length").is_none());
    }

    #[tokio::test]
    async fn test_invalid_asset_id_is_rejected_before_upstream() {
        let client = ImmichClient::new("http://127.0.0.1:9", "key").unwrap();
        let rejection = get_asset("../../etc/passwd".to_string(), client)
            .await
            .err()
            .unwrap();
        let validation = rejection.find::<ValidationError>().unwrap();
        assert_eq!(validation.message, "Invalid asset_id: must be a valid UUID");
    }
}
