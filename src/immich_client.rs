use bytes::Bytes;
use futures_util::Stream;
use log::debug;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client, Response, StatusCode};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

use crate::thumbnail_types::ThumbnailSize;

#[derive(Debug, thiserror::Error)]
pub enum ImmichError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Invalid API key header: {0}")]
    InvalidApiKey(#[from] header::InvalidHeaderValue),
    #[error("Immich returned {status}: {detail}")]
    Status { status: StatusCode, detail: String },
}

impl ImmichError {
    /// Upstream status to surface to our own callers; transport failures map
    /// to 502.
    pub fn status(&self) -> StatusCode {
        match self {
            ImmichError::Status { status, .. } => *status,
            ImmichError::Request(_) => StatusCode::BAD_GATEWAY,
            ImmichError::InvalidApiKey(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn detail(&self) -> String {
        match self {
            ImmichError::Status { detail, .. } => detail.clone(),
            other => other.to_string(),
        }
    }
}

pub type ImmichResult<T> = Result<T, ImmichError>;

/// Headers of an Immich media response that we relay to our own clients.
#[derive(Debug, Clone)]
pub struct MediaHeaders {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub content_length: Option<String>,
    pub content_range: Option<String>,
    pub accept_ranges: Option<String>,
    pub content_disposition: Option<String>,
}

impl MediaHeaders {
    fn from_response(response: &Response) -> Self {
        let headers = response.headers();
        let header_str = |name: header::HeaderName| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(|v| v.to_string())
        };

        Self {
            status: response.status(),
            content_type: header_str(header::CONTENT_TYPE),
            content_length: header_str(header::CONTENT_LENGTH),
            content_range: header_str(header::CONTENT_RANGE),
            accept_ranges: header_str(header::ACCEPT_RANGES),
            content_disposition: header_str(header::CONTENT_DISPOSITION),
        }
    }

    /// File name from `Content-Disposition`, if the upstream sent one.
    pub fn filename(&self) -> Option<String> {
        let disposition = self.content_disposition.as_deref()?;
        let (_, name) = disposition.rsplit_once("filename=")?;
        let name = name.trim().trim_matches('"');
        if name.is_empty() {
            None
        } else {
            Some(name.to_string())
        }
    }
}

/// Binary response from Immich whose body has not been read yet.
#[derive(Debug)]
pub struct MediaResponse {
    pub headers: MediaHeaders,
    response: Response,
}

impl MediaResponse {
    pub fn new(response: Response) -> Self {
        Self {
            headers: MediaHeaders::from_response(&response),
            response,
        }
    }

    /// Reads the whole body. Only for payloads we need to inspect, such as
    /// thumbnails that may be recompressed.
    pub async fn bytes(self) -> ImmichResult<Vec<u8>> {
        Ok(self.response.bytes().await?.to_vec())
    }

    /// The body as chunks in arrival order.
    pub fn into_stream(self) -> impl Stream<Item = reqwest::Result<Bytes>> + Send + Sync + 'static {
        self.response.bytes_stream()
    }
}

/// Thin async client for the Immich REST API. All requests carry the
/// configured `x-api-key`.
#[derive(Clone)]
pub struct ImmichClient {
    http_client: Client,
    base_url: String,
}

impl ImmichClient {
    pub fn new(base_url: &str, api_key: &str) -> ImmichResult<Self> {
        let mut headers = HeaderMap::new();
        let mut key = HeaderValue::from_str(api_key)?;
        key.set_sensitive(true);
        headers.insert("x-api-key", key);

        let http_client = Client::builder()
            .default_headers(headers)
            .connect_timeout(Duration::from_secs(30))
            // Originals and videos can be large
            .read_timeout(Duration::from_secs(120))
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn ping(&self) -> ImmichResult<()> {
        let response = self.http_client.get(self.url("/api/server/ping")).send().await?;
        check_status(response).await.map(|_| ())
    }

    pub async fn server_about(&self) -> ImmichResult<Value> {
        self.get_json("/api/server/about", &[]).await
    }

    pub async fn people(&self, with_hidden: bool) -> ImmichResult<Value> {
        self.get_json("/api/people", &[("withHidden", with_hidden.to_string())])
            .await
    }

    pub async fn person(&self, person_id: &str) -> ImmichResult<Value> {
        self.get_json(&format!("/api/people/{}", person_id), &[]).await
    }

    pub async fn person_thumbnail(&self, person_id: &str) -> ImmichResult<MediaResponse> {
        self.get_media(&format!("/api/people/{}/thumbnail", person_id), &[], None)
            .await
    }

    pub async fn search_metadata<T: Serialize + ?Sized>(&self, payload: &T) -> ImmichResult<Value> {
        let response = self
            .http_client
            .post(self.url("/api/search/metadata"))
            .json(payload)
            .send()
            .await?;
        Ok(check_status(response).await?.json().await?)
    }

    pub async fn search_suggestions(&self) -> ImmichResult<Value> {
        self.get_json("/api/search/suggestions", &[]).await
    }

    pub async fn asset(&self, asset_id: &str) -> ImmichResult<Value> {
        self.get_json(&format!("/api/assets/{}", asset_id), &[]).await
    }

    pub async fn asset_thumbnail(
        &self,
        asset_id: &str,
        size: ThumbnailSize,
    ) -> ImmichResult<MediaResponse> {
        self.get_media(
            &format!("/api/assets/{}/thumbnail", asset_id),
            &[("size", size.to_string())],
            None,
        )
        .await
    }

    pub async fn asset_original(&self, asset_id: &str) -> ImmichResult<MediaResponse> {
        self.get_media(&format!("/api/assets/{}/original", asset_id), &[], None)
            .await
    }

    pub async fn video_playback(&self, asset_id: &str, range: &str) -> ImmichResult<MediaResponse> {
        self.get_media(
            &format!("/api/assets/{}/video/playback", asset_id),
            &[],
            Some(range),
        )
        .await
    }

    pub async fn statistics(&self) -> ImmichResult<Value> {
        self.get_json("/api/assets/statistics", &[]).await
    }

    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> ImmichResult<Value> {
        debug!("GET {}{}", self.base_url, path);
        let response = self
            .http_client
            .get(self.url(path))
            .query(query)
            .send()
            .await?;
        Ok(check_status(response).await?.json().await?)
    }

    async fn get_media(
        &self,
        path: &str,
        query: &[(&str, String)],
        range: Option<&str>,
    ) -> ImmichResult<MediaResponse> {
        debug!("GET {}{} (range: {:?})", self.base_url, path, range);
        let mut request = self.http_client.get(self.url(path)).query(query);
        if let Some(range) = range {
            request = request.header(header::RANGE, range);
        }

        let response = check_status(request.send().await?).await?;
        Ok(MediaResponse::new(response))
    }
}

async fn check_status(response: Response) -> ImmichResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    Err(ImmichError::Status {
        status,
        detail: error_detail(status, &text),
    })
}

/// Picks the most useful error text from an upstream error body: the JSON
/// `message` or `detail` field, the raw body, or the bare status code.
pub fn error_detail(status: StatusCode, body: &str) -> String {
    if let Ok(json) = serde_json::from_str::<Value>(body) {
        for field in ["message", "detail"] {
            match json.get(field) {
                Some(Value::String(s)) => return s.clone(),
                Some(Value::Null) | None => {}
                Some(other) => return other.to_string(),
            }
        }
        return json.to_string();
    }

    if body.trim().is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        body.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_detail_prefers_message() {
        let detail = error_detail(
            StatusCode::BAD_REQUEST,
            r#"{"message": "size must not be greater than 1000", "detail": "x"}"#,
        );
        assert_eq!(detail, "size must not be greater than 1000");
    }

    #[test]
    fn test_error_detail_falls_back_to_detail_then_json() {
        assert_eq!(
            error_detail(StatusCode::NOT_FOUND, r#"{"detail": "gone"}"#),
            "gone"
        );
        assert_eq!(
            error_detail(StatusCode::NOT_FOUND, r#"{"error": "gone"}"#),
            r#"{"error":"gone"}"#
        );
    }

    #[test]
    fn test_error_detail_text_and_empty() {
        assert_eq!(
            error_detail(StatusCode::BAD_GATEWAY, "upstream down"),
            "upstream down"
        );
        assert_eq!(error_detail(StatusCode::BAD_GATEWAY, ""), "HTTP 502");
    }

    #[test]
    fn test_error_status_mapping() {
        let err = ImmichError::Status {
            status: StatusCode::NOT_FOUND,
            detail: "Asset not found".to_string(),
        };
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.detail(), "Asset not found");
    }

    fn upstream(builder: warp::http::response::Builder, body: &'static str) -> MediaResponse {
        MediaResponse::new(Response::from(builder.body(body).unwrap()))
    }

    #[test]
    fn test_media_headers_are_captured() {
        let media = upstream(
            warp::http::Response::builder()
                .status(206)
                .header("content-type", "video/mp4")
                .header("content-length", "5")
                .header("content-range", "bytes 0-4/100")
                .header("accept-ranges", "bytes")
                .header("content-disposition", "attachment; filename=\"IMG_0001.JPG\""),
            "hello",
        );

        assert_eq!(media.headers.status, StatusCode::PARTIAL_CONTENT);
        assert_eq!(media.headers.content_type.as_deref(), Some("video/mp4"));
        assert_eq!(media.headers.content_length.as_deref(), Some("5"));
        assert_eq!(media.headers.content_range.as_deref(), Some("bytes 0-4/100"));
        assert_eq!(media.headers.filename(), Some("IMG_0001.JPG".to_string()));
    }

    #[test]
    fn test_media_filename_missing() {
        let media = upstream(
            warp::http::Response::builder().header("content-disposition", "inline"),
            "",
        );
        assert_eq!(media.headers.filename(), None);
    }

    #[tokio::test]
    async fn test_media_body_streams_and_buffers() {
        use futures_util::TryStreamExt;

        let media = upstream(warp::http::Response::builder(), "streamed body");
        let chunks: Vec<Bytes> = media.into_stream().try_collect().await.unwrap();
        assert_eq!(chunks.concat(), b"streamed body");

        let media = upstream(warp::http::Response::builder(), "buffered");
        assert_eq!(media.bytes().await.unwrap(), b"buffered");
    }

    #[test]
    fn test_client_trims_base_url() {
        let client = ImmichClient::new("http://immich.local:2283/", "key").unwrap();
        assert_eq!(client.base_url(), "http://immich.local:2283");
    }
}
