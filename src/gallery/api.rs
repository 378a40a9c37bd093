use async_trait::async_trait;
use log::{debug, warn};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

use super::models::{Asset, Health, PeopleList, Person, SearchPage, Suggestions};
use super::state::{Filters, MediaType};
use crate::thumbnail_types::ThumbnailSize;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },
    #[error("Unexpected response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Text shown to the user in the error state.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Network(_) => "Could not reach the server".to_string(),
            ApiError::Http { message, .. } => message.clone(),
            ApiError::Decode(_) => "The server sent an unexpected response".to_string(),
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Body of `POST /api/search`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub person_ids: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub taken_after: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub taken_before: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub media_type: Option<MediaType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub make: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    pub page: u32,
    pub size: u32,
}

impl SearchRequest {
    /// Date bounds are inclusive days, widened to the first and last
    /// millisecond in UTC.
    pub fn from_filters(filters: &Filters, page: u32, size: u32) -> Self {
        Self {
            query: Some(filters.query.trim().to_string()).filter(|q| !q.is_empty()),
            person_ids: Some(filters.person_ids.clone()).filter(|ids| !ids.is_empty()),
            taken_after: filters
                .date_from
                .as_ref()
                .map(|d| format!("{}T00:00:00.000Z", d)),
            taken_before: filters
                .date_to
                .as_ref()
                .map(|d| format!("{}T23:59:59.999Z", d)),
            media_type: Some(filters.media_type).filter(|t| *t != MediaType::All),
            make: filters.make.clone(),
            model: filters.model.clone(),
            country: filters.country.clone(),
            city: filters.city.clone(),
            page,
            size,
        }
    }
}

/// Everything the gallery needs from the proxy.
#[async_trait]
pub trait GalleryApi: Send + Sync {
    async fn search(&self, request: &SearchRequest) -> ApiResult<SearchPage>;
    async fn asset(&self, asset_id: &str) -> ApiResult<Asset>;
    async fn people(&self) -> ApiResult<Vec<Person>>;
    async fn suggestions(&self) -> ApiResult<Suggestions>;
    async fn health(&self) -> ApiResult<Health>;
}

/// Builds the media URLs the view layer hands to `<img>`/`<video>`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MediaUrls {
    base: String,
}

impl MediaUrls {
    /// `base` is the proxy origin; empty for same-origin relative URLs.
    pub fn new(base: &str) -> Self {
        Self {
            base: base.trim_end_matches('/').to_string(),
        }
    }

    pub fn thumbnail_url(&self, asset_id: &str, size: ThumbnailSize) -> String {
        format!("{}/api/assets/{}/thumbnail?size={}", self.base, asset_id, size)
    }

    pub fn original_url(&self, asset_id: &str) -> String {
        format!("{}/api/assets/{}/original", self.base, asset_id)
    }

    pub fn download_url(&self, asset_id: &str) -> String {
        format!("{}/api/assets/{}/download", self.base, asset_id)
    }

    pub fn video_url(&self, asset_id: &str) -> String {
        format!("{}/api/assets/{}/video/playback", self.base, asset_id)
    }

    pub fn person_thumbnail_url(&self, person_id: &str) -> String {
        format!("{}/api/people/{}/thumbnail", self.base, person_id)
    }
}

/// [`GalleryApi`] over HTTP against the proxy.
#[derive(Clone)]
pub struct HttpGalleryApi {
    http_client: Client,
    base_url: String,
}

impl HttpGalleryApi {
    pub fn new(base_url: &str) -> ApiResult<Self> {
        let http_client = Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        debug!("GET {}", path);
        let response = self.http_client.get(self.url(path)).send().await?;
        decode(response).await
    }
}

#[async_trait]
impl GalleryApi for HttpGalleryApi {
    async fn search(&self, request: &SearchRequest) -> ApiResult<SearchPage> {
        debug!("POST /api/search page={} size={}", request.page, request.size);
        let response = self
            .http_client
            .post(self.url("/api/search"))
            .json(request)
            .send()
            .await?;
        decode(response).await
    }

    async fn asset(&self, asset_id: &str) -> ApiResult<Asset> {
        self.get(&format!("/api/assets/{}", asset_id)).await
    }

    async fn people(&self) -> ApiResult<Vec<Person>> {
        let list: PeopleList = self.get("/api/people").await?;
        if let Some(error) = list.error {
            // The proxy degrades to an empty list; keep the panel usable.
            warn!("People list unavailable: {}", error);
        }
        Ok(list.people)
    }

    async fn suggestions(&self) -> ApiResult<Suggestions> {
        self.get("/api/search/suggestions").await
    }

    async fn health(&self) -> ApiResult<Health> {
        self.get("/api/health").await
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> ApiResult<T> {
    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        return Err(ApiError::Http {
            status: status.as_u16(),
            message: error_message(status, &text),
        });
    }

    serde_json::from_str(&text).map_err(|e| ApiError::Decode(e.to_string()))
}

/// Proxy errors are `{error, code, timestamp}`; `detail` and `message` cover
/// anything relayed verbatim from upstream.
fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(json) = serde_json::from_str::<Value>(body) {
        for field in ["error", "detail", "message"] {
            if let Some(Value::String(text)) = json.get(field) {
                return text.clone();
            }
        }
    }

    format!("HTTP {}", status.as_u16())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_search_request_omits_empty_filters() {
        let request = SearchRequest::from_filters(&Filters::default(), 1, 50);
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"page": 1, "size": 50})
        );
    }

    #[test]
    fn test_search_request_full() {
        let filters = Filters {
            query: " beach ".to_string(),
            person_ids: vec!["p1".to_string()],
            date_from: Some("2023-06-01".to_string()),
            date_to: Some("2023-06-30".to_string()),
            media_type: MediaType::Image,
            make: Some("Canon".to_string()),
            model: None,
            country: Some("France".to_string()),
            city: None,
        };

        let value = serde_json::to_value(SearchRequest::from_filters(&filters, 3, 20)).unwrap();
        assert_eq!(
            value,
            json!({
                "query": "beach",
                "personIds": ["p1"],
                "takenAfter": "2023-06-01T00:00:00.000Z",
                "takenBefore": "2023-06-30T23:59:59.999Z",
                "type": "IMAGE",
                "make": "Canon",
                "country": "France",
                "page": 3,
                "size": 20
            })
        );
    }

    #[test]
    fn test_media_urls() {
        let urls = MediaUrls::new("http://gallery.local/");
        assert_eq!(
            urls.thumbnail_url("a1", ThumbnailSize::Preview),
            "http://gallery.local/api/assets/a1/thumbnail?size=preview"
        );
        assert_eq!(
            urls.video_url("a1"),
            "http://gallery.local/api/assets/a1/video/playback"
        );

        let relative = MediaUrls::new("");
        assert_eq!(relative.download_url("a1"), "/api/assets/a1/download");
        assert_eq!(relative.original_url("a1"), "/api/assets/a1/original");
        assert_eq!(relative.person_thumbnail_url("p1"), "/api/people/p1/thumbnail");
    }

    #[test]
    fn test_error_message_prefers_proxy_error_field() {
        let body = r#"{"error": "Invalid asset_id: must be a valid UUID", "code": 400}"#;
        assert_eq!(
            error_message(StatusCode::BAD_REQUEST, body),
            "Invalid asset_id: must be a valid UUID"
        );
        assert_eq!(
            error_message(StatusCode::BAD_GATEWAY, r#"{"detail": "upstream down"}"#),
            "upstream down"
        );
        assert_eq!(error_message(StatusCode::BAD_GATEWAY, "<html>"), "HTTP 502");
    }

    #[test]
    fn test_user_message() {
        assert_eq!(
            ApiError::Network("connection refused".to_string()).user_message(),
            "Could not reach the server"
        );
        let http = ApiError::Http {
            status: 500,
            message: "Search failed".to_string(),
        };
        assert_eq!(http.user_message(), "Search failed");
    }
}
