use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::validation::{is_iso_date_prefix, is_valid_uuid};
use crate::warp_helpers::ValidationError;

const MAX_QUERY_LEN: usize = 500;
const MAX_FIELD_LEN: usize = 100;
const MAX_PAGE: u32 = 1000;
const MAX_PAGE_SIZE: u32 = 100;

/// Search request accepted by `POST /api/search`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchFilters {
    pub query: Option<String>,
    pub person_ids: Option<Vec<String>>,
    pub make: Option<String>,
    pub model: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub taken_after: Option<String>,
    pub taken_before: Option<String>,
    #[serde(rename = "type")]
    pub asset_type: Option<String>,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_size")]
    pub size: u32,
}

fn default_page() -> u32 {
    1
}

fn default_size() -> u32 {
    50
}

/// Paginated response wrapper returned by the search and listing endpoints.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedResponse {
    pub items: Vec<Value>,
    pub total: u64,
    pub page: u32,
    pub size: u32,
    pub has_more: bool,
}

impl SearchFilters {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_len("query", self.query.as_deref(), MAX_QUERY_LEN)?;
        for (name, value) in [
            ("make", &self.make),
            ("model", &self.model),
            ("country", &self.country),
            ("city", &self.city),
            ("state", &self.state),
        ] {
            check_len(name, value.as_deref(), MAX_FIELD_LEN)?;
        }

        for (name, value) in [
            ("takenAfter", &self.taken_after),
            ("takenBefore", &self.taken_before),
        ] {
            if let Some(date) = value.as_deref() {
                if !is_iso_date_prefix(date) {
                    return Err(invalid(format!("{} must start with YYYY-MM-DD", name)));
                }
            }
        }

        if let Some(kind) = self.asset_type.as_deref() {
            if !matches!(kind, "IMAGE" | "VIDEO" | "ALL") {
                return Err(invalid("type must be one of IMAGE, VIDEO, ALL".to_string()));
            }
        }

        if let Some(person_ids) = &self.person_ids {
            if let Some(bad) = person_ids.iter().find(|id| !is_valid_uuid(id)) {
                return Err(invalid(format!("Invalid person ID: {}", bad)));
            }
        }

        if !(1..=MAX_PAGE).contains(&self.page) {
            return Err(invalid(format!("page must be between 1 and {}", MAX_PAGE)));
        }
        if !(1..=MAX_PAGE_SIZE).contains(&self.size) {
            return Err(invalid(format!(
                "size must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }

        Ok(())
    }

    /// Builds the body for Immich `POST /api/search/metadata`. Only non-empty
    /// metadata filters are forwarded: the free-text query is not understood
    /// by that endpoint and `type=ALL` is the same as no type.
    pub fn to_metadata_payload(&self) -> Value {
        let mut payload = Map::new();
        payload.insert("page".to_string(), Value::from(self.page));
        payload.insert("size".to_string(), Value::from(self.size));

        if let Some(person_ids) = self.person_ids.as_ref().filter(|ids| !ids.is_empty()) {
            payload.insert(
                "personIds".to_string(),
                Value::from(person_ids.clone()),
            );
        }

        for (key, value) in [
            ("make", &self.make),
            ("model", &self.model),
            ("country", &self.country),
            ("city", &self.city),
            ("state", &self.state),
            ("takenAfter", &self.taken_after),
            ("takenBefore", &self.taken_before),
        ] {
            if let Some(v) = value.as_deref().filter(|v| !v.is_empty()) {
                payload.insert(key.to_string(), Value::from(v));
            }
        }

        if let Some(kind) = self.asset_type.as_deref().filter(|k| *k != "ALL") {
            payload.insert("type".to_string(), Value::from(kind));
        }

        Value::Object(payload)
    }

    pub fn text_query(&self) -> Option<&str> {
        self.query.as_deref().filter(|q| !q.is_empty())
    }
}

fn check_len(name: &str, value: Option<&str>, max: usize) -> Result<(), ValidationError> {
    match value {
        Some(v) if v.chars().count() > max => Err(invalid(format!(
            "{} must be at most {} characters",
            name, max
        ))),
        _ => Ok(()),
    }
}

fn invalid(message: String) -> ValidationError {
    ValidationError { message }
}

/// Extracts `(items, count)` from an Immich metadata search response
/// (`{"assets": {"items": [...], "count": n}}`). Missing pieces default.
pub fn extract_assets(response: &Value) -> (Vec<Value>, u64) {
    let assets = response.get("assets");
    let items = assets
        .and_then(|a| a.get("items"))
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    let total = assets
        .and_then(|a| a.get("count"))
        .and_then(Value::as_u64)
        .unwrap_or(items.len() as u64);
    (items, total)
}

/// Case-insensitive substring match on file name, EXIF description, camera
/// model and make.
pub fn matches_text_query(item: &Value, query_lower: &str) -> bool {
    let field = |value: Option<&Value>| {
        value
            .and_then(Value::as_str)
            .map(|s| s.to_lowercase().contains(query_lower))
            .unwrap_or(false)
    };
    let exif = item.get("exifInfo");

    field(item.get("originalFileName"))
        || field(exif.and_then(|e| e.get("description")))
        || field(exif.and_then(|e| e.get("model")))
        || field(exif.and_then(|e| e.get("make")))
}

/// Turns an upstream page into our paginated response, applying the text
/// query client-side since Immich's metadata search ignores it.
pub fn build_search_response(filters: &SearchFilters, response: &Value) -> PaginatedResponse {
    let (mut items, mut total) = extract_assets(response);

    if let Some(query) = filters.text_query() {
        if !items.is_empty() {
            let query_lower = query.to_lowercase();
            items.retain(|item| matches_text_query(item, &query_lower));
            total = items.len() as u64;
            items.truncate(filters.size as usize);
        }
    }

    let has_more = items.len() >= filters.size as usize;

    PaginatedResponse {
        items,
        total,
        page: filters.page,
        size: filters.size,
        has_more,
    }
}
