//! Shareable URLs: filter state <-> query string.
//!
//! | field         | key       |
//! |---------------|-----------|
//! | free text     | `q`       |
//! | people        | `people` (comma-joined ids) |
//! | date range    | `from`, `to` |
//! | media type    | `type` (omitted for ALL) |
//! | camera        | `make`, `model` |
//! | location      | `country`, `city` |
//!
//! Pagination and results are never part of the URL.

use url::form_urlencoded;

use super::state::{non_empty, Filters, MediaType};

pub const KEY_QUERY: &str = "q";
pub const KEY_PEOPLE: &str = "people";
pub const KEY_FROM: &str = "from";
pub const KEY_TO: &str = "to";
pub const KEY_TYPE: &str = "type";
pub const KEY_MAKE: &str = "make";
pub const KEY_MODEL: &str = "model";
pub const KEY_COUNTRY: &str = "country";
pub const KEY_CITY: &str = "city";

/// Query parameters for the set filters, in table order.
pub fn to_url_params(filters: &Filters) -> Vec<(&'static str, String)> {
    let mut params = Vec::new();

    if !filters.query.is_empty() {
        params.push((KEY_QUERY, filters.query.clone()));
    }
    if !filters.person_ids.is_empty() {
        params.push((KEY_PEOPLE, filters.person_ids.join(",")));
    }

    let optional = [
        (KEY_FROM, &filters.date_from),
        (KEY_TO, &filters.date_to),
    ];
    params.extend(
        optional
            .into_iter()
            .filter_map(|(key, value)| value.clone().map(|v| (key, v))),
    );

    if filters.media_type != MediaType::All {
        params.push((KEY_TYPE, filters.media_type.as_str().to_string()));
    }

    let optional = [
        (KEY_MAKE, &filters.make),
        (KEY_MODEL, &filters.model),
        (KEY_COUNTRY, &filters.country),
        (KEY_CITY, &filters.city),
    ];
    params.extend(
        optional
            .into_iter()
            .filter_map(|(key, value)| value.clone().map(|v| (key, v))),
    );

    params
}

/// Encoded query string with a leading `?`, or empty when no filter is set.
pub fn sync_to_url(filters: &Filters) -> String {
    let params = to_url_params(filters);
    if params.is_empty() {
        return String::new();
    }

    let encoded = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params.iter().map(|(k, v)| (*k, v.as_str())))
        .finish();
    format!("?{}", encoded)
}

/// Filters from a query string (with or without the leading `?`). Unknown
/// keys, blank values and unknown media types are ignored.
pub fn from_url_params(query: &str) -> Filters {
    let query = query.strip_prefix('?').unwrap_or(query);
    let mut filters = Filters::default();

    for (key, value) in form_urlencoded::parse(query.as_bytes()) {
        match key.as_ref() {
            KEY_QUERY => filters.query = value.trim().to_string(),
            KEY_PEOPLE => {
                filters.person_ids.clear();
                for id in value.split(',').map(str::trim).filter(|id| !id.is_empty()) {
                    if !filters.person_ids.iter().any(|existing| existing == id) {
                        filters.person_ids.push(id.to_string());
                    }
                }
            }
            KEY_FROM => filters.date_from = non_empty(Some(&value)),
            KEY_TO => filters.date_to = non_empty(Some(&value)),
            KEY_TYPE => filters.media_type = value.parse().unwrap_or_default(),
            KEY_MAKE => filters.make = non_empty(Some(&value)),
            KEY_MODEL => filters.model = non_empty(Some(&value)),
            KEY_COUNTRY => filters.country = non_empty(Some(&value)),
            KEY_CITY => filters.city = non_empty(Some(&value)),
            _ => {}
        }
    }

    filters
}
