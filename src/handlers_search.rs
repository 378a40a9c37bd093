use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use warp::{reject, Filter, Rejection, Reply};

use crate::cache::ResponseCache;
use crate::config::Config;
use crate::immich_client::ImmichClient;
use crate::search::{build_search_response, SearchFilters};
use crate::warp_helpers::{with_cache, with_client, with_config, UpstreamError, ValidationError};

const SUGGESTIONS_CACHE_KEY: &str = "search_suggestions";

/// Body limit for `POST /api/search`; filters are small.
const MAX_SEARCH_BODY_BYTES: u64 = 64 * 1024;

#[derive(Debug, Deserialize)]
pub struct AssetsQuery {
    pub page: Option<u32>,
    pub size: Option<u32>,
}

pub fn empty_suggestions() -> Value {
    json!({
        "cameraMake": [],
        "cameraModel": [],
        "country": [],
        "city": [],
        "state": []
    })
}

pub async fn search_assets(
    filters: SearchFilters,
    client: ImmichClient,
) -> Result<impl Reply, Rejection> {
    filters.validate().map_err(reject::custom)?;

    let payload = filters.to_metadata_payload();
    log::debug!("Search request - payload: {}", payload);

    let response = client.search_metadata(&payload).await.map_err(|e| {
        log::error!("Search error: {}", e);
        reject::custom(UpstreamError::from(e))
    })?;

    let page = build_search_response(&filters, &response);
    log::debug!(
        "Search returned {} items, total count: {}",
        page.items.len(),
        page.total
    );

    Ok(warp::reply::json(&page))
}

pub async fn search_suggestions(
    client: ImmichClient,
    cache: ResponseCache,
    config: Arc<Config>,
) -> Result<impl Reply, Rejection> {
    if let Some(cached) = cache.get(SUGGESTIONS_CACHE_KEY) {
        return Ok(warp::reply::json(&cached));
    }

    match client.search_suggestions().await {
        Ok(data) => {
            cache.set(
                SUGGESTIONS_CACHE_KEY,
                data.clone(),
                config.cache.suggestions_ttl,
            );
            Ok(warp::reply::json(&data))
        }
        Err(e) => {
            log::warn!("Search suggestions unavailable: {}", e);
            Ok(warp::reply::json(&empty_suggestions()))
        }
    }
}

/// Unfiltered paginated listing used for the initial gallery load.
pub async fn list_assets(query: AssetsQuery, client: ImmichClient) -> Result<impl Reply, Rejection> {
    let filters = SearchFilters {
        page: query.page.unwrap_or(1),
        size: query.size.unwrap_or(50),
        ..SearchFilters::default()
    };
    if filters.page < 1 || !(1..=100).contains(&filters.size) {
        return Err(reject::custom(ValidationError {
            message: "page must be >= 1 and size between 1 and 100".to_string(),
        }));
    }

    let response = client
        .search_metadata(&filters.to_metadata_payload())
        .await
        .map_err(|e| reject::custom(UpstreamError::with_message(&e, "Failed to get assets")))?;

    Ok(warp::reply::json(&build_search_response(&filters, &response)))
}

pub fn build_search_routes(
    client: ImmichClient,
    cache: ResponseCache,
    config: Arc<Config>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let search = warp::path!("api" / "search")
        .and(warp::post())
        .and(warp::body::content_length_limit(MAX_SEARCH_BODY_BYTES))
        .and(warp::body::json::<SearchFilters>())
        .and(with_client(client.clone()))
        .and_then(search_assets);

    let suggestions = warp::path!("api" / "search" / "suggestions")
        .and(warp::get())
        .and(with_client(client.clone()))
        .and(with_cache(cache))
        .and(with_config(config))
        .and_then(search_suggestions);

    let assets = warp::path!("api" / "assets")
        .and(warp::get())
        .and(warp::query::<AssetsQuery>())
        .and(with_client(client))
        .and_then(list_assets);

    search.or(suggestions).or(assets)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_suggestions_has_every_list() {
        let suggestions = empty_suggestions();
        for key in ["cameraMake", "cameraModel", "country", "city", "state"] {
            assert_eq!(suggestions[key], json!([]), "missing {}", key);
        }
    }
}
