use log::{debug, error, warn};
use std::sync::Arc;
use tokio::sync::Notify;

use super::api::{GalleryApi, MediaUrls, SearchRequest};
use super::models::{Asset, AssetKind};
use super::state::SearchState;
use super::store::Store;
use crate::thumbnail_types::ThumbnailSize;

/// Distance from the bottom of the grid, in pixels, at which the next page
/// is requested.
pub const LOAD_MORE_THRESHOLD_PX: f64 = 500.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Tile {
    pub id: String,
    pub name: String,
    pub kind: AssetKind,
    pub thumbnail_url: String,
    pub duration: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GridView {
    pub tiles: Vec<Tile>,
    pub result_count: String,
    pub show_load_more: bool,
    pub loading_more: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GalleryView {
    Loading,
    Error { message: String },
    Empty,
    Grid(GridView),
}

pub fn result_count_text(total: u64) -> String {
    if total == 1 {
        "1 item".to_string()
    } else {
        format!("{} items", total)
    }
}

/// Search and pagination over the shared [`SearchState`].
#[derive(Clone)]
pub struct Gallery {
    store: Store<SearchState>,
    api: Arc<dyn GalleryApi>,
    urls: MediaUrls,
}

impl Gallery {
    pub fn new(store: Store<SearchState>, api: Arc<dyn GalleryApi>, urls: MediaUrls) -> Self {
        Self { store, api, urls }
    }

    pub fn store(&self) -> &Store<SearchState> {
        &self.store
    }

    pub fn api(&self) -> Arc<dyn GalleryApi> {
        self.api.clone()
    }

    pub fn urls(&self) -> &MediaUrls {
        &self.urls
    }

    /// Fetches page 1 for the current filters and replaces the list.
    pub async fn load(&self) {
        let request = self.store.set(|state| {
            state.loading = true;
            state.error = None;
            SearchRequest::from_filters(&state.filters, 1, state.page_size)
        });

        match self.api.search(&request).await {
            Ok(page) => {
                debug!(
                    "Loaded {} items (total: {:?}, has_more: {:?})",
                    page.items.len(),
                    page.total,
                    page.has_more
                );
                self.store.set(|state| {
                    let loaded = page.items.len();
                    state.total = page.total.unwrap_or(loaded as u64);
                    // Only the server or an empty page ends pagination
                    state.has_more = loaded > 0 && page.has_more.unwrap_or(true);
                    state.items = page.items;
                    state.page = 1;
                    state.loading = false;
                });
            }
            Err(e) => {
                error!("Search failed: {}", e);
                self.store.set(|state| {
                    state.loading = false;
                    state.error = Some(e.user_message());
                });
            }
        }
    }

    /// Appends the next page. Skipped while another page or the initial load
    /// is in flight, or when nothing more is available. Returns the number of
    /// items appended.
    pub async fn load_more(&self) -> usize {
        let request = self.store.try_set(|state| {
            if state.loading_more || state.loading || !state.has_more {
                return None;
            }
            state.loading_more = true;
            Some(SearchRequest::from_filters(
                &state.filters,
                state.page + 1,
                state.page_size,
            ))
        });
        let Some(request) = request else {
            return 0;
        };

        match self.api.search(&request).await {
            Ok(page) => self.store.set(|state| {
                state.loading_more = false;
                let loaded = page.items.len();
                if loaded == 0 {
                    state.has_more = false;
                    return 0;
                }

                state.has_more = page.has_more.unwrap_or(true);
                state.items.extend(page.items);
                state.total = page.total.unwrap_or(state.items.len() as u64);
                state.page = request.page;
                loaded
            }),
            Err(e) => {
                warn!("Loading page {} failed: {}", request.page, e);
                self.store.set(|state| state.loading_more = false);
                0
            }
        }
    }

    /// Resolves once no page request is in flight, whichever caller started
    /// it and whether it succeeded or not.
    pub async fn page_settled(&self) {
        let settled = Arc::new(Notify::new());
        let waker = settled.clone();
        let subscription = self.store.subscribe(move |new, _| {
            if !new.loading_more {
                waker.notify_one();
            }
        });

        // A permit stored between subscribing and this check is kept
        if self.store.get().loading_more {
            settled.notified().await;
        }
        subscription.unsubscribe();
    }

    pub fn view(&self) -> GalleryView {
        let state = self.store.get();

        if let Some(message) = &state.error {
            return GalleryView::Error {
                message: message.clone(),
            };
        }
        if state.items.is_empty() {
            return if state.loading {
                GalleryView::Loading
            } else {
                GalleryView::Empty
            };
        }

        GalleryView::Grid(GridView {
            tiles: state.items.iter().map(|asset| self.tile(asset)).collect(),
            result_count: result_count_text(state.total),
            show_load_more: state.has_more,
            loading_more: state.loading_more,
        })
    }

    /// Infinite scroll trigger.
    pub fn should_load_more(&self, scroll_top: f64, viewport_height: f64, content_height: f64) -> bool {
        let state = self.store.get();
        let near_bottom = scroll_top + viewport_height >= content_height - LOAD_MORE_THRESHOLD_PX;
        near_bottom && state.has_more && !state.loading && !state.loading_more
    }

    fn tile(&self, asset: &Asset) -> Tile {
        Tile {
            id: asset.id.clone(),
            name: asset.display_name().to_string(),
            kind: asset.kind,
            thumbnail_url: self.urls.thumbnail_url(&asset.id, ThumbnailSize::Thumbnail),
            duration: asset.duration.clone().filter(|_| asset.is_video()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_count_text() {
        assert_eq!(result_count_text(0), "0 items");
        assert_eq!(result_count_text(1), "1 item");
        assert_eq!(result_count_text(2), "2 items");
    }
}
