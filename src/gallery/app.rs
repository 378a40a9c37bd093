use log::{info, warn};
use std::sync::Arc;

use super::api::{GalleryApi, MediaUrls};
use super::debounce::Debouncer;
use super::filter_panel::FilterPanel;
use super::grid::Gallery;
use super::lightbox::Lightbox;
use super::state::SearchState;
use super::store::{Store, Subscription};
use super::url_sync::{from_url_params, sync_to_url};

/// Owns the shared state and wires the gallery, filter panel and lightbox to
/// the same store and API.
#[derive(Clone)]
pub struct GalleryApp {
    store: Store<SearchState>,
    gallery: Gallery,
    filter_panel: FilterPanel,
    lightbox: Lightbox,
}

impl GalleryApp {
    /// `url_query` is the page's query string; it seeds the filters.
    pub fn new(api: Arc<dyn GalleryApi>, base_url: &str, url_query: &str) -> Self {
        Self::with_debouncer(api, base_url, url_query, Debouncer::default())
    }

    pub fn with_debouncer(
        api: Arc<dyn GalleryApi>,
        base_url: &str,
        url_query: &str,
        debouncer: Debouncer,
    ) -> Self {
        let store = Store::new(SearchState::with_filters(from_url_params(url_query)));
        let gallery = Gallery::new(store.clone(), api, MediaUrls::new(base_url));
        let filter_panel = FilterPanel::new(gallery.clone(), debouncer);
        let lightbox = Lightbox::new(gallery.clone());

        Self {
            store,
            gallery,
            filter_panel,
            lightbox,
        }
    }

    pub fn store(&self) -> &Store<SearchState> {
        &self.store
    }

    pub fn gallery(&self) -> &Gallery {
        &self.gallery
    }

    pub fn filter_panel(&self) -> &FilterPanel {
        &self.filter_panel
    }

    pub fn lightbox(&self) -> &Lightbox {
        &self.lightbox
    }

    /// Checks connectivity, then loads the filter options and the first
    /// page side by side. A failed health check is logged, not fatal.
    pub async fn start(&self) {
        match self.gallery.api().health().await {
            Ok(health) if health.is_connected() => info!("Immich connection: {}", health.immich),
            Ok(health) => warn!("Immich connection: {}", health.immich),
            Err(e) => warn!("Health check failed: {}", e),
        }

        tokio::join!(self.filter_panel.load_options(), self.gallery.load());
    }

    /// Query string for the current filters.
    pub fn url_query(&self) -> String {
        sync_to_url(&self.store.get().filters)
    }

    /// Calls `callback` with the new query string whenever the filters change.
    pub fn on_url_change<F>(&self, callback: F) -> Subscription<SearchState>
    where
        F: Fn(String) + Send + Sync + 'static,
    {
        self.store.subscribe(move |new, old| {
            if new.filters != old.filters {
                callback(sync_to_url(&new.filters));
            }
        })
    }

    /// History navigation: replaces the filters with the ones in `url_query`
    /// and reloads.
    pub async fn navigate(&self, url_query: &str) {
        let filters = from_url_params(url_query);
        self.lightbox.close();
        self.filter_panel.apply(|current| *current = filters).await;
    }
}
