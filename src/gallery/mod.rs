//! Client-side gallery model: shared search state, URL sync, pagination,
//! filters and the lightbox. No UI toolkit; front ends render the view
//! models and forward user intents.

pub mod api;
pub mod app;
pub mod debounce;
pub mod filter_panel;
pub mod grid;
pub mod lightbox;
pub mod models;
pub mod state;
pub mod store;
pub mod url_sync;

pub use api::{ApiError, GalleryApi, HttpGalleryApi, MediaUrls, SearchRequest};
pub use app::GalleryApp;
pub use filter_panel::{ActiveFilter, FilterKind, FilterPanel};
pub use grid::{Gallery, GalleryView, GridView, Tile};
pub use lightbox::{Key, Lightbox, LightboxMedia, LightboxState, LightboxView};
pub use state::{Filters, MediaType, SearchState};
pub use store::{Store, Subscription};
