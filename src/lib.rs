//! Read-only gallery for an Immich photo library.
//!
//! The crate has two halves:
//!
//! - a proxy service (`handlers_*`, [`immich_client`], [`search`]) that relays
//!   a restricted, read-only subset of the Immich API and injects the API key;
//! - the [`gallery`] core: the client-side state model behind the gallery
//!   grid, the filter panel and the lightbox, independent of any UI toolkit.

pub mod cache;
pub mod config;
pub mod gallery;
pub mod handlers_assets;
pub mod handlers_health;
pub mod handlers_people;
pub mod handlers_search;
pub mod image_compressor;
pub mod immich_client;
pub mod search;
pub mod thumbnail_types;
pub mod validation;
pub mod warp_helpers;
