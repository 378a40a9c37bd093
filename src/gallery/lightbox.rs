//! Full-screen viewer over the accumulated result list.
//!
//! The lightbox indexes into the gallery's items, so paging past the last
//! loaded asset pulls in the next page first. Images are shown at `preview`
//! size and videos through the playback endpoint; the original file is only
//! reachable through the download link.

use chrono::{DateTime, NaiveDateTime};
use log::warn;

use super::grid::Gallery;
use super::models::{Asset, ExifInfo};
use super::store::Store;
use crate::thumbnail_types::ThumbnailSize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LightboxState {
    #[default]
    Closed,
    Open { index: usize, show_info: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    ArrowLeft,
    ArrowRight,
    Escape,
    Char(char),
}

pub const INFO_KEY: char = 'i';

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LightboxMedia {
    Image { url: String },
    Video { url: String, poster: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InfoPanel {
    pub file_name: String,
    pub taken_at: Option<String>,
    pub camera: Option<String>,
    pub lens: Option<String>,
    pub exposure: Option<String>,
    pub dimensions: Option<String>,
    pub file_size: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub people: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LightboxView {
    pub asset_id: String,
    pub title: String,
    /// `"3 / 120"`, against the loaded count.
    pub position: String,
    pub media: LightboxMedia,
    /// Images only; video downloads are refused by the server.
    pub download_url: Option<String>,
    pub has_prev: bool,
    pub has_next: bool,
    pub info: Option<InfoPanel>,
}

#[derive(Clone)]
pub struct Lightbox {
    gallery: Gallery,
    state: Store<LightboxState>,
}

impl Lightbox {
    pub fn new(gallery: Gallery) -> Self {
        Self {
            gallery,
            state: Store::new(LightboxState::Closed),
        }
    }

    pub fn state(&self) -> LightboxState {
        *self.state.get()
    }

    pub fn store(&self) -> &Store<LightboxState> {
        &self.state
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state(), LightboxState::Open { .. })
    }

    fn item_count(&self) -> usize {
        self.gallery.store().get().items.len()
    }

    /// Opens at `index`; refused when it is outside the loaded list.
    pub fn open(&self, index: usize) -> bool {
        if index >= self.item_count() {
            return false;
        }
        self.state.set(|state| {
            *state = LightboxState::Open {
                index,
                show_info: false,
            }
        });
        true
    }

    pub fn close(&self) {
        self.state.set(|state| *state = LightboxState::Closed);
    }

    pub fn toggle_info(&self) {
        self.state.try_set(|state| match state {
            LightboxState::Open { show_info, .. } => {
                *show_info = !*show_info;
                Some(())
            }
            LightboxState::Closed => None,
        });
    }

    /// Replaces the open item with the full asset record, which carries the
    /// EXIF block and people that search results may omit.
    pub async fn load_details(&self) -> bool {
        let LightboxState::Open { index, .. } = self.state() else {
            return false;
        };
        let Some(asset_id) = self
            .gallery
            .store()
            .get()
            .items
            .get(index)
            .map(|a| a.id.clone())
        else {
            return false;
        };

        match self.gallery.api().asset(&asset_id).await {
            Ok(detail) => self
                .gallery
                .store()
                .try_set(|state| {
                    let slot = state.items.get_mut(index).filter(|a| a.id == asset_id)?;
                    *slot = detail;
                    Some(())
                })
                .is_some(),
            Err(e) => {
                warn!("Failed to load details for {}: {}", asset_id, e);
                false
            }
        }
    }

    /// Advances one item. At the last loaded item, fetches the next page
    /// first when one is available, or waits for the page already being
    /// fetched. Returns whether the index moved.
    pub async fn next(&self) -> bool {
        let LightboxState::Open { index, .. } = self.state() else {
            return false;
        };

        if index + 1 >= self.item_count() {
            if !self.gallery.store().get().has_more {
                return false;
            }
            if self.gallery.load_more().await == 0 {
                self.gallery.page_settled().await;
            }
        }

        let count = self.item_count();
        self.state
            .try_set(|state| match state {
                // Only move if nobody navigated or closed meanwhile
                LightboxState::Open { index: current, .. }
                    if *current == index && index + 1 < count =>
                {
                    *current += 1;
                    Some(())
                }
                _ => None,
            })
            .is_some()
    }

    pub fn prev(&self) -> bool {
        self.state
            .try_set(|state| match state {
                LightboxState::Open { index, .. } if *index > 0 => {
                    *index -= 1;
                    Some(())
                }
                _ => None,
            })
            .is_some()
    }

    /// Keyboard handling; ignored while closed. Returns whether the key was
    /// consumed.
    pub async fn handle_key(&self, key: Key) -> bool {
        if !self.is_open() {
            return false;
        }

        match key {
            Key::ArrowLeft => {
                if self.prev() {
                    self.refresh_info().await;
                }
            }
            Key::ArrowRight => {
                if self.next().await {
                    self.refresh_info().await;
                }
            }
            Key::Escape => self.close(),
            Key::Char(c) if c.eq_ignore_ascii_case(&INFO_KEY) => {
                self.toggle_info();
                self.refresh_info().await;
            }
            Key::Char(_) => return false,
        }
        true
    }

    /// Loads details for the current item while the info panel is shown.
    async fn refresh_info(&self) {
        if matches!(self.state(), LightboxState::Open { show_info: true, .. }) {
            self.load_details().await;
        }
    }

    /// `None` while closed or when the index no longer points into the list
    /// (e.g. the results were replaced underneath).
    pub fn view(&self) -> Option<LightboxView> {
        let LightboxState::Open { index, show_info } = self.state() else {
            return None;
        };
        let search = self.gallery.store().get();
        let asset = search.items.get(index)?;
        let urls = self.gallery.urls();

        let media = if asset.is_video() {
            LightboxMedia::Video {
                url: urls.video_url(&asset.id),
                poster: urls.thumbnail_url(&asset.id, ThumbnailSize::Preview),
            }
        } else {
            LightboxMedia::Image {
                url: urls.thumbnail_url(&asset.id, ThumbnailSize::Preview),
            }
        };

        Some(LightboxView {
            asset_id: asset.id.clone(),
            title: asset.display_name().to_string(),
            position: format!("{} / {}", index + 1, search.items.len()),
            media,
            download_url: (!asset.is_video()).then(|| urls.download_url(&asset.id)),
            has_prev: index > 0,
            has_next: index + 1 < search.items.len() || search.has_more,
            info: show_info.then(|| info_panel(asset)),
        })
    }
}

pub fn info_panel(asset: &Asset) -> InfoPanel {
    let exif = asset.exif_info.clone().unwrap_or_default();

    InfoPanel {
        file_name: asset.display_name().to_string(),
        taken_at: asset.taken_at().map(format_date),
        camera: camera_name(&exif),
        lens: exif.lens_model.clone(),
        exposure: exposure_summary(&exif),
        dimensions: match (exif.exif_image_width, exif.exif_image_height) {
            (Some(w), Some(h)) => Some(format!("{} x {}", w, h)),
            _ => None,
        },
        file_size: exif.file_size_in_byte.map(format_file_size),
        location: location(&exif),
        description: exif.description.clone().filter(|d| !d.trim().is_empty()),
        people: asset
            .people
            .iter()
            .filter(|p| p.name.as_deref().is_some_and(|n| !n.trim().is_empty()))
            .map(|p| p.display_name().to_string())
            .collect(),
    }
}

/// Human-readable capture date; unparseable input is shown as is.
pub fn format_date(raw: &str) -> String {
    const FORMAT: &str = "%B %-d, %Y %H:%M";

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.format(FORMAT).to_string();
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return dt.format(FORMAT).to_string();
    }
    raw.to_string()
}

pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];

    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut size = bytes as f64 / 1024.0;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", size, UNITS[unit])
}

/// Make and model, without repeating the make when the model already
/// starts with it ("Canon Canon EOS R5").
fn camera_name(exif: &ExifInfo) -> Option<String> {
    match (exif.make.as_deref(), exif.model.as_deref()) {
        (Some(make), Some(model)) if model.to_lowercase().starts_with(&make.to_lowercase()) => {
            Some(model.to_string())
        }
        (Some(make), Some(model)) => Some(format!("{} {}", make, model)),
        (Some(only), None) | (None, Some(only)) => Some(only.to_string()),
        (None, None) => None,
    }
}

fn exposure_summary(exif: &ExifInfo) -> Option<String> {
    let mut parts = Vec::new();
    if let Some(f) = exif.f_number {
        parts.push(format!("f/{}", f));
    }
    if let Some(t) = exif.exposure_time.as_deref() {
        parts.push(format!("{}s", t));
    }
    if let Some(mm) = exif.focal_length {
        parts.push(format!("{}mm", mm));
    }
    if let Some(iso) = exif.iso {
        parts.push(format!("ISO {}", iso));
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("  "))
    }
}

fn location(exif: &ExifInfo) -> Option<String> {
    let parts: Vec<&str> = [&exif.city, &exif.state, &exif.country]
        .into_iter()
        .filter_map(|p| p.as_deref())
        .filter(|p| !p.trim().is_empty())
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gallery::models::Person;

    #[test]
    fn test_format_file_size() {
        assert_eq!(format_file_size(512), "512 B");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(5 * 1024 * 1024), "5.0 MB");
    }

    #[test]
    fn test_format_date() {
        assert_eq!(format_date("2023-07-01T10:05:00.000Z"), "July 1, 2023 10:05");
        assert_eq!(format_date("2023-07-01T10:05:00"), "July 1, 2023 10:05");
        assert_eq!(format_date("sometime"), "sometime");
    }

    #[test]
    fn test_info_panel() {
        let asset = Asset {
            id: "a1".to_string(),
            original_file_name: "IMG_1.JPG".to_string(),
            exif_info: Some(ExifInfo {
                make: Some("Canon".to_string()),
                model: Some("Canon EOS R5".to_string()),
                f_number: Some(2.8),
                exposure_time: Some("1/250".to_string()),
                focal_length: Some(50.0),
                iso: Some(100.0),
                exif_image_width: Some(8192),
                exif_image_height: Some(5464),
                city: Some("Kyoto".to_string()),
                country: Some("Japan".to_string()),
                ..ExifInfo::default()
            }),
            people: vec![
                Person {
                    id: "p1".to_string(),
                    name: Some("Ada".to_string()),
                    ..Person::default()
                },
                Person {
                    id: "p2".to_string(),
                    ..Person::default()
                },
            ],
            ..Asset::default()
        };

        let info = info_panel(&asset);
        assert_eq!(info.camera.as_deref(), Some("Canon EOS R5"));
        assert_eq!(info.exposure.as_deref(), Some("f/2.8  1/250s  50mm  ISO 100"));
        assert_eq!(info.dimensions.as_deref(), Some("8192 x 5464"));
        assert_eq!(info.location.as_deref(), Some("Kyoto, Japan"));
        assert_eq!(info.people, vec!["Ada"]);
        assert!(info.taken_at.is_none());
    }

    #[test]
    fn test_camera_name_variants() {
        let exif = ExifInfo {
            make: Some("FUJIFILM".to_string()),
            model: Some("X100V".to_string()),
            ..ExifInfo::default()
        };
        assert_eq!(camera_name(&exif).as_deref(), Some("FUJIFILM X100V"));
        assert_eq!(camera_name(&ExifInfo::default()), None);
    }
}
