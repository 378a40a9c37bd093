use serde::{Deserialize, Deserializer, Serialize};

/// Treats an explicit `null` like a missing field.
fn null_to_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AssetKind {
    #[default]
    Image,
    Video,
    Audio,
    #[serde(other)]
    Other,
}

/// EXIF block as Immich reports it. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExifInfo {
    pub make: Option<String>,
    pub model: Option<String>,
    pub lens_model: Option<String>,
    pub exposure_time: Option<String>,
    pub f_number: Option<f64>,
    pub iso: Option<f64>,
    pub focal_length: Option<f64>,
    pub exif_image_width: Option<u32>,
    pub exif_image_height: Option<u32>,
    pub file_size_in_byte: Option<u64>,
    pub description: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub date_time_original: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Person {
    #[serde(deserialize_with = "null_to_default")]
    pub id: String,
    pub name: Option<String>,
    pub thumbnail_path: Option<String>,
    pub is_hidden: bool,
}

impl Person {
    pub fn display_name(&self) -> &str {
        match self.name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => "Unnamed",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Asset {
    #[serde(deserialize_with = "null_to_default")]
    pub id: String,
    #[serde(deserialize_with = "null_to_default")]
    pub original_file_name: String,
    pub file_created_at: Option<String>,
    pub local_date_time: Option<String>,
    #[serde(rename = "type")]
    pub kind: AssetKind,
    pub duration: Option<String>,
    pub exif_info: Option<ExifInfo>,
    #[serde(deserialize_with = "null_to_default")]
    pub people: Vec<Person>,
}

impl Asset {
    pub fn is_video(&self) -> bool {
        self.kind == AssetKind::Video
    }

    pub fn display_name(&self) -> &str {
        if self.original_file_name.is_empty() {
            &self.id
        } else {
            &self.original_file_name
        }
    }

    /// Capture time: EXIF original time, then the local date, then file
    /// creation.
    pub fn taken_at(&self) -> Option<&str> {
        self.exif_info
            .as_ref()
            .and_then(|e| e.date_time_original.as_deref())
            .or(self.local_date_time.as_deref())
            .or(self.file_created_at.as_deref())
    }
}

/// One page of `POST /api/search`. Optional fields are absent when the proxy
/// (or an older one) does not report them.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchPage {
    #[serde(deserialize_with = "null_to_default")]
    pub items: Vec<Asset>,
    pub total: Option<u64>,
    pub page: Option<u32>,
    pub has_more: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PeopleList {
    #[serde(deserialize_with = "null_to_default")]
    pub people: Vec<Person>,
    pub total: u64,
    pub error: Option<String>,
}

/// Values offered by the filter dropdowns.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Suggestions {
    #[serde(deserialize_with = "null_to_default")]
    pub camera_make: Vec<String>,
    #[serde(deserialize_with = "null_to_default")]
    pub camera_model: Vec<String>,
    #[serde(deserialize_with = "null_to_default")]
    pub country: Vec<String>,
    #[serde(deserialize_with = "null_to_default")]
    pub city: Vec<String>,
    #[serde(deserialize_with = "null_to_default")]
    pub state: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Health {
    pub status: String,
    pub immich: String,
    pub timestamp: Option<String>,
}

impl Health {
    pub fn is_connected(&self) -> bool {
        self.immich == "connected"
    }
}
