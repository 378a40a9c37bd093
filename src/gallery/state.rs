use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::models::Asset;

pub const DEFAULT_PAGE_SIZE: u32 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MediaType {
    #[default]
    All,
    Image,
    Video,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::All => "ALL",
            MediaType::Image => "IMAGE",
            MediaType::Video => "VIDEO",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MediaType::All => "All media",
            MediaType::Image => "Photos",
            MediaType::Video => "Videos",
        }
    }
}

impl FromStr for MediaType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ALL" => Ok(MediaType::All),
            "IMAGE" => Ok(MediaType::Image),
            "VIDEO" => Ok(MediaType::Video),
            _ => Err(()),
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The filter combination that determines a result set. Empty strings are
/// never stored; an unset field is `None` (or empty for `query`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filters {
    pub query: String,
    /// Ordered, without duplicates.
    pub person_ids: Vec<String>,
    /// Inclusive `YYYY-MM-DD` bounds.
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub media_type: MediaType,
    pub make: Option<String>,
    pub model: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
}

impl Filters {
    pub fn is_empty(&self) -> bool {
        *self == Filters::default()
    }

    /// Adds the person if absent, removes it otherwise.
    pub fn toggle_person(&mut self, person_id: &str) {
        if let Some(pos) = self.person_ids.iter().position(|id| id == person_id) {
            self.person_ids.remove(pos);
        } else {
            self.person_ids.push(person_id.to_string());
        }
    }
}

/// Turns blank input into `None`.
pub fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchState {
    pub filters: Filters,
    /// Last page merged into `items`; 0 before the first load.
    pub page: u32,
    pub page_size: u32,
    /// Server-reported total, or the number of loaded items when the server
    /// does not say.
    pub total: u64,
    /// Append-only across pagination; cleared whenever the filters change.
    pub items: Vec<Asset>,
    pub loading: bool,
    pub loading_more: bool,
    pub has_more: bool,
    pub error: Option<String>,
}

impl Default for SearchState {
    fn default() -> Self {
        Self {
            filters: Filters::default(),
            page: 0,
            page_size: DEFAULT_PAGE_SIZE,
            total: 0,
            items: Vec::new(),
            loading: false,
            loading_more: false,
            has_more: false,
            error: None,
        }
    }
}

impl SearchState {
    pub fn with_filters(filters: Filters) -> Self {
        Self {
            filters,
            ..Self::default()
        }
    }

    /// Back to page 1 with an empty result list; filters stay.
    pub fn reset_results(&mut self) {
        self.page = 1;
        self.total = 0;
        self.items.clear();
        self.has_more = false;
        self.error = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_type_round_trip() {
        for media_type in [MediaType::All, MediaType::Image, MediaType::Video] {
            assert_eq!(media_type.as_str().parse::<MediaType>(), Ok(media_type));
        }
        assert_eq!("image".parse::<MediaType>(), Err(()));
    }

    #[test]
    fn test_toggle_person_keeps_order_without_duplicates() {
        let mut filters = Filters::default();
        filters.toggle_person("a");
        filters.toggle_person("b");
        filters.toggle_person("c");
        filters.toggle_person("b");
        assert_eq!(filters.person_ids, vec!["a", "c"]);
        filters.toggle_person("b");
        assert_eq!(filters.person_ids, vec!["a", "c", "b"]);
    }

    #[test]
    fn test_non_empty() {
        assert_eq!(non_empty(Some("  Canon ")), Some("Canon".to_string()));
        assert_eq!(non_empty(Some("   ")), None);
        assert_eq!(non_empty(None), None);
    }

    #[test]
    fn test_reset_results_keeps_filters() {
        let mut state = SearchState::with_filters(Filters {
            query: "beach".to_string(),
            ..Filters::default()
        });
        state.page = 4;
        state.total = 200;
        state.items.push(Asset::default());
        state.has_more = true;
        state.error = Some("boom".to_string());

        state.reset_results();

        assert_eq!(state.page, 1);
        assert_eq!(state.total, 0);
        assert!(state.items.is_empty());
        assert!(!state.has_more);
        assert!(state.error.is_none());
        assert_eq!(state.filters.query, "beach");
    }
}
