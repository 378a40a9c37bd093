use log::{debug, warn};
use tokio::task::JoinHandle;

use super::debounce::Debouncer;
use super::grid::Gallery;
use super::models::{Person, Suggestions};
use super::state::{non_empty, Filters, MediaType, SearchState};
use super::store::Store;

/// One removable filter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FilterKind {
    Query,
    Person(String),
    /// Both bounds together.
    DateRange,
    MediaType,
    Make,
    Model,
    Country,
    City,
}

impl FilterKind {
    /// Resets just this field.
    pub fn clear(&self, filters: &mut Filters) {
        match self {
            FilterKind::Query => filters.query.clear(),
            FilterKind::Person(id) => filters.person_ids.retain(|p| p != id),
            FilterKind::DateRange => {
                filters.date_from = None;
                filters.date_to = None;
            }
            FilterKind::MediaType => filters.media_type = MediaType::All,
            FilterKind::Make => filters.make = None,
            FilterKind::Model => filters.model = None,
            FilterKind::Country => filters.country = None,
            FilterKind::City => filters.city = None,
        }
    }
}

/// A chip in the active-filter bar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveFilter {
    pub kind: FilterKind,
    pub label: String,
}

/// Choices offered by the panel's selectors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterOptions {
    pub people: Vec<Person>,
    pub suggestions: Suggestions,
}

/// User intents on the filter panel. Every applied change resets pagination
/// and reloads the first page.
#[derive(Clone)]
pub struct FilterPanel {
    gallery: Gallery,
    options: Store<FilterOptions>,
    debouncer: Debouncer,
}

impl FilterPanel {
    pub fn new(gallery: Gallery, debouncer: Debouncer) -> Self {
        Self {
            gallery,
            options: Store::new(FilterOptions::default()),
            debouncer,
        }
    }

    fn store(&self) -> &Store<SearchState> {
        self.gallery.store()
    }

    pub fn options(&self) -> &Store<FilterOptions> {
        &self.options
    }

    /// Fetches people and dropdown suggestions. Failures leave the lists
    /// empty.
    pub async fn load_options(&self) {
        let api = self.gallery.api();
        let (people, suggestions) = tokio::join!(api.people(), api.suggestions());

        let people = people.unwrap_or_else(|e| {
            warn!("Failed to load people: {}", e);
            Vec::new()
        });
        let suggestions = suggestions.unwrap_or_else(|e| {
            warn!("Failed to load suggestions: {}", e);
            Suggestions::default()
        });

        debug!("Filter options: {} people", people.len());
        self.options.set(|options| {
            options.people = people;
            options.suggestions = suggestions;
        });
    }

    /// Applies `change` to the filters, resets the results and reloads.
    pub async fn apply(&self, change: impl FnOnce(&mut Filters)) {
        self.store().set(|state| {
            change(&mut state.filters);
            state.reset_results();
        });
        self.gallery.load().await;
    }

    /// Debounced: only the last query typed within the window is applied.
    pub fn set_query(&self, text: &str) -> JoinHandle<bool> {
        let query = text.trim().to_string();
        let panel = self.clone();
        self.debouncer.call(move || async move {
            panel.apply(|filters| filters.query = query).await;
        })
    }

    pub async fn toggle_person(&self, person_id: &str) {
        self.apply(|filters| filters.toggle_person(person_id)).await;
    }

    pub async fn set_date_range(&self, from: Option<&str>, to: Option<&str>) {
        let (from, to) = (non_empty(from), non_empty(to));
        self.apply(|filters| {
            filters.date_from = from;
            filters.date_to = to;
        })
        .await;
    }

    pub async fn set_media_type(&self, media_type: MediaType) {
        self.apply(|filters| filters.media_type = media_type).await;
    }

    pub async fn set_camera(&self, make: Option<&str>, model: Option<&str>) {
        let (make, model) = (non_empty(make), non_empty(model));
        self.apply(|filters| {
            filters.make = make;
            filters.model = model;
        })
        .await;
    }

    pub async fn set_location(&self, country: Option<&str>, city: Option<&str>) {
        let (country, city) = (non_empty(country), non_empty(city));
        self.apply(|filters| {
            filters.country = country;
            filters.city = city;
        })
        .await;
    }

    pub async fn remove_filter(&self, kind: &FilterKind) {
        self.apply(|filters| kind.clear(filters)).await;
    }

    pub async fn clear_all(&self) {
        self.debouncer.cancel();
        self.apply(|filters| *filters = Filters::default()).await;
    }

    /// Chips for every filter currently set, in panel order.
    pub fn active_filters(&self) -> Vec<ActiveFilter> {
        let state = self.store().get();
        let options = self.options.get();
        active_filters(&state.filters, &options.people)
    }
}

pub fn active_filters(filters: &Filters, people: &[Person]) -> Vec<ActiveFilter> {
    let mut chips = Vec::new();
    let mut push = |kind: FilterKind, label: String| chips.push(ActiveFilter { kind, label });

    if !filters.query.is_empty() {
        push(FilterKind::Query, format!("\"{}\"", filters.query));
    }

    for id in &filters.person_ids {
        let name = people
            .iter()
            .find(|p| &p.id == id)
            .map(|p| p.display_name().to_string())
            .unwrap_or_else(|| "Unknown person".to_string());
        push(FilterKind::Person(id.clone()), name);
    }

    match (&filters.date_from, &filters.date_to) {
        (Some(from), Some(to)) => push(FilterKind::DateRange, format!("{} to {}", from, to)),
        (Some(from), None) => push(FilterKind::DateRange, format!("From {}", from)),
        (None, Some(to)) => push(FilterKind::DateRange, format!("Until {}", to)),
        (None, None) => {}
    }

    if filters.media_type != MediaType::All {
        push(FilterKind::MediaType, filters.media_type.label().to_string());
    }

    let labelled = [
        (FilterKind::Make, "Make", &filters.make),
        (FilterKind::Model, "Model", &filters.model),
        (FilterKind::Country, "Country", &filters.country),
        (FilterKind::City, "City", &filters.city),
    ];
    for (kind, name, value) in labelled {
        if let Some(value) = value {
            push(kind, format!("{}: {}", name, value));
        }
    }

    chips
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clear_date_range_removes_both_bounds() {
        let mut filters = Filters {
            date_from: Some("2023-01-01".to_string()),
            date_to: Some("2023-02-01".to_string()),
            make: Some("Nikon".to_string()),
            ..Filters::default()
        };
        FilterKind::DateRange.clear(&mut filters);
        assert_eq!(filters.date_from, None);
        assert_eq!(filters.date_to, None);
        assert_eq!(filters.make.as_deref(), Some("Nikon"));
    }

    #[test]
    fn test_clear_single_person() {
        let mut filters = Filters {
            person_ids: vec!["a".to_string(), "b".to_string()],
            ..Filters::default()
        };
        FilterKind::Person("a".to_string()).clear(&mut filters);
        assert_eq!(filters.person_ids, vec!["b"]);
    }

    #[test]
    fn test_active_filter_labels() {
        let filters = Filters {
            query: "dog".to_string(),
            person_ids: vec!["p1".to_string(), "p2".to_string()],
            date_from: Some("2022-05-01".to_string()),
            media_type: MediaType::Video,
            city: Some("Oslo".to_string()),
            ..Filters::default()
        };
        let people = vec![Person {
            id: "p1".to_string(),
            name: Some("Grace".to_string()),
            ..Person::default()
        }];

        let labels: Vec<String> = active_filters(&filters, &people)
            .into_iter()
            .map(|chip| chip.label)
            .collect();
        assert_eq!(
            labels,
            vec![
                "\"dog\"",
                "Grace",
                "Unknown person",
                "From 2022-05-01",
                "Videos",
                "City: Oslo"
            ]
        );
    }

    #[test]
    fn test_no_active_filters_by_default() {
        assert!(active_filters(&Filters::default(), &[]).is_empty());
    }
}
