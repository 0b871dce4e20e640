//! Place search orchestration shared by the HTTP handlers.
//!
//! Wraps a `PlaceProvider` with the fail-to-empty policy: provider errors
//! are logged and degrade to "no places", never to an error response.
//! `search_outcome` keeps the distinction between an empty result and an
//! unavailable provider for callers that want it.

use crate::circuit_breaker::{create_provider_circuit_breaker, ProviderCircuitBreaker};
use crate::errors::AppError;
use crate::models::{AggregatePlaces, PlaceRecord, SearchOutcome};
use crate::services::PlaceProvider;
use failsafe::futures::CircuitBreaker;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

/// Cities listed on the map view.
pub const MAP_CITIES: [&str; 4] = [
    "Aracaju",
    "Barra dos Coqueiros",
    "São Cristóvão",
    "Nossa Senhora do Socorro",
];

/// Category codes shown on the map view and the label of each group.
pub const CATEGORY_LABELS: [(&str, &str); 6] = [
    ("catering.restaurant", "Restaurantes"),
    ("catering.fast_food", "Fast Food"),
    ("catering.bar", "Bares"),
    ("leisure.park", "Parques"),
    ("entertainment", "Entretenimento"),
    ("commercial.shopping_mall", "Shoppings"),
];

fn category_label(code: &str) -> Option<&'static str> {
    CATEGORY_LABELS
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, label)| *label)
}

#[derive(Clone)]
pub struct PlaceSearchService {
    provider: Arc<dyn PlaceProvider>,
    breaker: ProviderCircuitBreaker,
}

impl PlaceSearchService {
    pub fn new(provider: Arc<dyn PlaceProvider>) -> Self {
        Self {
            provider,
            breaker: create_provider_circuit_breaker(),
        }
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    /// Runs a search and reports whether the provider answered.
    /// Blank queries never reach the provider.
    pub async fn search_outcome(&self, query: &str) -> SearchOutcome {
        if query.trim().is_empty() {
            return SearchOutcome::Empty;
        }

        match self.guarded(self.provider.search(query)).await {
            Ok(places) => SearchOutcome::from_places(places),
            Err(e) => {
                tracing::error!("Erro na busca por lugares ({}): {}", self.provider.name(), e);
                SearchOutcome::Unavailable
            }
        }
    }

    /// Fail-to-empty search: an unavailable provider looks like no results.
    pub async fn search(&self, query: &str) -> Vec<PlaceRecord> {
        self.search_outcome(query).await.into_places()
    }

    /// Looks up a single place; any failure is reported as `None`.
    pub async fn lookup(&self, id: &str) -> Option<PlaceRecord> {
        if id.trim().is_empty() {
            return None;
        }

        match self.guarded(self.provider.lookup(id)).await {
            Ok(place) => place,
            Err(e) => {
                tracing::error!("Erro ao buscar lugar por ID {}: {}", id, e);
                None
            }
        }
    }

    /// Map view listing: one concurrent lookup per city, flattened,
    /// deduplicated by name and grouped by category label.
    pub async fn aggregate_places(&self) -> AggregatePlaces {
        let codes: Vec<&str> = CATEGORY_LABELS.iter().map(|(code, _)| *code).collect();

        let lookups = MAP_CITIES
            .iter()
            .map(|city| self.city_places(city, &codes));
        let per_city = futures::future::join_all(lookups).await;

        group_places(per_city.into_iter().flatten())
    }

    async fn city_places(&self, city: &str, codes: &[&str]) -> Vec<PlaceRecord> {
        match self.guarded(self.provider.places_in_city(city, codes)).await {
            Ok(places) => places,
            Err(e) => {
                tracing::warn!("Erro ao buscar locais em {}: {}", city, e);
                Vec::new()
            }
        }
    }

    async fn guarded<T, F>(&self, call: F) -> Result<T, AppError>
    where
        F: std::future::Future<Output = Result<T, AppError>>,
    {
        let counts_as_failure = |e: &AppError| e.is_provider_failure();
        match self.breaker.call_with(counts_as_failure, call).await {
            Ok(value) => Ok(value),
            Err(failsafe::Error::Inner(e)) => Err(e),
            Err(failsafe::Error::Rejected) => Err(AppError::ExternalApiError(format!(
                "{} circuit open, call rejected",
                self.provider.name()
            ))),
        }
    }
}

/// Builds the map view listing from the combined per-city results.
///
/// Records without a real name or without a known location are dropped,
/// the first record with a given name wins, and each survivor lands in the
/// group of its first mapped category (or in no group).
pub fn group_places(places: impl IntoIterator<Item = PlaceRecord>) -> AggregatePlaces {
    let mut groups: BTreeMap<String, Vec<PlaceRecord>> = CATEGORY_LABELS
        .iter()
        .map(|(_, label)| (label.to_string(), Vec::new()))
        .collect();
    let mut flat = Vec::new();
    let mut seen_names = HashSet::new();

    for place in places {
        if !place.has_name() || place.coordinates.is_unknown() {
            continue;
        }
        if !seen_names.insert(place.name.clone()) {
            continue;
        }

        if let Some(label) = place.categories.iter().find_map(|c| category_label(c)) {
            if let Some(bucket) = groups.get_mut(label) {
                bucket.push(place.clone());
            }
        }
        flat.push(place);
    }

    AggregatePlaces {
        places: flat,
        groups,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Coordinates, UNNAMED_PLACE};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn place(name: &str, categories: &[&str]) -> PlaceRecord {
        PlaceRecord {
            name: name.to_string(),
            formatted_address: String::new(),
            full_address: String::new(),
            categories: categories.iter().map(|c| c.to_string()).collect(),
            external_id: name.to_lowercase(),
            coordinates: Coordinates::new(-37.05, -10.93),
            phone: None,
            website: None,
            open_now: None,
        }
    }

    /// Provider stub that counts calls and fails for one city.
    struct StubProvider {
        calls: AtomicUsize,
        failing_city: Option<&'static str>,
        results: Vec<PlaceRecord>,
    }

    #[async_trait]
    impl PlaceProvider for StubProvider {
        fn name(&self) -> &'static str {
            "stub"
        }

        async fn search(&self, _query: &str) -> Result<Vec<PlaceRecord>, AppError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.results.clone())
        }

        async fn lookup(&self, _id: &str) -> Result<Option<PlaceRecord>, AppError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(AppError::ExternalApiError("down".to_string()))
        }

        async fn places_in_city(
            &self,
            city: &str,
            _categories: &[&str],
        ) -> Result<Vec<PlaceRecord>, AppError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if Some(city) == self.failing_city {
                return Err(AppError::ExternalApiError("timeout".to_string()));
            }
            Ok(vec![place(&format!("Praça de {}", city), &["leisure.park"])])
        }
    }

    fn stub(results: Vec<PlaceRecord>, failing_city: Option<&'static str>) -> Arc<StubProvider> {
        Arc::new(StubProvider {
            calls: AtomicUsize::new(0),
            failing_city,
            results,
        })
    }

    #[tokio::test]
    async fn test_blank_query_never_reaches_provider() {
        let provider = stub(vec![place("Orla", &[])], None);
        let service = PlaceSearchService::new(provider.clone());

        assert!(service.search("").await.is_empty());
        assert!(service.search("   \t").await.is_empty());
        assert_eq!(service.search_outcome(" ").await, SearchOutcome::Empty);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_lookup_failure_becomes_none() {
        let provider = stub(vec![], None);
        let service = PlaceSearchService::new(provider.clone());

        assert!(service.lookup("abc").await.is_none());
        assert!(service.lookup("").await.is_none());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_aggregate_isolates_failing_city() {
        let provider = stub(vec![], Some("São Cristóvão"));
        let service = PlaceSearchService::new(provider.clone());

        let aggregate = service.aggregate_places().await;

        assert_eq!(provider.calls.load(Ordering::SeqCst), 4);
        assert_eq!(aggregate.places.len(), 3);
        assert_eq!(aggregate.groups["Parques"].len(), 3);
        assert!(!aggregate
            .places
            .iter()
            .any(|p| p.name == "Praça de São Cristóvão"));
    }

    /// Provider whose search fails with a fixed error and whose lookup is
    /// refused as a bad request.
    struct FailingProvider {
        calls: AtomicUsize,
        search_error: Option<AppError>,
    }

    #[async_trait]
    impl PlaceProvider for FailingProvider {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn search(&self, _query: &str) -> Result<Vec<PlaceRecord>, AppError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.search_error {
                Some(e) => Err(e.clone()),
                None => Ok(vec![place("Orla", &["leisure.park"])]),
            }
        }

        async fn lookup(&self, _id: &str) -> Result<Option<PlaceRecord>, AppError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(AppError::ExternalApiRejected("400 Invalid id".to_string()))
        }

        async fn places_in_city(
            &self,
            _city: &str,
            _categories: &[&str],
        ) -> Result<Vec<PlaceRecord>, AppError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_open_breaker_rejects_without_calling_provider() {
        let provider = Arc::new(FailingProvider {
            calls: AtomicUsize::new(0),
            search_error: Some(AppError::ExternalApiError("503".to_string())),
        });
        let service = PlaceSearchService::new(provider.clone());

        for _ in 0..5 {
            assert_eq!(service.search_outcome("Orla").await, SearchOutcome::Unavailable);
        }
        assert_eq!(provider.calls.load(Ordering::SeqCst), 5);

        // Circuit is open now: nothing reaches the provider
        assert_eq!(service.search_outcome("Orla").await, SearchOutcome::Unavailable);
        assert!(service.search("Orla").await.is_empty());
        assert!(service.lookup("abc").await.is_none());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_refused_lookups_do_not_open_breaker() {
        let provider = Arc::new(FailingProvider {
            calls: AtomicUsize::new(0),
            search_error: None,
        });
        let service = PlaceSearchService::new(provider.clone());

        for i in 0..8 {
            assert!(service.lookup(&format!("bogus{}", i)).await.is_none());
        }

        let outcome = service.search_outcome("Orla").await;
        assert_eq!(outcome.status(), crate::models::SearchStatus::Found);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 9);
    }

    #[test]
    fn test_group_places_dedups_and_buckets() {
        let aggregate = group_places(vec![
            place("Cariri", &["catering", "catering.restaurant"]),
            place("Cariri", &["catering.bar"]),
            place("Shopping Riomar", &["commercial.shopping_mall"]),
            place("Igreja", &["building.place_of_worship"]),
        ]);

        let names: Vec<&str> = aggregate.places.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Cariri", "Shopping Riomar", "Igreja"]);
        assert_eq!(aggregate.groups.len(), CATEGORY_LABELS.len());
        assert_eq!(aggregate.groups["Restaurantes"].len(), 1);
        assert!(aggregate.groups["Bares"].is_empty());
        assert_eq!(aggregate.groups["Shoppings"][0].name, "Shopping Riomar");
        assert!(aggregate
            .groups
            .values()
            .flatten()
            .all(|p| p.name != "Igreja"));
    }

    #[test]
    fn test_group_places_drops_unnamed_and_unlocated() {
        let mut unlocated = place("Sem Mapa", &["leisure.park"]);
        unlocated.coordinates = Coordinates::default();

        let aggregate = group_places(vec![
            place(UNNAMED_PLACE, &["leisure.park"]),
            place(UNNAMED_PLACE, &["catering.bar"]),
            unlocated,
        ]);

        assert!(aggregate.places.is_empty());
        assert!(aggregate.groups.values().all(Vec::is_empty));
    }
}
