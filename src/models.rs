use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Placeholder used when a provider returns a place without a usable name.
pub const UNNAMED_PLACE: &str = "Local sem nome";

// ============ Contact form ============

/// Contact form submission as posted by the site's "Contato" page.
///
/// Every field is optional on the wire so that validation, not the JSON
/// extractor, decides what a missing field means.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ContactSubmission {
    #[serde(rename = "nome")]
    pub sender_name: Option<String>,
    #[serde(rename = "email")]
    pub sender_email: Option<String>,
    #[serde(rename = "telefone")]
    pub phone: Option<String>,
    #[serde(rename = "assunto")]
    pub subject: Option<String>,
    #[serde(rename = "mensagem")]
    pub message: Option<String>,
    #[serde(rename = "copiaEmail", default)]
    pub request_copy: Option<bool>,
}

/// A submission that passed validation. Optional fields are trimmed and
/// blank values collapsed to `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedSubmission {
    pub sender_name: String,
    pub sender_email: String,
    pub phone: Option<String>,
    pub subject: Option<String>,
    pub message: String,
    pub request_copy: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SendEmailResponse {
    pub message: String,
}

// ============ Places ============

/// Longitude/latitude pair. `(0, 0)` means the provider gave no location.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub longitude: f64,
    pub latitude: f64,
}

impl Coordinates {
    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            longitude,
            latitude,
        }
    }

    /// True for the `(0, 0)` default, which is never a point in the service area.
    pub fn is_unknown(&self) -> bool {
        self.longitude == 0.0 && self.latitude == 0.0
    }
}

/// Provider-agnostic representation of a single place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceRecord {
    pub name: String,
    pub formatted_address: String,
    /// Provider's full display string, when it differs from the short address.
    #[serde(default)]
    pub full_address: String,
    #[serde(default)]
    pub categories: Vec<String>,
    /// Opaque provider identifier, only used for display and linking.
    pub external_id: String,
    pub coordinates: Coordinates,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open_now: Option<bool>,
}

impl PlaceRecord {
    /// False when the provider did not name the place.
    pub fn has_name(&self) -> bool {
        !self.name.trim().is_empty() && self.name != UNNAMED_PLACE
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
}

/// Result of a place search that keeps "no results" apart from "could not ask".
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    Found(Vec<PlaceRecord>),
    Empty,
    Unavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStatus {
    Found,
    Empty,
    Unavailable,
}

impl SearchOutcome {
    pub fn from_places(places: Vec<PlaceRecord>) -> Self {
        if places.is_empty() {
            SearchOutcome::Empty
        } else {
            SearchOutcome::Found(places)
        }
    }

    pub fn status(&self) -> SearchStatus {
        match self {
            SearchOutcome::Found(_) => SearchStatus::Found,
            SearchOutcome::Empty => SearchStatus::Empty,
            SearchOutcome::Unavailable => SearchStatus::Unavailable,
        }
    }

    /// Collapses the outcome to a plain list, treating an unavailable
    /// provider the same as an empty result.
    pub fn into_places(self) -> Vec<PlaceRecord> {
        match self {
            SearchOutcome::Found(places) => places,
            SearchOutcome::Empty | SearchOutcome::Unavailable => Vec::new(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResponse {
    pub status: SearchStatus,
    pub places: Vec<PlaceRecord>,
}

impl From<SearchOutcome> for SearchResponse {
    fn from(outcome: SearchOutcome) -> Self {
        Self {
            status: outcome.status(),
            places: outcome.into_places(),
        }
    }
}

/// Places for the map view: the deduplicated flat list plus the same
/// records bucketed by category label.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AggregatePlaces {
    pub places: Vec<PlaceRecord>,
    pub groups: BTreeMap<String, Vec<PlaceRecord>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str) -> PlaceRecord {
        PlaceRecord {
            name: name.to_string(),
            formatted_address: String::new(),
            full_address: String::new(),
            categories: vec![],
            external_id: "id".to_string(),
            coordinates: Coordinates::default(),
            phone: None,
            website: None,
            open_now: None,
        }
    }

    #[test]
    fn test_submission_uses_portuguese_keys() {
        let submission: ContactSubmission = serde_json::from_value(serde_json::json!({
            "nome": "Maria",
            "email": "maria@example.com",
            "mensagem": "Olá",
            "copiaEmail": true
        }))
        .unwrap();

        assert_eq!(submission.sender_name.as_deref(), Some("Maria"));
        assert_eq!(submission.sender_email.as_deref(), Some("maria@example.com"));
        assert_eq!(submission.message.as_deref(), Some("Olá"));
        assert_eq!(submission.request_copy, Some(true));
        assert!(submission.phone.is_none());
    }

    #[test]
    fn test_place_record_serializes_camel_case() {
        let value = serde_json::to_value(record("Orla de Atalaia")).unwrap();
        assert!(value.get("formattedAddress").is_some());
        assert!(value.get("externalId").is_some());
        assert!(value.get("phone").is_none());
        assert_eq!(value["coordinates"]["longitude"], 0.0);
    }

    #[test]
    fn test_unknown_coordinates() {
        assert!(Coordinates::default().is_unknown());
        assert!(!Coordinates::new(-37.05, -10.91).is_unknown());
    }

    #[test]
    fn test_placeholder_name_is_not_a_name() {
        assert!(!record(UNNAMED_PLACE).has_name());
        assert!(!record("  ").has_name());
        assert!(record("Mercado Thales Ferraz").has_name());
    }

    #[test]
    fn test_outcome_collapses_to_list() {
        assert_eq!(SearchOutcome::from_places(vec![]), SearchOutcome::Empty);
        assert!(SearchOutcome::Unavailable.into_places().is_empty());

        let response = SearchResponse::from(SearchOutcome::Found(vec![record("Passarela")]));
        assert_eq!(response.status, SearchStatus::Found);
        assert_eq!(response.places.len(), 1);
    }
}
