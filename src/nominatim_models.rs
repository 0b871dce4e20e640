use crate::models::{Coordinates, PlaceRecord, UNNAMED_PLACE};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One entry of a Nominatim `/search` or `/lookup` JSON response.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct NominatimPlace {
    pub place_id: Option<u64>,
    pub osm_type: Option<String>,
    pub osm_id: Option<u64>,
    #[serde(default)]
    pub lat: Value,
    #[serde(default)]
    pub lon: Value,
    pub display_name: Option<String>,
    pub class: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub category: Option<String>,
    #[serde(default)]
    pub address: NominatimAddress,
    #[serde(default)]
    pub extratags: Option<Map<String, Value>>,
}

/// The subset of `addressdetails` used to build a short address.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct NominatimAddress {
    pub road: Option<String>,
    pub house_number: Option<String>,
    pub suburb: Option<String>,
    pub city_district: Option<String>,
    pub city: Option<String>,
}

impl NominatimAddress {
    /// Joins road, house number, suburb, district and city with `", "`.
    /// Suburb, district and city are skipped when the text built so far
    /// already contains them.
    pub fn synthesize(&self) -> String {
        let mut formatted = String::new();

        if let Some(road) = present(&self.road) {
            formatted.push_str(road);
        }
        if let Some(number) = present(&self.house_number) {
            append_component(&mut formatted, number);
        }
        for component in [&self.suburb, &self.city_district, &self.city] {
            if let Some(part) = present(component) {
                if !formatted.contains(part) {
                    append_component(&mut formatted, part);
                }
            }
        }

        formatted
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn append_component(formatted: &mut String, part: &str) {
    if !formatted.is_empty() {
        formatted.push_str(", ");
    }
    formatted.push_str(part);
}

/// Nominatim returns coordinates as strings; accept numbers too.
fn parse_coordinate(value: &Value) -> f64 {
    match value {
        Value::String(s) => s.trim().parse().unwrap_or(0.0),
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        _ => 0.0,
    }
}

impl NominatimPlace {
    /// Identifier usable with `/lookup?osm_ids=` (`N123`, `W456`, `R789`),
    /// falling back to Nominatim's internal `place_id`.
    pub fn lookup_id(&self) -> Option<String> {
        let prefix = match self.osm_type.as_deref() {
            Some("node") => Some('N'),
            Some("way") => Some('W'),
            Some("relation") => Some('R'),
            _ => None,
        };

        match (prefix, self.osm_id) {
            (Some(p), Some(id)) => Some(format!("{}{}", p, id)),
            _ => self.place_id.map(|id| id.to_string()),
        }
    }

    fn extratag(&self, keys: &[&str]) -> Option<String> {
        let tags = self.extratags.as_ref()?;
        keys.iter()
            .filter_map(|k| tags.get(*k).and_then(Value::as_str))
            .map(str::trim)
            .find(|v| !v.is_empty())
            .map(str::to_string)
    }

    /// Normalizes the entry into a `PlaceRecord`.
    pub fn into_place_record(self) -> PlaceRecord {
        let display_name = self.display_name.clone().unwrap_or_default();
        let name = display_name
            .split(',')
            .next()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(UNNAMED_PLACE)
            .to_string();

        let synthesized = self.address.synthesize();
        let formatted_address = if synthesized.is_empty() {
            display_name.clone()
        } else {
            synthesized
        };

        let categories = [&self.kind, &self.class, &self.category]
            .into_iter()
            .filter_map(|c| present(c).map(str::to_string))
            .collect();

        PlaceRecord {
            name,
            formatted_address,
            full_address: display_name,
            categories,
            external_id: self
                .lookup_id()
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            coordinates: Coordinates::new(parse_coordinate(&self.lon), parse_coordinate(&self.lat)),
            phone: self.extratag(&["phone", "contact:phone"]),
            website: self.extratag(&["website", "contact:website"]),
            open_now: None,
        }
    }
}
