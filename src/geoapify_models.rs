use crate::models::{Coordinates, PlaceRecord, UNNAMED_PLACE};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// GeoJSON feature collection returned by every Geoapify endpoint we call.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FeatureCollection {
    #[serde(default, deserialize_with = "null_as_default")]
    pub features: Vec<Feature>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Feature {
    #[serde(default, deserialize_with = "null_as_default")]
    pub properties: FeatureProperties,
    #[serde(default)]
    pub geometry: Option<Geometry>,
}

/// Geoapify sends `null` for blocks it has no data for.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Geometry is kept loose: place details may come back as polygons.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Geometry {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub coordinates: Value,
}

/// Properties of a Geoapify place. Shapes differ between `/v2/places`,
/// `/v2/place-details` and `/v1/geocode`, so nested blocks stay as raw JSON.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FeatureProperties {
    pub name: Option<String>,
    pub formatted: Option<String>,
    pub address_line1: Option<String>,
    pub address_line2: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub categories: Vec<String>,
    pub place_id: Option<String>,
    pub website: Option<String>,
    pub lon: Option<f64>,
    pub lat: Option<f64>,
    #[serde(default)]
    pub contact: Value,
    #[serde(default)]
    pub details: Value,
    #[serde(default)]
    pub opening_hours: Value,
}

impl Feature {
    /// Point coordinates from the geometry, falling back to the `lon`/`lat`
    /// properties and finally to `(0, 0)`.
    pub fn coordinates(&self) -> Coordinates {
        if let Some(pair) = self
            .geometry
            .as_ref()
            .and_then(|g| g.coordinates.as_array())
            .filter(|c| c.len() == 2)
        {
            if let (Some(lon), Some(lat)) = (pair[0].as_f64(), pair[1].as_f64()) {
                return Coordinates::new(lon, lat);
            }
        }

        match (self.properties.lon, self.properties.lat) {
            (Some(lon), Some(lat)) => Coordinates::new(lon, lat),
            _ => Coordinates::default(),
        }
    }

    fn phone(&self) -> Option<String> {
        let props = &self.properties;
        props
            .contact
            .get("phone")
            .or_else(|| props.details.get("contact").and_then(|c| c.get("phone")))
            .and_then(Value::as_str)
            .and_then(non_blank)
    }

    fn website(&self) -> Option<String> {
        let props = &self.properties;
        props
            .website
            .as_deref()
            .and_then(non_blank)
            .or_else(|| {
                props
                    .details
                    .get("website")
                    .and_then(Value::as_str)
                    .and_then(non_blank)
            })
    }

    fn open_now(&self) -> Option<bool> {
        self.properties
            .opening_hours
            .get("open_now")
            .and_then(Value::as_bool)
    }

    /// Normalizes the feature into a `PlaceRecord`.
    pub fn into_place_record(self) -> PlaceRecord {
        let coordinates = self.coordinates();
        let phone = self.phone();
        let website = self.website();
        let open_now = self.open_now();
        let props = self.properties;

        let full_address = props.formatted.unwrap_or_default();
        let formatted_address = props
            .address_line2
            .as_deref()
            .and_then(non_blank)
            .unwrap_or_else(|| full_address.clone());

        PlaceRecord {
            name: props
                .name
                .as_deref()
                .and_then(non_blank)
                .unwrap_or_else(|| UNNAMED_PLACE.to_string()),
            formatted_address,
            full_address,
            categories: props.categories,
            external_id: props
                .place_id
                .as_deref()
                .and_then(non_blank)
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            coordinates,
            phone,
            website,
            open_now,
        }
    }
}

fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
