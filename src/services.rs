use crate::config::{Config, ProviderKind};
use crate::errors::AppError;
use crate::geoapify_models::FeatureCollection;
use crate::models::PlaceRecord;
use crate::nominatim_models::NominatimPlace;
use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

/// Rectangular longitude/latitude constraint applied to searches.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

/// Aracaju metropolitan region.
pub const ARACAJU_BBOX: BoundingBox = BoundingBox {
    min_lon: -37.2,
    min_lat: -11.1,
    max_lon: -37.0,
    max_lat: -10.9,
};

/// The state of Sergipe.
pub const SERGIPE_BBOX: BoundingBox = BoundingBox {
    min_lon: -38.5,
    min_lat: -11.5,
    max_lon: -36.0,
    max_lat: -10.0,
};

impl BoundingBox {
    /// Geoapify `filter` value: `rect:lon1,lat1,lon2,lat2`.
    pub fn to_geoapify_filter(&self) -> String {
        format!("rect:{}", self.to_viewbox())
    }

    /// Nominatim `viewbox` value: `lon1,lat1,lon2,lat2`.
    pub fn to_viewbox(&self) -> String {
        format!(
            "{:.1},{:.1},{:.1},{:.1}",
            self.min_lon, self.min_lat, self.max_lon, self.max_lat
        )
    }
}

const EXACT_SEARCH_LIMIT: &str = "10";
const TEXT_SEARCH_LIMIT: &str = "20";
const CITY_PLACES_LIMIT: &str = "500";
const NOMINATIM_SEARCH_LIMIT: &str = "10";
const ACCEPT_LANGUAGE: &str = "pt-BR,pt";
const PROVIDER_TIMEOUT: Duration = Duration::from_secs(15);

/// A geocoding provider. Every adapter normalizes its own response shape
/// into `PlaceRecord` so callers never see provider specifics.
#[async_trait]
pub trait PlaceProvider: Send + Sync {
    /// Short provider name for logs.
    fn name(&self) -> &'static str;

    /// Free-text search inside the provider's configured region.
    async fn search(&self, query: &str) -> Result<Vec<PlaceRecord>, AppError>;

    /// Fetches a single place by the identifier found in `PlaceRecord::external_id`.
    async fn lookup(&self, id: &str) -> Result<Option<PlaceRecord>, AppError>;

    /// Lists places of the given category codes inside a named city.
    async fn places_in_city(
        &self,
        city: &str,
        categories: &[&str],
    ) -> Result<Vec<PlaceRecord>, AppError>;
}

/// Builds the provider selected by `PLACE_PROVIDER`.
pub fn provider_from_config(config: &Config) -> Result<Arc<dyn PlaceProvider>, AppError> {
    let provider: Arc<dyn PlaceProvider> = match config.place_provider {
        ProviderKind::Geoapify => Arc::new(GeoapifyService::new(
            config.geoapify_base_url.clone(),
            config.geoapify_api_key.clone().unwrap_or_default(),
        )?),
        ProviderKind::Nominatim => Arc::new(NominatimService::new(
            config.nominatim_base_url.clone(),
            config.nominatim_user_agent.clone(),
        )?),
    };
    Ok(provider)
}

fn build_client(user_agent: Option<&str>) -> Result<Client, AppError> {
    let mut builder = Client::builder().timeout(PROVIDER_TIMEOUT);
    if let Some(agent) = user_agent {
        builder = builder.user_agent(agent.to_string());
    }
    builder
        .build()
        .map_err(|e| AppError::ExternalApiError(format!("Failed to create HTTP client: {}", e)))
}

/// Sends a GET and decodes the JSON body. A 4xx status is reported as a
/// rejected request, any other non-2xx status as a provider error.
async fn get_json<T: serde::de::DeserializeOwned>(
    client: &Client,
    url: reqwest::Url,
    provider: &str,
) -> Result<T, AppError> {
    let response = client.get(url).send().await.map_err(|e| {
        AppError::ExternalApiError(format!("{} request failed: {}", provider, e))
    })?;

    if !response.status().is_success() {
        let status = response.status();
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        let detail = format!("{} returned status {}: {}", provider, status, error_text);
        return Err(if status.is_client_error() {
            AppError::ExternalApiRejected(detail)
        } else {
            AppError::ExternalApiError(detail)
        });
    }

    response.json().await.map_err(|e| {
        AppError::ExternalApiError(format!("Failed to parse {} response: {}", provider, e))
    })
}

// ============ Geoapify ============

/// Geoapify Places / Geocoding client.
///
/// Search runs an exact-name lookup first and falls back to a free-text
/// lookup when the exact one comes back empty or fails.
pub struct GeoapifyService {
    client: Client,
    base_url: String,
    api_key: String,
    bbox: BoundingBox,
}

impl GeoapifyService {
    pub fn new(base_url: String, api_key: String) -> Result<Self, AppError> {
        Ok(Self {
            client: build_client(None)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            bbox: ARACAJU_BBOX,
        })
    }

    fn url(&self, path: &str, params: &[(&str, &str)]) -> Result<reqwest::Url, AppError> {
        let mut all: Vec<(&str, &str)> = params.to_vec();
        all.push(("apiKey", self.api_key.as_str()));
        reqwest::Url::parse_with_params(&format!("{}{}", self.base_url, path), &all)
            .map_err(|e| AppError::ExternalApiError(format!("Failed to build URL: {}", e)))
    }

    async fn fetch(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<FeatureCollection, AppError> {
        let url = self.url(path, params)?;
        // Redact the key from logs
        tracing::debug!("Geoapify URL: {}{} {:?} apiKey=[REDACTED]", self.base_url, path, params);
        get_json(&self.client, url, "Geoapify").await
    }

    /// Exact-name lookup inside the bounding box.
    pub async fn search_exact(&self, query: &str) -> Result<Vec<PlaceRecord>, AppError> {
        let filter = self.bbox.to_geoapify_filter();
        let collection = self
            .fetch(
                "/v2/places",
                &[
                    ("name", query),
                    ("filter", filter.as_str()),
                    ("limit", EXACT_SEARCH_LIMIT),
                ],
            )
            .await?;
        Ok(into_records(collection))
    }

    /// Free-text lookup inside the bounding box.
    pub async fn search_text(&self, query: &str) -> Result<Vec<PlaceRecord>, AppError> {
        let filter = self.bbox.to_geoapify_filter();
        let collection = self
            .fetch(
                "/v2/places",
                &[
                    ("text", query),
                    ("filter", filter.as_str()),
                    ("limit", TEXT_SEARCH_LIMIT),
                ],
            )
            .await?;
        Ok(into_records(collection))
    }

    /// Resolves a city name to Geoapify's `place_id` for that city.
    pub async fn resolve_city(&self, city: &str) -> Result<Option<String>, AppError> {
        let text = format!("{}, Sergipe, Brazil", city);
        let collection = self
            .fetch("/v1/geocode/search", &[("text", text.as_str())])
            .await?;

        Ok(collection
            .features
            .into_iter()
            .next()
            .and_then(|f| f.properties.place_id)
            .filter(|id| !id.trim().is_empty()))
    }
}

fn into_records(collection: FeatureCollection) -> Vec<PlaceRecord> {
    collection
        .features
        .into_iter()
        .map(|f| f.into_place_record())
        .collect()
}

#[async_trait]
impl PlaceProvider for GeoapifyService {
    fn name(&self) -> &'static str {
        "geoapify"
    }

    async fn search(&self, query: &str) -> Result<Vec<PlaceRecord>, AppError> {
        tracing::info!("Buscando: \"{}\"", query);

        // A failed exact lookup counts as zero exact results
        match self.search_exact(query).await {
            Ok(exact) if !exact.is_empty() => {
                tracing::info!("Encontrados {} resultados exatos", exact.len());
                return Ok(exact);
            }
            Ok(_) => tracing::info!("Nenhum resultado exato, tentando busca por texto..."),
            Err(e) => tracing::warn!("Busca exata falhou, tentando busca por texto: {}", e),
        }

        let text = self.search_text(query).await?;
        tracing::info!("Encontrados {} resultados por texto", text.len());
        Ok(text)
    }

    async fn lookup(&self, id: &str) -> Result<Option<PlaceRecord>, AppError> {
        let collection = self.fetch("/v2/place-details", &[("id", id)]).await?;
        Ok(collection
            .features
            .into_iter()
            .next()
            .map(|f| f.into_place_record()))
    }

    async fn places_in_city(
        &self,
        city: &str,
        categories: &[&str],
    ) -> Result<Vec<PlaceRecord>, AppError> {
        let Some(place_id) = self.resolve_city(city).await? else {
            tracing::warn!("Cidade não encontrada: {}", city);
            return Ok(Vec::new());
        };

        let categories = categories.join(",");
        let filter = format!("place:{}", place_id);
        let collection = self
            .fetch(
                "/v2/places",
                &[
                    ("categories", categories.as_str()),
                    ("filter", filter.as_str()),
                    ("limit", CITY_PLACES_LIMIT),
                    ("fields", "details,opening_hours"),
                ],
            )
            .await?;

        let records = into_records(collection);
        tracing::info!("{} places found in {}", records.len(), city);
        Ok(records)
    }
}

// ============ Nominatim ============

/// OpenStreetMap Nominatim client. Requests carry an identifying
/// `User-Agent`, which Nominatim's usage policy requires.
pub struct NominatimService {
    client: Client,
    base_url: String,
    bbox: BoundingBox,
    region_suffix: String,
}

impl NominatimService {
    pub fn new(base_url: String, user_agent: String) -> Result<Self, AppError> {
        Ok(Self {
            client: build_client(Some(&user_agent))?,
            base_url: base_url.trim_end_matches('/').to_string(),
            bbox: SERGIPE_BBOX,
            region_suffix: "Sergipe, Brasil".to_string(),
        })
    }

    fn url(&self, path: &str, params: &[(&str, &str)]) -> Result<reqwest::Url, AppError> {
        reqwest::Url::parse_with_params(&format!("{}{}", self.base_url, path), params)
            .map_err(|e| AppError::ExternalApiError(format!("Failed to build URL: {}", e)))
    }
}

#[async_trait]
impl PlaceProvider for NominatimService {
    fn name(&self) -> &'static str {
        "nominatim"
    }

    async fn search(&self, query: &str) -> Result<Vec<PlaceRecord>, AppError> {
        tracing::info!("Buscando: \"{}\" em Sergipe", query);

        let q = format!("{}, {}", query, self.region_suffix);
        let viewbox = self.bbox.to_viewbox();
        let url = self.url(
            "/search",
            &[
                ("q", q.as_str()),
                ("format", "json"),
                ("addressdetails", "1"),
                ("limit", NOMINATIM_SEARCH_LIMIT),
                ("countrycodes", "br"),
                ("viewbox", viewbox.as_str()),
                ("bounded", "1"),
                ("extratags", "1"),
                ("namedetails", "1"),
                ("accept-language", ACCEPT_LANGUAGE),
            ],
        )?;

        let places: Vec<NominatimPlace> = get_json(&self.client, url, "Nominatim").await?;
        tracing::info!("Encontrados {} resultados", places.len());
        Ok(places
            .into_iter()
            .map(NominatimPlace::into_place_record)
            .collect())
    }

    async fn lookup(&self, id: &str) -> Result<Option<PlaceRecord>, AppError> {
        let url = self.url(
            "/lookup",
            &[
                ("osm_ids", id),
                ("format", "json"),
                ("addressdetails", "1"),
                ("extratags", "1"),
                ("accept-language", ACCEPT_LANGUAGE),
            ],
        )?;

        let places: Vec<NominatimPlace> = get_json(&self.client, url, "Nominatim").await?;
        Ok(places
            .into_iter()
            .next()
            .map(NominatimPlace::into_place_record))
    }

    async fn places_in_city(
        &self,
        city: &str,
        _categories: &[&str],
    ) -> Result<Vec<PlaceRecord>, AppError> {
        tracing::warn!(
            "Nominatim does not support category listings, no places for {}",
            city
        );
        Ok(Vec::new())
    }
}
