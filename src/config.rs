use serde::Deserialize;
use url::Url;

pub const DEFAULT_SMTP_URL: &str = "smtps://smtp.gmail.com";
pub const DEFAULT_CONTACT_MAILBOX: &str = "contato@rolaju.com.br";
pub const DEFAULT_GEOAPIFY_BASE_URL: &str = "https://api.geoapify.com";
pub const DEFAULT_NOMINATIM_BASE_URL: &str = "https://nominatim.openstreetmap.org";
pub const DEFAULT_NOMINATIM_USER_AGENT: &str = "RolAjuApp/1.0";

/// Which geocoding provider backs the place search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Geoapify,
    Nominatim,
}

impl std::str::FromStr for ProviderKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "geoapify" => Ok(ProviderKind::Geoapify),
            "nominatim" => Ok(ProviderKind::Nominatim),
            other => anyhow::bail!(
                "PLACE_PROVIDER must be 'geoapify' or 'nominatim', got '{}'",
                other
            ),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub port: u16,
    pub smtp_url: String,
    pub email_user: Option<String>, // Not validated: a missing account surfaces as a send failure
    pub email_pass: Option<String>,
    pub contact_mailbox: String,
    pub place_provider: ProviderKind,
    pub geoapify_api_key: Option<String>,
    pub geoapify_base_url: String,
    pub nominatim_base_url: String,
    pub nominatim_user_agent: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3001".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            smtp_url: std::env::var("SMTP_URL")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_SMTP_URL.to_string()),
            email_user: optional_var("EMAIL_USER"),
            email_pass: optional_var("EMAIL_PASS"),
            contact_mailbox: std::env::var("CONTACT_MAILBOX")
                .unwrap_or_else(|_| DEFAULT_CONTACT_MAILBOX.to_string())
                .parse::<lettre::Address>()
                .map(|address| address.to_string())
                .map_err(|_| anyhow::anyhow!("CONTACT_MAILBOX must be a valid email address"))?,
            place_provider: std::env::var("PLACE_PROVIDER")
                .unwrap_or_else(|_| "geoapify".to_string())
                .parse()?,
            geoapify_api_key: optional_var("GEOAPIFY_API_KEY"),
            geoapify_base_url: base_url_var("GEOAPIFY_BASE_URL", DEFAULT_GEOAPIFY_BASE_URL)?,
            nominatim_base_url: base_url_var("NOMINATIM_BASE_URL", DEFAULT_NOMINATIM_BASE_URL)?,
            nominatim_user_agent: std::env::var("NOMINATIM_USER_AGENT")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_NOMINATIM_USER_AGENT.to_string()),
        };

        // Log successful configuration load (without sensitive values)
        tracing::debug!("SMTP URL: {}", config.smtp_url);
        tracing::debug!("EMAIL_USER present: {}", config.email_user.is_some());
        tracing::debug!("EMAIL_PASS present: {}", config.email_pass.is_some());
        if config.email_user.is_none() || config.email_pass.is_none() {
            tracing::warn!("Mail credentials not configured, contact form sends will fail");
        }
        tracing::debug!("Place provider: {:?}", config.place_provider);
        if config.place_provider == ProviderKind::Geoapify && config.geoapify_api_key.is_none() {
            tracing::warn!("GEOAPIFY_API_KEY not set, place searches will return no results");
        }
        tracing::debug!("Server Port: {}", config.port);

        Ok(config)
    }
}

fn optional_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.trim().is_empty())
}

/// Reads an http(s) base URL, trimming any trailing slash.
fn base_url_var(name: &str, default: &str) -> anyhow::Result<String> {
    let raw = std::env::var(name).unwrap_or_else(|_| default.to_string());
    parse_base_url(name, &raw)
}

pub(crate) fn parse_base_url(name: &str, raw: &str) -> anyhow::Result<String> {
    if raw.trim().is_empty() {
        anyhow::bail!("{} cannot be empty", name);
    }
    let url = Url::parse(raw.trim())
        .map_err(|e| anyhow::anyhow!("{} is not a valid URL: {}", name, e))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        anyhow::bail!("{} must start with http:// or https://", name);
    }
    Ok(raw.trim().trim_end_matches('/').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_kind_parsing() {
        assert_eq!(
            "geoapify".parse::<ProviderKind>().unwrap(),
            ProviderKind::Geoapify
        );
        assert_eq!(
            " Nominatim ".parse::<ProviderKind>().unwrap(),
            ProviderKind::Nominatim
        );
        assert!("google".parse::<ProviderKind>().is_err());
    }

    #[test]
    fn test_base_url_validation() {
        assert_eq!(
            parse_base_url("X", "https://api.geoapify.com/").unwrap(),
            "https://api.geoapify.com"
        );
        assert!(parse_base_url("X", "").is_err());
        assert!(parse_base_url("X", "ftp://example.com").is_err());
        assert!(parse_base_url("X", "not a url").is_err());
    }
}
