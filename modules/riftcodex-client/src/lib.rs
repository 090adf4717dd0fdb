pub mod error;
pub mod types;

pub use error::{CardApiError, Result};
pub use types::{extract_image_url, first_card_object, CardDetails, CardSource};

use reqwest::header::ACCEPT;
use serde_json::Value;
use tracing::{debug, info};

pub const DEFAULT_HOST: &str = "api.riftcodex.com";

/// Candidate lookup paths, in the order they are tried.
pub fn candidate_paths(encoded_name: &str) -> [String; 4] {
    [
        format!("/cards/name?name={encoded_name}"),
        format!("/cards/name/{encoded_name}"),
        format!("/cards/search?name={encoded_name}"),
        format!("/cards?name={encoded_name}"),
    ]
}

/// Turn a configured host into a base URL. Bare hosts get `https://`.
pub fn base_url(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{host}")
    }
}

/// GET a URL and parse its body as JSON. Non-success statuses and empty
/// bodies are errors.
async fn get_json(client: &reqwest::Client, url: &str) -> Result<Value> {
    let resp = client
        .get(url)
        .header(ACCEPT, "application/json")
        .send()
        .await?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(CardApiError::Api {
            status: status.as_u16(),
            message: body,
        });
    }

    let body = resp.text().await?;
    if body.trim().is_empty() {
        return Err(CardApiError::Parse("empty response body".into()));
    }
    Ok(serde_json::from_str(&body)?)
}

/// Client for the community Riftcodex card API.
pub struct RiftcodexClient {
    client: reqwest::Client,
    base_url: String,
}

impl RiftcodexClient {
    pub fn new(host: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url(host),
        }
    }

    /// Look a card up by name, trying each candidate path until one returns
    /// a usable card object.
    ///
    /// Returns `None` only when every candidate failed outright. When some
    /// candidate answered but held no card, the details carry that payload
    /// with no image.
    pub async fn search_card_details(&self, card_name: &str) -> Option<CardDetails> {
        let name = card_name.trim();
        if name.is_empty() {
            return None;
        }

        let encoded = urlencoding::encode(name);
        let mut last_payload = None;

        for path in candidate_paths(&encoded) {
            let url = format!("{}{}", self.base_url, path);
            match get_json(&self.client, &url).await {
                Ok(payload) => {
                    if let Some(details) = CardDetails::from_payload(&payload, name, CardSource::Primary) {
                        debug!(url = %url, card = %details.name, has_image = details.image_url.is_some(), "Card found");
                        return Some(details);
                    }
                    debug!(url = %url, "Candidate returned no card object");
                    last_payload = Some(payload);
                }
                Err(e) => debug!(url = %url, error = %e, "Candidate lookup failed"),
            }
        }

        info!(card = name, "No card found on primary API");
        last_payload.map(|raw| CardDetails {
            name: name.to_string(),
            image_url: None,
            raw,
            source: CardSource::Primary,
        })
    }
}

/// Client for a secondary card API configured by host and path template.
pub struct FallbackClient {
    client: reqwest::Client,
    base_url: String,
    path_template: String,
}

impl FallbackClient {
    /// `path_template` must contain a `{name}` placeholder.
    pub fn new(host: &str, path_template: &str) -> Result<Self> {
        let path_template = path_template.trim();
        if !path_template.contains("{name}") {
            return Err(CardApiError::InvalidTemplate(path_template.to_string()));
        }
        Ok(Self {
            client: reqwest::Client::new(),
            base_url: base_url(host),
            path_template: path_template.to_string(),
        })
    }

    /// Build a client only when both host and template are set and non-blank.
    pub fn from_parts(host: Option<&str>, path_template: Option<&str>) -> Result<Option<Self>> {
        match (host.map(str::trim), path_template.map(str::trim)) {
            (Some(h), Some(t)) if !h.is_empty() && !t.is_empty() => Ok(Some(Self::new(h, t)?)),
            _ => Ok(None),
        }
    }

    pub fn url_for(&self, card_name: &str) -> String {
        let encoded = urlencoding::encode(card_name.trim());
        format!("{}{}", self.base_url, self.path_template.replace("{name}", &encoded))
    }

    /// Single lookup against the fallback API. `Ok(None)` when it answered
    /// without a usable card object.
    pub async fn search_card_details(&self, card_name: &str) -> Result<Option<CardDetails>> {
        let name = card_name.trim();
        if name.is_empty() {
            return Ok(None);
        }
        let payload = get_json(&self.client, &self.url_for(name)).await?;
        Ok(CardDetails::from_payload(&payload, name, CardSource::Fallback))
    }

    /// Image URL for a card, if the fallback API has one.
    pub async fn search_card_image(&self, card_name: &str) -> Result<Option<String>> {
        Ok(self
            .search_card_details(card_name)
            .await?
            .and_then(|details| details.image_url))
    }
}
