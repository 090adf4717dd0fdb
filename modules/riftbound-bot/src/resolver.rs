use std::sync::Arc;

use tracing::{debug, warn};

use crate::traits::CardLookup;

const UNKNOWN_CARD: &str = "(unknown card)";

/// Format the reply for one card.
pub fn compose_reply(card_name: &str, image_url: Option<&str>) -> String {
    let name = match card_name.trim() {
        "" => UNKNOWN_CARD,
        name => name,
    };
    match image_url {
        Some(url) => format!("{name}\n\nImage: {url}"),
        None => format!("{name}\n\nImage: (not found)"),
    }
}

/// Resolves a card name to reply text: primary API first, fallback API when
/// the primary has no image. Never fails; the worst case is a not-found
/// message.
pub struct CardResolver {
    primary: Arc<dyn CardLookup>,
    fallback: Option<Arc<dyn CardLookup>>,
}

impl CardResolver {
    pub fn new(primary: Arc<dyn CardLookup>, fallback: Option<Arc<dyn CardLookup>>) -> Self {
        Self { primary, fallback }
    }

    pub async fn resolve(&self, card_name: &str) -> String {
        let query = card_name.trim();
        if query.is_empty() {
            return compose_reply(query, None);
        }

        let primary = match self.primary.lookup(query).await {
            Ok(details) => details,
            Err(e) => {
                warn!(card = query, error = %e, "Primary card lookup failed");
                None
            }
        };

        let name = primary
            .as_ref()
            .map(|d| d.name.clone())
            .unwrap_or_else(|| query.to_string());

        let image = match primary.and_then(|d| d.image_url) {
            Some(url) => Some(url),
            None => self.fallback_image(query).await,
        };

        compose_reply(&name, image.as_deref())
    }

    async fn fallback_image(&self, query: &str) -> Option<String> {
        let fallback = self.fallback.as_ref()?;
        match fallback.lookup(query).await {
            Ok(details) => {
                let image = details.and_then(|d| d.image_url);
                debug!(card = query, found = image.is_some(), "Fallback card lookup");
                image
            }
            Err(e) => {
                warn!(card = query, error = %e, "Fallback card lookup failed");
                None
            }
        }
    }
}
