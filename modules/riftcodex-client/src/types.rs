use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};

/// Top-level image fields, checked in order.
const IMAGE_KEYS: &[&str] = &["image", "imageUrl", "image_url", "imageURI", "imageUri", "image_uri"];

/// Keys inside a nested `images` object, checked in order.
const IMAGE_VARIANTS: &[&str] = &["normal", "large", "small", "png", "default"];

/// Which API produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CardSource {
    Primary,
    Fallback,
}

impl fmt::Display for CardSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CardSource::Primary => write!(f, "primary"),
            CardSource::Fallback => write!(f, "fallback"),
        }
    }
}

/// A card lookup result, normalized across response shapes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CardDetails {
    /// Name reported by the API, or the query when it reported none.
    pub name: String,
    pub image_url: Option<String>,
    /// The card object, or the last unusable payload when nothing matched.
    pub raw: Value,
    pub source: CardSource,
}

impl CardDetails {
    /// Build details from a response body. `None` when the body holds no
    /// usable card object.
    pub fn from_payload(payload: &Value, query: &str, source: CardSource) -> Option<Self> {
        let card = first_card_object(payload)?;
        let name = card
            .get("name")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(query)
            .to_string();

        Some(Self {
            name,
            image_url: extract_image_url(card),
            raw: Value::Object(card.clone()),
            source,
        })
    }
}

/// Pick the card object out of a response body.
///
/// Accepts `{ "data": [card, ...] }`, `{ "items": [card, ...] }`,
/// `[card, ...]` and a bare card object. Empty objects and non-object
/// elements are not cards.
pub fn first_card_object(payload: &Value) -> Option<&Map<String, Value>> {
    let candidate = match payload {
        Value::Object(obj) => {
            match ["data", "items"]
                .iter()
                .find_map(|key| obj.get(*key).and_then(Value::as_array))
            {
                Some(list) => list.first()?,
                None => payload,
            }
        }
        Value::Array(list) => list.first()?,
        _ => return None,
    };

    candidate.as_object().filter(|obj| !obj.is_empty())
}

/// First non-blank image URL on a card object, trimmed.
pub fn extract_image_url(card: &Map<String, Value>) -> Option<String> {
    let direct = IMAGE_KEYS.iter().find_map(|key| non_blank(card.get(*key)));
    if direct.is_some() {
        return direct;
    }

    if let Some(images) = card.get("images").and_then(Value::as_object) {
        if let Some(url) = IMAGE_VARIANTS.iter().find_map(|key| non_blank(images.get(*key))) {
            return Some(url);
        }
    }

    card.get("media")
        .and_then(Value::as_object)
        .and_then(|media| non_blank(media.get("image_url")))
}

fn non_blank(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}
