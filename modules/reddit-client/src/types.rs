use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

// --- Normalized types ---

/// Whether an item is a submission or a comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Post,
    Comment,
}

impl ItemKind {
    /// Reddit "thing" type prefix used in fullnames.
    pub fn prefix(&self) -> &'static str {
        match self {
            ItemKind::Post => "t3",
            ItemKind::Comment => "t1",
        }
    }
}

/// A post or comment from a monitored subreddit.
/// Listing-specific wire types convert into this.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub kind: ItemKind,
    /// Short id without the type prefix.
    pub id: String,
    /// `None` for deleted or anonymous authors.
    pub author: Option<String>,
    pub title: Option<String>,
    pub body: String,
    pub subreddit: String,
    /// Fullname (`t3_...`) of the post a comment belongs to.
    pub link_id: Option<String>,
}

impl Item {
    /// Kind-qualified identifier, e.g. `t3_abc123`.
    pub fn fullname(&self) -> String {
        format!("{}_{}", self.kind.prefix(), self.id)
    }

    /// Text scanned for card mentions. Posts combine title and selftext.
    pub fn text(&self) -> String {
        match self.kind {
            ItemKind::Post => format!("{}\n{}", self.title.as_deref().unwrap_or_default(), self.body),
            ItemKind::Comment => self.body.clone(),
        }
    }
}

// --- Wire types ---

/// A `{kind, data}` envelope. `data` stays untyped until the kind is known.
#[derive(Debug, Clone, Deserialize)]
pub struct Thing {
    pub kind: String,
    #[serde(default)]
    pub data: Value,
}

impl Thing {
    /// Convert a `t1`/`t3` thing into an [`Item`]. Other kinds yield `None`.
    pub fn into_item(self) -> Result<Option<Item>> {
        match self.kind.as_str() {
            "t3" => {
                let data: PostData = serde_json::from_value(self.data)?;
                Ok(Some(data.into_item()))
            }
            "t1" => {
                let data: CommentData = serde_json::from_value(self.data)?;
                Ok(Some(data.into_item()))
            }
            _ => Ok(None),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Listing {
    pub data: ListingData,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListingData {
    #[serde(default)]
    pub children: Vec<Thing>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PostData {
    pub id: String,
    pub author: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub selftext: String,
    #[serde(default)]
    pub subreddit: String,
}

impl PostData {
    pub fn into_item(self) -> Item {
        Item {
            kind: ItemKind::Post,
            id: self.id,
            author: known_author(self.author),
            title: Some(self.title),
            body: self.selftext,
            subreddit: self.subreddit,
            link_id: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommentData {
    pub id: String,
    pub author: Option<String>,
    #[serde(default)]
    pub body: String,
    pub link_id: Option<String>,
    pub parent_id: Option<String>,
    #[serde(default)]
    pub subreddit: String,
    /// Either `""` or a nested listing.
    #[serde(default)]
    pub replies: Value,
}

impl CommentData {
    pub fn into_item(self) -> Item {
        Item {
            kind: ItemKind::Comment,
            id: self.id,
            author: known_author(self.author),
            title: None,
            body: self.body,
            subreddit: self.subreddit,
            link_id: self.link_id,
        }
    }
}

/// A "load more comments" or "continue this thread" placeholder.
#[derive(Debug, Clone, Deserialize)]
pub struct MoreData {
    #[serde(default)]
    pub parent_id: String,
    #[serde(default)]
    pub children: Vec<String>,
}

/// OAuth token grant response.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: Option<String>,
    pub expires_in: Option<u64>,
    pub error: Option<String>,
}

/// `/api/v1/me` response (only the fields we use).
#[derive(Debug, Clone, Deserialize)]
pub struct Me {
    pub name: String,
}

/// Envelope for `api_type=json` endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonEnvelope<T> {
    pub json: JsonBody<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JsonBody<T> {
    #[serde(default)]
    pub errors: Vec<Value>,
    pub data: Option<T>,
}

/// `data` of a `/api/morechildren` response.
#[derive(Debug, Clone, Deserialize)]
pub struct MoreChildrenData {
    #[serde(default)]
    pub things: Vec<Thing>,
}

fn known_author(author: Option<String>) -> Option<String> {
    author.filter(|a| !a.is_empty() && a != "[deleted]")
}
