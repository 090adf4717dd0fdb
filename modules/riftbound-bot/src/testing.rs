// Test mocks for the bot pipeline.
//
// Two mocks matching the two trait boundaries:
// - MockForum (Forum): canned listings, comments and feeds; records replies
// - MockLookup (CardLookup): name→CardDetails map with a call counter
//
// Plus `post()` / `comment()` item builders.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use anyhow::{bail, Result};
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use serde_json::json;

use reddit_client::{Item, ItemKind};
use riftcodex_client::{CardDetails, CardSource};

use crate::tags::normalize;
use crate::traits::{CardLookup, Forum};

// ---------------------------------------------------------------------------
// Item builders
// ---------------------------------------------------------------------------

pub fn post(id: &str, author: &str, title: &str, body: &str) -> Item {
    Item {
        kind: ItemKind::Post,
        id: id.to_string(),
        author: Some(author.to_string()),
        title: Some(title.to_string()),
        body: body.to_string(),
        subreddit: "riftboundtcg".to_string(),
        link_id: None,
    }
}

pub fn comment(id: &str, author: &str, body: &str) -> Item {
    Item {
        kind: ItemKind::Comment,
        id: id.to_string(),
        author: Some(author.to_string()),
        title: None,
        body: body.to_string(),
        subreddit: "riftboundtcg".to_string(),
        link_id: None,
    }
}

// ---------------------------------------------------------------------------
// MockForum
// ---------------------------------------------------------------------------

/// In-memory forum. Unregistered posts have no comments; feeds end after
/// their canned items.
#[derive(Default)]
pub struct MockForum {
    user: Option<String>,
    identity_fails: bool,
    replies_fail: bool,
    comments_fail: bool,
    recent: HashMap<String, Vec<Item>>,
    failing_subreddits: HashSet<String>,
    comments: HashMap<String, Vec<Item>>,
    post_feed: Mutex<Vec<Result<Item>>>,
    comment_feed: Mutex<Vec<Result<Item>>>,
    replies: Mutex<Vec<(String, String)>>,
    comment_requests: Mutex<Vec<String>>,
}

impl MockForum {
    pub fn new() -> Self {
        Self::default()
    }

    /// Log in as `name`, enabling replies.
    pub fn with_user(mut self, name: &str) -> Self {
        self.user = Some(name.to_string());
        self
    }

    pub fn identity_fails(mut self) -> Self {
        self.identity_fails = true;
        self
    }

    pub fn replies_fail(mut self) -> Self {
        self.replies_fail = true;
        self
    }

    pub fn comments_fail(mut self) -> Self {
        self.comments_fail = true;
        self
    }

    pub fn on_recent(mut self, subreddit: &str, posts: Vec<Item>) -> Self {
        self.recent.insert(subreddit.to_string(), posts);
        self
    }

    pub fn failing_subreddit(mut self, subreddit: &str) -> Self {
        self.failing_subreddits.insert(subreddit.to_string());
        self
    }

    pub fn on_comments(mut self, post_id: &str, comments: Vec<Item>) -> Self {
        self.comments.insert(post_id.to_string(), comments);
        self
    }

    pub fn on_post_feed(self, items: Vec<Result<Item>>) -> Self {
        *self.post_feed.lock().unwrap() = items;
        self
    }

    pub fn on_comment_feed(self, items: Vec<Result<Item>>) -> Self {
        *self.comment_feed.lock().unwrap() = items;
        self
    }

    /// `(fullname, text)` of every reply posted, in order.
    pub fn replies(&self) -> Vec<(String, String)> {
        self.replies.lock().unwrap().clone()
    }

    /// Post ids whose comments were requested, in order.
    pub fn comment_requests(&self) -> Vec<String> {
        self.comment_requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Forum for MockForum {
    async fn recent_posts(&self, subreddit: &str, limit: u32) -> Result<Vec<Item>> {
        if self.failing_subreddits.contains(subreddit) {
            bail!("MockForum: listing failed for r/{subreddit}");
        }
        Ok(self
            .recent
            .get(subreddit)
            .map(|posts| posts.iter().take(limit as usize).cloned().collect())
            .unwrap_or_default())
    }

    async fn post_comments(&self, post: &Item) -> Result<Vec<Item>> {
        self.comment_requests.lock().unwrap().push(post.id.clone());
        if self.comments_fail {
            bail!("MockForum: comment expansion failed for {}", post.id);
        }
        Ok(self.comments.get(&post.id).cloned().unwrap_or_default())
    }

    async fn reply(&self, item: &Item, text: &str) -> Result<()> {
        if self.replies_fail {
            bail!("MockForum: reply rejected");
        }
        self.replies
            .lock()
            .unwrap()
            .push((item.fullname(), text.to_string()));
        Ok(())
    }

    async fn identity(&self) -> Result<Option<String>> {
        if self.identity_fails {
            bail!("MockForum: identity unavailable");
        }
        Ok(self.user.clone())
    }

    fn can_reply(&self) -> bool {
        self.user.is_some()
    }

    fn new_posts(&self, _subreddits: &[String]) -> BoxStream<'static, Result<Item>> {
        let items = std::mem::take(&mut *self.post_feed.lock().unwrap());
        stream::iter(items).boxed()
    }

    fn new_comments(&self, _subreddits: &[String]) -> BoxStream<'static, Result<Item>> {
        let items = std::mem::take(&mut *self.comment_feed.lock().unwrap());
        stream::iter(items).boxed()
    }
}

// ---------------------------------------------------------------------------
// MockLookup
// ---------------------------------------------------------------------------

/// Card source keyed by normalized name. Unregistered names return `Ok(None)`.
#[derive(Default)]
pub struct MockLookup {
    cards: HashMap<String, CardDetails>,
    failing: bool,
    calls: AtomicUsize,
}

impl MockLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_card(mut self, query: &str, name: &str, image_url: Option<&str>) -> Self {
        self.cards.insert(
            normalize(query),
            CardDetails {
                name: name.to_string(),
                image_url: image_url.map(String::from),
                raw: json!({ "name": name, "image": image_url }),
                source: CardSource::Primary,
            },
        );
        self
    }

    /// Every lookup returns an error.
    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CardLookup for MockLookup {
    async fn lookup(&self, name: &str) -> Result<Option<CardDetails>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing {
            bail!("MockLookup: lookup failed for {name}");
        }
        Ok(self.cards.get(&normalize(name)).cloned())
    }
}
