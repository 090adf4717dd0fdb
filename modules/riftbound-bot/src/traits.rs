// Trait seams for the bot's external collaborators.
//
// Forum wraps the Reddit client; CardLookup wraps each card API. The
// pipeline only sees these traits, so tests run against in-memory mocks
// (see `testing`) with no network.

use anyhow::Result;
use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};

use reddit_client::{Item, RedditClient};
use riftcodex_client::{CardDetails, FallbackClient, RiftcodexClient};

// ---------------------------------------------------------------------------
// Forum
// ---------------------------------------------------------------------------

#[async_trait]
pub trait Forum: Send + Sync {
    /// Newest posts of one subreddit, most recent first.
    async fn recent_posts(&self, subreddit: &str, limit: u32) -> Result<Vec<Item>>;

    /// All comments under a post with placeholders expanded.
    async fn post_comments(&self, post: &Item) -> Result<Vec<Item>>;

    /// Post `text` as a reply to `item`.
    async fn reply(&self, item: &Item, text: &str) -> Result<()>;

    /// Username the client is logged in as, if any.
    async fn identity(&self) -> Result<Option<String>>;

    /// Whether the client holds credentials that allow replying.
    fn can_reply(&self) -> bool;

    /// Live feed of new posts, skipping the backlog present at start.
    fn new_posts(&self, subreddits: &[String]) -> BoxStream<'static, Result<Item>>;

    /// Live feed of new comments, skipping the backlog present at start.
    fn new_comments(&self, subreddits: &[String]) -> BoxStream<'static, Result<Item>>;
}

#[async_trait]
impl Forum for RedditClient {
    async fn recent_posts(&self, subreddit: &str, limit: u32) -> Result<Vec<Item>> {
        Ok(self.recent_posts(subreddit, limit).await?)
    }

    async fn post_comments(&self, post: &Item) -> Result<Vec<Item>> {
        Ok(self.post_comments(&post.id).await?)
    }

    async fn reply(&self, item: &Item, text: &str) -> Result<()> {
        Ok(self.reply(&item.fullname(), text).await?)
    }

    async fn identity(&self) -> Result<Option<String>> {
        Ok(self.me().await?)
    }

    fn can_reply(&self) -> bool {
        RedditClient::can_reply(self)
    }

    fn new_posts(&self, subreddits: &[String]) -> BoxStream<'static, Result<Item>> {
        self.stream_posts(subreddits)
            .map(|r| r.map_err(anyhow::Error::from))
            .boxed()
    }

    fn new_comments(&self, subreddits: &[String]) -> BoxStream<'static, Result<Item>> {
        self.stream_comments(subreddits)
            .map(|r| r.map_err(anyhow::Error::from))
            .boxed()
    }
}

// ---------------------------------------------------------------------------
// CardLookup
// ---------------------------------------------------------------------------

#[async_trait]
pub trait CardLookup: Send + Sync {
    /// Look a card up by name. `Ok(None)` when the source has nothing.
    async fn lookup(&self, name: &str) -> Result<Option<CardDetails>>;
}

#[async_trait]
impl CardLookup for RiftcodexClient {
    async fn lookup(&self, name: &str) -> Result<Option<CardDetails>> {
        Ok(self.search_card_details(name).await)
    }
}

#[async_trait]
impl CardLookup for FallbackClient {
    async fn lookup(&self, name: &str) -> Result<Option<CardDetails>> {
        Ok(self.search_card_details(name).await?)
    }
}
