// Shared per-item processing: gate on the processed set, extract card tags,
// resolve them through the cache, print, then reply.

use std::sync::Arc;

use reddit_client::{Item, ItemKind};
use tracing::{debug, info, warn};

use crate::dedup::{ProcessedSet, ResolutionCache};
use crate::reply::{ReplyDispatcher, ReplyOutcome};
use crate::resolver::CardResolver;
use crate::tags::{extract_tags, unique_tags};
use crate::traits::Forum;

/// Comment previews on the console are cut to this many characters.
const PREVIEW_CHARS: usize = 140;

/// What happened to one newly processed item.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemReport {
    pub fullname: String,
    /// Unique tags in first-seen order.
    pub tags: Vec<String>,
    pub messages: Vec<String>,
    pub reply: ReplyOutcome,
}

pub struct Pipeline {
    forum: Arc<dyn Forum>,
    processed: ProcessedSet,
    cache: ResolutionCache,
    resolver: CardResolver,
    replies: ReplyDispatcher,
}

impl Pipeline {
    pub fn new(forum: Arc<dyn Forum>, resolver: CardResolver, replies: ReplyDispatcher) -> Self {
        Self {
            forum,
            processed: ProcessedSet::new(),
            cache: ResolutionCache::new(),
            resolver,
            replies,
        }
    }

    pub fn processed(&self) -> &ProcessedSet {
        &self.processed
    }

    pub fn cache(&self) -> &ResolutionCache {
        &self.cache
    }

    /// Process an item once. Returns `None` if it was already processed.
    /// A fresh post also pulls in every comment it already has.
    pub async fn process(&self, item: &Item) -> Option<ItemReport> {
        let report = self.handle(item).await?;
        if item.kind == ItemKind::Post {
            self.process_comments(item).await;
        }
        Some(report)
    }

    async fn process_comments(&self, post: &Item) {
        let comments = match self.forum.post_comments(post).await {
            Ok(comments) => comments,
            Err(e) => {
                warn!(post = %post.fullname(), error = %e, "Failed to expand comments; skipping them");
                return;
            }
        };
        debug!(post = %post.fullname(), count = comments.len(), "Processing existing comments");
        for comment in &comments {
            self.handle(comment).await;
        }
    }

    async fn handle(&self, item: &Item) -> Option<ItemReport> {
        let fullname = item.fullname();
        if !self.processed.should_process(&fullname) {
            return None;
        }

        let tags = unique_tags(extract_tags(&item.text()));
        println!("{}", console_line(item, &tags));
        info!(
            item = %fullname,
            subreddit = %item.subreddit,
            author = item.author.as_deref().unwrap_or("[unknown]"),
            ?tags,
            "Processing item"
        );

        let mut messages = Vec::with_capacity(tags.len());
        for tag in &tags {
            let resolver = &self.resolver;
            let message = self
                .cache
                .get_or_resolve(tag, |name| async move { resolver.resolve(&name).await })
                .await;
            println!("{message}");
            messages.push(message);
        }

        let reply = self.replies.maybe_reply(item, &messages).await;
        Some(ItemReport {
            fullname,
            tags,
            messages,
            reply,
        })
    }
}

/// One console line per item: id, title or body preview, and its tags.
pub fn console_line(item: &Item, tags: &[String]) -> String {
    match item.kind {
        ItemKind::Post => format!(
            "[submission] {} :: {} :: tags={:?}",
            item.id,
            item.title.as_deref().unwrap_or_default(),
            tags
        ),
        ItemKind::Comment => {
            let preview: String = item
                .body
                .replace('\n', " ")
                .chars()
                .take(PREVIEW_CHARS)
                .collect();
            format!("[comment] {} :: {} :: tags={:?}", item.id, preview, tags)
        }
    }
}
