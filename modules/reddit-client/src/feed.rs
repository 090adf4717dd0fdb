// Live feeds over the `/new` and `/comments` listings.
//
// Reddit has no push API, so a feed polls the listing on a fixed interval and
// yields only items it has not yielded before. The first successful poll
// records the existing backlog without yielding it.

use std::collections::{HashSet, VecDeque};

use futures::Stream;
use tracing::debug;

use crate::error::Result;
use crate::types::Item;
use crate::{RedditClient, LISTING_MAX};


/// How many recently seen ids a feed remembers.
const SEEN_CAPACITY: usize = 1_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedKind {
    Posts,
    Comments,
}

/// Insertion-ordered set that forgets its oldest entries past `capacity`.
pub(crate) struct SeenWindow {
    order: VecDeque<String>,
    ids: HashSet<String>,
    capacity: usize,
}

impl SeenWindow {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            order: VecDeque::with_capacity(capacity),
            ids: HashSet::with_capacity(capacity),
            capacity,
        }
    }

    /// Record `id`. Returns false if it was already present.
    pub(crate) fn insert(&mut self, id: &str) -> bool {
        if self.ids.contains(id) {
            return false;
        }
        if self.order.len() == self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.ids.remove(&oldest);
            }
        }
        self.order.push_back(id.to_string());
        self.ids.insert(id.to_string());
        true
    }
}

struct FeedState {
    client: RedditClient,
    kind: FeedKind,
    subreddits: Vec<String>,
    seen: SeenWindow,
    buffer: VecDeque<Item>,
    primed: bool,
    polled: bool,
}

impl FeedState {
    /// Fetch one listing and queue unseen items, oldest first.
    async fn poll(&mut self) -> Result<()> {
        let newest_first = match self.kind {
            FeedKind::Posts => self.client.new_posts(&self.subreddits, LISTING_MAX).await?,
            FeedKind::Comments => self.client.new_comments(&self.subreddits, LISTING_MAX).await?,
        };

        let mut fresh = 0usize;
        for item in newest_first.into_iter().rev() {
            if self.seen.insert(&item.fullname()) && self.primed {
                self.buffer.push_back(item);
                fresh += 1;
            }
        }
        if !self.primed {
            debug!(kind = ?self.kind, "Feed primed, skipped existing backlog");
        }
        self.primed = true;
        if fresh > 0 {
            debug!(kind = ?self.kind, fresh, "Feed picked up new items");
        }
        Ok(())
    }
}

impl RedditClient {
    /// Unbounded feed of new items from the combined subreddits. Poll
    /// failures are yielded as errors and polling continues.
    pub fn feed(
        &self,
        kind: FeedKind,
        subreddits: &[String],
    ) -> impl Stream<Item = Result<Item>> + Send + 'static {
        let interval = self.poll_interval();
        let state = FeedState {
            client: self.clone(),
            kind,
            subreddits: subreddits.to_vec(),
            seen: SeenWindow::new(SEEN_CAPACITY),
            buffer: VecDeque::new(),
            primed: false,
            polled: false,
        };

        futures::stream::unfold(state, move |mut state| async move {
            loop {
                if let Some(item) = state.buffer.pop_front() {
                    return Some((Ok(item), state));
                }
                if state.polled {
                    tokio::time::sleep(interval).await;
                }
                state.polled = true;
                if let Err(e) = state.poll().await {
                    return Some((Err(e), state));
                }
            }
        })
    }

    /// New posts, skipping those that existed when the feed started.
    pub fn stream_posts(
        &self,
        subreddits: &[String],
    ) -> impl Stream<Item = Result<Item>> + Send + 'static {
        self.feed(FeedKind::Posts, subreddits)
    }

    /// New comments, skipping those that existed when the feed started.
    pub fn stream_comments(
        &self,
        subreddits: &[String],
    ) -> impl Stream<Item = Result<Item>> + Send + 'static {
        self.feed(FeedKind::Comments, subreddits)
    }
}
