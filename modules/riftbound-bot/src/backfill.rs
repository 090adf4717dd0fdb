use std::fmt;
use std::time::Duration;

use tracing::{info, warn};

use crate::pipeline::Pipeline;
use crate::traits::Forum;

/// Counters for one startup backfill.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BackfillStats {
    pub posts_fetched: usize,
    pub posts_processed: usize,
    pub listing_failures: usize,
}

impl fmt::Display for BackfillStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} posts fetched, {} processed, {} listing failures",
            self.posts_fetched, self.posts_processed, self.listing_failures
        )
    }
}

/// Walk the newest `limit` posts of each subreddit once, pausing `delay`
/// after each post. A subreddit whose listing fails is skipped.
pub async fn run_backfill(
    forum: &dyn Forum,
    pipeline: &Pipeline,
    subreddits: &[String],
    limit: u32,
    delay: Duration,
) -> BackfillStats {
    let mut stats = BackfillStats::default();

    for subreddit in subreddits {
        let posts = match forum.recent_posts(subreddit, limit).await {
            Ok(posts) => posts,
            Err(e) => {
                warn!(subreddit = %subreddit, error = %e, "Backfill listing failed; skipping subreddit");
                stats.listing_failures += 1;
                continue;
            }
        };
        info!(subreddit = %subreddit, count = posts.len(), "Backfilling recent posts");
        stats.posts_fetched += posts.len();

        for post in &posts {
            if pipeline.process(post).await.is_some() {
                stats.posts_processed += 1;
            }
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
    }

    info!(%stats, "Backfill complete");
    stats
}
