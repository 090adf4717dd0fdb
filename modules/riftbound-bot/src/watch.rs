// Live watchers: one task per feed, both pushing into the shared pipeline.

use std::sync::Arc;

use anyhow::{Context, Result};
use futures::stream::{BoxStream, StreamExt};
use reddit_client::Item;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::pipeline::Pipeline;
use crate::traits::Forum;

/// Per-watcher counters, returned when a feed ends.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WatchStats {
    pub items: usize,
    pub processed: usize,
    pub errors: usize,
}

/// Drain one feed through the pipeline until it ends. Feed errors are
/// logged and the watcher keeps going.
pub async fn watch(
    name: &'static str,
    mut feed: BoxStream<'static, Result<Item>>,
    pipeline: Arc<Pipeline>,
) -> WatchStats {
    let mut stats = WatchStats::default();
    info!(watcher = name, "Watcher started");

    while let Some(next) = feed.next().await {
        match next {
            Ok(item) => {
                stats.items += 1;
                if pipeline.process(&item).await.is_some() {
                    stats.processed += 1;
                }
            }
            Err(e) => {
                stats.errors += 1;
                warn!(watcher = name, error = %e, "Feed poll failed");
            }
        }
    }

    warn!(watcher = name, ?stats, "Feed ended");
    stats
}

fn spawn_watcher(
    name: &'static str,
    feed: BoxStream<'static, Result<Item>>,
    pipeline: Arc<Pipeline>,
) -> JoinHandle<WatchStats> {
    tokio::spawn(watch(name, feed, pipeline))
}

/// Run the post and comment watchers side by side and wait for both.
pub async fn run_watchers(
    forum: Arc<dyn Forum>,
    pipeline: Arc<Pipeline>,
    subreddits: &[String],
) -> Result<(WatchStats, WatchStats)> {
    info!(subreddits = %subreddits.join("+"), "Starting live watchers");

    let posts = spawn_watcher("submission-stream", forum.new_posts(subreddits), pipeline.clone());
    let comments = spawn_watcher("comment-stream", forum.new_comments(subreddits), pipeline);

    let (posts, comments) = tokio::join!(posts, comments);
    let posts = posts.context("submission watcher panicked")?;
    let comments = comments.context("comment watcher panicked")?;
    Ok((posts, comments))
}
