use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use reddit_client::{Credentials, RedditClient};
use riftbound_bot::{run_backfill, run_watchers, CardLookup, CardResolver, Forum, Pipeline, ReplyDispatcher};
use riftbound_common::Config;
use riftcodex_client::{FallbackClient, RiftcodexClient};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("riftbound=info".parse()?)
                .add_directive("reddit_client=info".parse()?)
                .add_directive("riftcodex_client=info".parse()?),
        )
        .init();

    info!("Riftbound card bot starting...");

    let config = Config::from_env()?;
    config.log_redacted();

    // Reddit
    let credentials = Credentials {
        client_id: config.reddit_client_id.clone(),
        client_secret: config.reddit_client_secret.clone(),
        user_agent: config.reddit_user_agent.clone(),
        username: config.reddit_username.clone(),
        password: config.reddit_password.clone(),
    };
    let reddit = RedditClient::authenticate(credentials)
        .await
        .context("Reddit authentication failed")?
        .with_poll_interval(config.stream_poll_interval);
    let forum: Arc<dyn Forum> = Arc::new(reddit);

    // Card APIs: primary always, fallback only when fully configured
    let primary: Arc<dyn CardLookup> = Arc::new(RiftcodexClient::new(&config.riftbound_host));
    let fallback: Option<Arc<dyn CardLookup>> = match FallbackClient::from_parts(
        config.fallback_host.as_deref(),
        config.fallback_path_template.as_deref(),
    )
    .context("Invalid fallback card API configuration")?
    {
        Some(client) => {
            info!("Fallback card API enabled");
            let client: Arc<dyn CardLookup> = Arc::new(client);
            Some(client)
        }
        None => {
            info!("No APITCG_HOST/APITCG_PATH_TEMPLATE set, fallback card API disabled");
            None
        }
    };
    let resolver = CardResolver::new(primary, fallback);

    let replies = ReplyDispatcher::connect(forum.clone(), config.reply_enabled).await;
    info!(enabled = config.reply_enabled, "Reply dispatcher ready");

    let pipeline = Arc::new(Pipeline::new(forum.clone(), resolver, replies));

    let stats = run_backfill(
        forum.as_ref(),
        &pipeline,
        &config.subreddits,
        config.backfill_limit,
        config.backfill_delay,
    )
    .await;
    info!(%stats, "Backfill finished, switching to live feeds");

    let (posts, comments) = run_watchers(forum, pipeline, &config.subreddits).await?;
    info!(?posts, ?comments, "Both feeds ended, shutting down");

    Ok(())
}
