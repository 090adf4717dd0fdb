use std::fmt;
use std::sync::Arc;

use reddit_client::Item;
use tracing::{info, warn};

use crate::traits::Forum;

/// Separator between card messages in a combined reply.
pub const REPLY_DIVIDER: &str = "\n\n---\n\n";

/// What `maybe_reply` did for an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyOutcome {
    Disabled,
    NoCredentials,
    NothingToSend,
    OwnItem,
    Posted,
    Failed,
}

impl fmt::Display for ReplyOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ReplyOutcome::Disabled => "disabled",
            ReplyOutcome::NoCredentials => "no_credentials",
            ReplyOutcome::NothingToSend => "nothing_to_send",
            ReplyOutcome::OwnItem => "own_item",
            ReplyOutcome::Posted => "posted",
            ReplyOutcome::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// Posts one combined reply per item, when allowed.
pub struct ReplyDispatcher {
    forum: Arc<dyn Forum>,
    enabled: bool,
    identity: Option<String>,
}

impl ReplyDispatcher {
    pub fn new(forum: Arc<dyn Forum>, enabled: bool, identity: Option<String>) -> Self {
        Self {
            forum,
            enabled,
            identity,
        }
    }

    /// Build a dispatcher, asking the forum who we are. An identity that
    /// cannot be determined is left unknown and replies still go out.
    pub async fn connect(forum: Arc<dyn Forum>, enabled: bool) -> Self {
        let identity = if enabled && forum.can_reply() {
            match forum.identity().await {
                Ok(identity) => identity,
                Err(e) => {
                    warn!(error = %e, "Could not determine bot identity; self-reply check disabled");
                    None
                }
            }
        } else {
            None
        };

        if let Some(name) = &identity {
            info!(identity = %name, "Replying as");
        }
        Self::new(forum, enabled, identity)
    }

    pub fn identity(&self) -> Option<&str> {
        self.identity.as_deref()
    }

    pub async fn maybe_reply(&self, item: &Item, messages: &[String]) -> ReplyOutcome {
        if !self.enabled {
            return ReplyOutcome::Disabled;
        }
        if !self.forum.can_reply() {
            return ReplyOutcome::NoCredentials;
        }
        if messages.is_empty() {
            return ReplyOutcome::NothingToSend;
        }
        if let (Some(me), Some(author)) = (self.identity.as_deref(), item.author.as_deref()) {
            if me.eq_ignore_ascii_case(author) {
                return ReplyOutcome::OwnItem;
            }
        }

        let text = messages.join(REPLY_DIVIDER);
        match self.forum.reply(item, &text).await {
            Ok(()) => {
                info!(item = %item.fullname(), cards = messages.len(), "Replied");
                ReplyOutcome::Posted
            }
            Err(e) => {
                warn!(item = %item.fullname(), error = %e, "Failed to reply");
                ReplyOutcome::Failed
            }
        }
    }
}
