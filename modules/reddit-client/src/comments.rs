// Comment tree flattening. Reddit returns comments as nested listings with
// `more` placeholders wherever the tree was truncated.

use serde_json::Value;

use crate::error::Result;
use crate::types::{CommentData, Item, Listing, MoreData, Thing};

/// Walk a comment forest depth-first, collecting comments in display order
/// and any `more` placeholders left to expand.
pub(crate) fn flatten(
    things: Vec<Thing>,
    comments: &mut Vec<Item>,
    pending: &mut Vec<MoreData>,
) -> Result<()> {
    for thing in things {
        match thing.kind.as_str() {
            "t1" => {
                let mut data: CommentData = serde_json::from_value(thing.data)?;
                let replies = std::mem::take(&mut data.replies);
                comments.push(data.into_item());
                if let Value::Object(_) = replies {
                    let listing: Listing = serde_json::from_value(replies)?;
                    flatten(listing.data.children, comments, pending)?;
                }
            }
            "more" => pending.push(serde_json::from_value(thing.data)?),
            _ => {}
        }
    }
    Ok(())
}

/// Drop repeated comment ids, keeping the first occurrence.
pub(crate) fn dedup_by_id(comments: &mut Vec<Item>) {
    let mut seen = std::collections::HashSet::new();
    comments.retain(|c| seen.insert(c.id.clone()));
}
