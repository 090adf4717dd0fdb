pub mod backfill;
pub mod dedup;
pub mod pipeline;
pub mod reply;
pub mod resolver;
pub mod tags;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod traits;
pub mod watch;

pub use backfill::{run_backfill, BackfillStats};
pub use pipeline::{ItemReport, Pipeline};
pub use reply::{ReplyDispatcher, ReplyOutcome};
pub use resolver::CardResolver;
pub use traits::{CardLookup, Forum};
pub use watch::{run_watchers, WatchStats};
