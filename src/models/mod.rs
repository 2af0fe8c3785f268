pub mod queue_item;
pub mod queue_stats;

pub use queue_item::{NewQueueItem, QueueItem, QueueStatus};
pub use queue_stats::QueueStats;
