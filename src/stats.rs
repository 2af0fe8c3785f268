use uuid::Uuid;

use crate::models::{QueueStats, QueueStatus};
use crate::store::{QueueStore, StoreError};

/// Per-status queue counts for one user.
///
/// The four counts are separate reads, so under concurrent processing they
/// may describe slightly different moments. `total` is always their sum.
pub async fn get_queue_stats(
    store: &dyn QueueStore,
    user_id: Uuid,
) -> Result<QueueStats, StoreError> {
    let (pending, in_progress, posted, failed) = tokio::try_join!(
        store.count(user_id, QueueStatus::Pending),
        store.count(user_id, QueueStatus::InProgress),
        store.count(user_id, QueueStatus::Posted),
        store.count(user_id, QueueStatus::Failed),
    )?;

    Ok(QueueStats {
        pending,
        in_progress,
        posted,
        failed,
        total: pending + in_progress + posted + failed,
    })
}
