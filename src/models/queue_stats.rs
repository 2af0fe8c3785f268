use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    pub pending: i64,
    pub in_progress: i64,
    pub posted: i64,
    pub failed: i64,
    pub total: i64,
}
