use std::sync::Arc;

use lingo_core::model::LeaderboardEntry;

use crate::backend::ExerciseBackend;
use crate::error::BackendError;

pub const DEFAULT_LEADERBOARD_LIMIT: u32 = 20;
pub const MAX_LEADERBOARD_LIMIT: u32 = 100;

#[derive(Clone)]
pub struct LeaderboardService {
    backend: Arc<dyn ExerciseBackend>,
}

impl LeaderboardService {
    #[must_use]
    pub fn new(backend: Arc<dyn ExerciseBackend>) -> Self {
        Self { backend }
    }

    /// Fetch the top entries, ordered by rank. `None` uses the default page size.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the request fails.
    pub async fn top(&self, limit: Option<u32>) -> Result<Vec<LeaderboardEntry>, BackendError> {
        let limit = limit
            .unwrap_or(DEFAULT_LEADERBOARD_LIMIT)
            .clamp(1, MAX_LEADERBOARD_LIMIT);
        let mut entries = self.backend.leaderboard(limit).await?;
        entries.sort_by_key(|entry| entry.rank);
        entries.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(entries)
    }
}
