use std::sync::Arc;

use storage::repository::Storage;

use crate::Clock;
use crate::drill_service::DrillService;
use crate::error::AppServicesError;
use crate::stats_service::StatsService;

/// Assembles the services a front end needs over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    drills: Arc<DrillService>,
    stats: Arc<StatsService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        seed: Option<u64>,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::from_storage(&storage, clock, seed))
    }

    /// Build services over volatile storage.
    #[must_use]
    pub fn in_memory(clock: Clock) -> Self {
        Self::from_storage(&Storage::in_memory(), clock, None)
    }

    fn from_storage(storage: &Storage, clock: Clock, seed: Option<u64>) -> Self {
        let mut drills = DrillService::from_storage(clock, storage);
        if let Some(seed) = seed {
            drills = drills.with_seed(seed);
        }
        let stats = drills.stats().clone();
        Self {
            drills: Arc::new(drills),
            stats: Arc::new(stats),
        }
    }

    #[must_use]
    pub fn drills(&self) -> Arc<DrillService> {
        Arc::clone(&self.drills)
    }

    #[must_use]
    pub fn stats(&self) -> Arc<StatsService> {
        Arc::clone(&self.stats)
    }
}
