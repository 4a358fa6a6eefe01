use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use tracing::info;

use crate::db::Store;

pub const ABANDONED_ERROR: &str = "abandoned: no terminal status recorded";

/// Fails send logs left `pending` by a delivery task that never finished,
/// for example because the process restarted mid-retry.
#[derive(Clone)]
pub struct ReconcileService {
    store: Store,
    stale_after: Duration,
}

impl ReconcileService {
    #[must_use]
    pub fn new(store: Store, stale_pending_minutes: i64) -> Self {
        Self {
            store,
            stale_after: Duration::minutes(stale_pending_minutes),
        }
    }

    pub async fn sweep(&self) -> Result<u64> {
        self.sweep_at(Utc::now()).await
    }

    pub async fn sweep_at(&self, now: DateTime<Utc>) -> Result<u64> {
        let cutoff = now - self.stale_after;
        let failed = self
            .store
            .email_log_repo()
            .fail_stale_pending(cutoff, ABANDONED_ERROR)
            .await?;

        if failed > 0 {
            info!(
                event = "reconcile_sweep",
                failed,
                cutoff = %cutoff,
                "Failed abandoned pending send logs"
            );
        }

        Ok(failed)
    }
}
