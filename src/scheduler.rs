use anyhow::Result;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::Duration;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

use crate::config::DeliveryConfig;
use crate::services::ReconcileService;

pub struct Scheduler {
    reconcile: ReconcileService,
    config: DeliveryConfig,
    running: Arc<RwLock<bool>>,
}

impl Scheduler {
    #[must_use]
    pub fn new(reconcile: ReconcileService, config: DeliveryConfig) -> Self {
        Self {
            reconcile,
            config,
            running: Arc::new(RwLock::new(false)),
        }
    }

    /// Runs the reconciliation sweep on `delivery.reconcile_cron` until
    /// [`Scheduler::stop`] is called.
    pub async fn start(&self) -> Result<()> {
        if !self.config.reconcile_enabled {
            info!("Reconciliation sweep is disabled in config");
            return Ok(());
        }

        *self.running.write().await = true;

        let mut sched = JobScheduler::new().await?;

        let reconcile = self.reconcile.clone();
        let running = Arc::clone(&self.running);

        let job = Job::new_async(self.config.reconcile_cron.as_str(), move |_uuid, _lock| {
            let reconcile = reconcile.clone();
            let running = Arc::clone(&running);
            Box::pin(async move {
                if !*running.read().await {
                    return;
                }
                if let Err(e) = reconcile.sweep().await {
                    error!("Scheduled reconciliation sweep failed: {}", e);
                }
            })
        })?;

        sched.add(job).await?;
        sched.start().await?;

        info!(
            "Scheduler running reconciliation with cron: {}",
            self.config.reconcile_cron
        );

        loop {
            if !*self.running.read().await {
                break;
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
        }

        sched.shutdown().await?;
        Ok(())
    }

    pub async fn stop(&self) {
        info!("Stopping scheduler...");
        *self.running.write().await = false;
    }

    pub async fn is_running(&self) -> bool {
        *self.running.read().await
    }

    pub async fn run_once(&self) -> Result<u64> {
        info!("Running manual reconciliation sweep...");
        self.reconcile.sweep().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Store;

    #[tokio::test]
    async fn disabled_sweep_returns_immediately() {
        let path = std::env::temp_dir().join(format!("xyno-sched-{}.db", uuid::Uuid::new_v4()));
        let store = Store::new(&format!("sqlite:{}", path.display()))
            .await
            .unwrap();

        let config = DeliveryConfig {
            reconcile_enabled: false,
            ..DeliveryConfig::default()
        };
        let scheduler = Scheduler::new(ReconcileService::new(store, 30), config);

        scheduler.start().await.unwrap();
        assert!(!scheduler.is_running().await);
        assert_eq!(scheduler.run_once().await.unwrap(), 0);

        let _ = std::fs::remove_file(path);
    }
}
