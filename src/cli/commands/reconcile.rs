use crate::config::Config;
use crate::db::Store;
use crate::scheduler::Scheduler;
use crate::services::ReconcileService;

pub async fn cmd_reconcile(config: &Config) -> anyhow::Result<()> {
    let store = Store::new(&config.general.database_path).await?;
    let reconcile = ReconcileService::new(store, config.delivery.stale_pending_minutes);
    let scheduler = Scheduler::new(reconcile, config.delivery.clone());

    let failed = scheduler.run_once().await?;

    if failed == 0 {
        println!("No stale pending sends.");
    } else {
        println!("Marked {failed} stale pending send(s) as failed.");
    }

    Ok(())
}
