use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use costplane_worker::audit;
use costplane_worker::config::WorkerConfig;
use costplane_worker::scheduler::Scheduler;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "costplane_worker=debug,costplane_engine=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = WorkerConfig::from_env();
    let pool = costplane_db::create_pool(&config.database_url).await?;
    costplane_db::run_migrations(&pool).await?;

    let scheduler = Scheduler::new(pool, &config);
    let cancel = CancellationToken::new();

    let audit_task = tokio::spawn(audit::run(scheduler.event_bus(), cancel.clone()));

    tokio::select! {
        _ = scheduler.run(cancel.clone()) => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received shutdown signal");
            cancel.cancel();
        }
    }

    cancel.cancel();
    let _ = audit_task.await;
    Ok(())
}
