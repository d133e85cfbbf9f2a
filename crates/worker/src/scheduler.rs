//! Scheduling tick loop and the per-organization worker pool.
//!
//! Every tick lists the organizations with live cloud accounts and
//! dispatches one detection run per organization onto a fixed-size pool.
//! Runs are logically independent; a failure in one neither blocks nor
//! corrupts another, and the loop runs until the cancellation token is
//! triggered.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use sqlx::PgPool;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use costplane_db::repositories::CloudAccountRepo;
use costplane_engine::{run_organization, DetectionContext};
use costplane_events::EventBus;
use costplane_services::{MetricsClient, PricingClient};

use crate::config::WorkerConfig;

/// The scheduled detection loop.
pub struct Scheduler {
    pool: PgPool,
    pricing: Arc<PricingClient>,
    metrics: Arc<MetricsClient>,
    events: Arc<EventBus>,
    currency: String,
    tick_interval: Duration,
    max_parallel_runs: usize,
}

impl Scheduler {
    pub fn new(pool: PgPool, config: &WorkerConfig) -> Self {
        let timeout = Duration::from_secs(config.request_timeout_secs);
        Self {
            pool,
            pricing: Arc::new(PricingClient::with_timeout(
                config.pricing_url.clone(),
                timeout,
            )),
            metrics: Arc::new(MetricsClient::with_timeout(
                config.metrics_url.clone(),
                timeout,
            )),
            events: Arc::new(EventBus::default()),
            currency: config.currency.clone(),
            tick_interval: Duration::from_secs(config.tick_interval_secs),
            max_parallel_runs: config.max_parallel_runs.max(1),
        }
    }

    /// The event bus carrying archive events, for attaching subscribers.
    pub fn event_bus(&self) -> Arc<EventBus> {
        Arc::clone(&self.events)
    }

    /// Run the scheduling loop until the cancellation token is triggered.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.tick_interval);
        tracing::info!(
            tick_interval_secs = self.tick_interval.as_secs(),
            max_parallel_runs = self.max_parallel_runs,
            "Detection scheduler started",
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Detection scheduler shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    self.tick().await;
                }
            }
        }
    }

    /// One scheduling tick: fan organizations out onto the worker pool
    /// and wait for every run to finish.
    async fn tick(&self) {
        let organizations = match CloudAccountRepo::organization_ids(&self.pool).await {
            Ok(ids) => ids,
            Err(e) => {
                tracing::error!(error = %e, "Failed to list organizations; tick skipped");
                return;
            }
        };
        if organizations.is_empty() {
            tracing::debug!("No organizations with live cloud accounts");
            return;
        }

        tracing::info!(count = organizations.len(), "Tick: dispatching organization runs");

        let limit = Arc::new(Semaphore::new(self.max_parallel_runs));
        let mut runs: JoinSet<()> = JoinSet::new();

        for organization_id in organizations {
            let permit = Arc::clone(&limit);
            let ctx = self.context_for(organization_id);
            runs.spawn(async move {
                let _permit = permit.acquire_owned().await.expect("semaphore not closed");
                let reports = run_organization(&ctx).await;
                let candidates: usize = reports.iter().map(|r| r.candidates).sum();
                let archived: usize = reports.iter().map(|r| r.archived).sum();
                tracing::info!(
                    organization_id = %organization_id,
                    modules = reports.len(),
                    candidates,
                    archived,
                    "Organization run finished",
                );
            });
        }

        while let Some(joined) = runs.join_next().await {
            if let Err(e) = joined {
                tracing::error!(error = %e, "Organization run panicked");
            }
        }
    }

    /// Fresh context for one organization run. `now` is pinned here so
    /// every module in the run shares one clock.
    fn context_for(&self, organization_id: Uuid) -> DetectionContext {
        DetectionContext {
            pool: self.pool.clone(),
            pricing: Arc::clone(&self.pricing),
            metrics: Arc::clone(&self.metrics),
            events: Arc::clone(&self.events),
            organization_id,
            currency: self.currency.clone(),
            now: Utc::now(),
        }
    }
}
