//! Per-organization run orchestration.
//!
//! One run covers every registered module for one organization. Modules
//! are independent: a configuration error skips the module with a
//! warning, a data-store error aborts that module's run (retried at the
//! next scheduled tick), and neither touches the other modules. Each
//! module commits atomically, so the previous run's baseline survives
//! any abort.

use std::collections::{HashMap, HashSet};
use std::time::Instant;

use uuid::Uuid;

use costplane_core::archive::ArchiveReason;
use costplane_db::repositories::{OptimizationRepo, ResourceRepo, DEFAULT_CHUNK_SIZE};
use costplane_events::LifecycleEvent;

use crate::archive::{reclassify, ReclassifyInputs};
use crate::context::DetectionContext;
use crate::detector::{ModuleKind, RunInputs};
use crate::error::EngineError;
use crate::options;
use crate::selector;

/// Summary of one committed module run.
#[derive(Debug)]
pub struct RunReport {
    pub organization_id: Uuid,
    pub module: ModuleKind,
    pub candidates: usize,
    pub archived: usize,
    pub archived_by_reason: HashMap<ArchiveReason, usize>,
    pub duration_ms: u64,
}

/// Run every registered module for one organization.
///
/// Returns reports for the module runs that committed. Skipped and
/// aborted modules are logged, never silently dropped.
pub async fn run_organization(ctx: &DetectionContext) -> Vec<RunReport> {
    let mut reports = Vec::with_capacity(ModuleKind::ALL.len());

    for kind in ModuleKind::ALL {
        match run_module(ctx, kind).await {
            Ok(report) => {
                tracing::info!(
                    organization_id = %ctx.organization_id,
                    module = %kind,
                    candidates = report.candidates,
                    archived = report.archived,
                    duration_ms = report.duration_ms,
                    "Module run committed",
                );
                reports.push(report);
            }
            Err(e) if e.is_configuration() => {
                tracing::warn!(
                    organization_id = %ctx.organization_id,
                    module = %kind,
                    error = %e,
                    "Module skipped: invalid configuration",
                );
            }
            Err(e) => {
                tracing::error!(
                    organization_id = %ctx.organization_id,
                    module = %kind,
                    error = %e,
                    "Module run aborted; will retry next tick",
                );
            }
        }
    }

    reports
}

/// One (organization, module) run: detect, reclassify, commit, publish.
pub async fn run_module(
    ctx: &DetectionContext,
    kind: ModuleKind,
) -> Result<RunReport, EngineError> {
    let started = Instant::now();
    let detector = kind.detector();
    let module = kind.as_str();

    let options = options::resolve(
        &ctx.pool,
        ctx.organization_id,
        module,
        &detector.option_schema(),
    )
    .await?;

    let accounts = selector::select_accounts(
        &ctx.pool,
        ctx.organization_id,
        detector.supported_cloud_types(),
        &HashSet::new(),
    )
    .await?;

    // The previous run's full active set, loaded read-only before any
    // writes for the current run.
    let previous = OptimizationRepo::list_active(&ctx.pool, ctx.organization_id, module).await?;

    let inputs = RunInputs { accounts, options };
    let outcome = detector.detect(ctx, &inputs).await?;

    let current_keys: HashSet<Uuid> =
        outcome.candidates.iter().map(|c| c.resource_id).collect();
    let previous_ids: Vec<Uuid> = previous.iter().map(|p| p.resource_id).collect();
    let live_resources =
        ResourceRepo::snapshot_by_ids(&ctx.pool, &previous_ids, DEFAULT_CHUNK_SIZE).await?;

    let applied: HashMap<Uuid, String> = previous
        .iter()
        .filter_map(|p| {
            live_resources
                .get(&p.resource_id)
                .and_then(|live| detector.recommendation_applied(p, live))
                .map(|description| (p.resource_id, description))
        })
        .collect();

    let archived = reclassify(&ReclassifyInputs {
        previous: &previous,
        current_keys: &current_keys,
        eligible_accounts: &inputs.accounts,
        live_resources: &live_resources,
        failed_dependencies: &outcome.failed_dependencies,
        irrelevant: &outcome.irrelevant,
        applied: &applied,
        now: ctx.now,
    });

    OptimizationRepo::commit_run(
        &ctx.pool,
        ctx.organization_id,
        module,
        ctx.now,
        &outcome.candidates,
        &archived,
    )
    .await?;

    // Events go out only after the transaction committed.
    let mut archived_by_reason: HashMap<ArchiveReason, usize> = HashMap::new();
    for row in &archived {
        *archived_by_reason.entry(row.reason).or_insert(0) += 1;
        ctx.events.publish(LifecycleEvent::archived(
            row.organization_id,
            row.cloud_account_id,
            module,
            row.resource_id,
            row.reason,
            &row.description,
        ));
    }

    Ok(RunReport {
        organization_id: ctx.organization_id,
        module: kind,
        candidates: outcome.candidates.len(),
        archived: archived.len(),
        archived_by_reason,
        duration_ms: started.elapsed().as_millis() as u64,
    })
}
