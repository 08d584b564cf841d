use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::time::{Duration, MissedTickBehavior};

use crate::models::instances::{self, Instance};
use crate::models::subscriptions;
use crate::orchestration::{OrchestrationError, Orchestrator};
use crate::runtime::types::{ContainerSnapshot, InstanceStatus};

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub(crate) struct SweepReport {
    pub(crate) stopped: Vec<String>,
    pub(crate) reconciled: Vec<String>,
    pub(crate) failed: Vec<String>,
}

impl SweepReport {
    pub(crate) fn is_empty(&self) -> bool {
        self.stopped.is_empty() && self.reconciled.is_empty() && self.failed.is_empty()
    }
}

/// Returns whether a container had to be stopped.
async fn enforce_instance(orchestrator: &Orchestrator, instance: &Instance) -> Result<bool, OrchestrationError> {
    let container_id = match &instance.container_id {
        Some(container_id) => container_id,
        None => {
            instances::update_status(&orchestrator.pool, &instance.id, InstanceStatus::Stopped).await?;
            return Ok(false);
        }
    };

    // Decided on the raw run flags: a running but unhealthy container still runs.
    let snapshot = match orchestrator.manager.inspect(container_id).await {
        Ok(snapshot) => snapshot,
        Err(e) if e.is_not_found() => ContainerSnapshot::default(),
        Err(e) => return Err(e.into()),
    };

    if !snapshot.running && !snapshot.restarting {
        debug!("Instance {} is not running in the runtime", instance.id);
        instances::update_status(&orchestrator.pool, &instance.id, InstanceStatus::Stopped).await?;
        return Ok(false);
    }

    orchestrator.manager.stop_instance(container_id).await?;
    instances::mark_stopped(&orchestrator.pool, &instance.id).await?;

    info!("Stopped instance {} of {} (subscription lapsed)", instance.id, instance.owner_identity);
    Ok(true)
}

/// One enforcement pass: stop every live instance whose owner's subscription
/// lapsed. Containers are stopped, never removed.
pub(crate) async fn sweep(
    orchestrator: &Orchestrator,
    now: DateTime<Utc>,
    grace: chrono::Duration,
) -> Result<SweepReport, sqlx::Error> {
    let _guard = orchestrator.exclusive().await;

    let lapsed = subscriptions::find_lapsed(&orchestrator.pool, now, grace).await?;
    let mut report = SweepReport::default();

    for subscription in lapsed {
        let live = instances::find_by_owner_with_status(
            &orchestrator.pool,
            &subscription.owner_identity,
            &[InstanceStatus::Running, InstanceStatus::Pending, InstanceStatus::Restarting],
        )
        .await;

        let live = match live {
            Ok(live) => live,
            Err(e) => {
                error!("Cannot list instances of {}: {}", subscription.owner_identity, e);
                report.failed.push(subscription.owner_identity);
                continue;
            }
        };

        for instance in live {
            match enforce_instance(orchestrator, &instance).await {
                Ok(true) => report.stopped.push(instance.id),
                Ok(false) => report.reconciled.push(instance.id),
                Err(e) => {
                    error!("Enforcement of instance {} failed: {}", instance.id, e);
                    report.failed.push(instance.id);
                }
            }
        }
    }

    Ok(report)
}

/// Sweeps right away, then once per `interval`. A sweep always finishes
/// before the next one starts.
pub(crate) async fn run(orchestrator: Arc<Orchestrator>, interval: Duration, grace: Duration) {
    let grace = chrono::Duration::from_std(grace).unwrap_or_else(|_| chrono::Duration::zero());
    let mut ticker = tokio::time::interval(interval.max(Duration::from_secs(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!("Starting subscription enforcer every {:?}", interval);

    loop {
        ticker.tick().await;

        match sweep(&orchestrator, Utc::now(), grace).await {
            Ok(report) if report.is_empty() => debug!("Enforcement sweep: nothing to do"),
            Ok(report) => info!(
                "Enforcement sweep: {} stopped, {} reconciled, {} failed",
                report.stopped.len(),
                report.reconciled.len(),
                report.failed.len()
            ),
            Err(e) => error!("Enforcement sweep failed: {}", e),
        }
    }
}
