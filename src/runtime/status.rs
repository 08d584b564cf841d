use serde::{Deserialize, Serialize};

use crate::runtime::types::{ContainerSnapshot, InstanceStatus};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct DetailedStatus {
    pub(crate) state: InstanceStatus,
    pub(crate) restart_count: i64,
    pub(crate) exit_code: i64,
    pub(crate) health_status: Option<String>,
}

pub(crate) fn resolve_status(snapshot: &ContainerSnapshot) -> InstanceStatus {
    if snapshot.restarting {
        return InstanceStatus::Restarting;
    }

    if snapshot.running {
        if !snapshot.has_healthcheck {
            return InstanceStatus::Running;
        }

        return match snapshot.health.as_deref() {
            Some("healthy") => InstanceStatus::Running,
            Some("unhealthy") => InstanceStatus::Error,
            _ => InstanceStatus::Pending,
        };
    }

    if snapshot.exit_code != 0 {
        InstanceStatus::Error
    } else {
        InstanceStatus::Stopped
    }
}

pub(crate) fn detailed_status(snapshot: &ContainerSnapshot) -> DetailedStatus {
    DetailedStatus {
        state: resolve_status(snapshot),
        restart_count: snapshot.restart_count,
        exit_code: snapshot.exit_code,
        health_status: snapshot.health.clone(),
    }
}

/// What operators see when the container could not be inspected at all.
pub(crate) fn unreachable_status() -> DetailedStatus {
    DetailedStatus {
        state: InstanceStatus::Error,
        restart_count: 0,
        exit_code: -1,
        health_status: None,
    }
}
