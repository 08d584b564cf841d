use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

pub(crate) const LABEL_MANAGED: &str = "botyard.managed";
pub(crate) const LABEL_INSTANCE_ID: &str = "botyard.instance_id";
pub(crate) const LABEL_OWNER: &str = "botyard.owner";

/// Lifecycle state of an instance, derived from the runtime snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum InstanceStatus {
    Pending,
    Running,
    Restarting,
    Error,
    Stopped,
}

impl InstanceStatus {
    pub(crate) fn is_live(&self) -> bool {
        matches!(self, Self::Pending | Self::Running | Self::Restarting)
    }
}

impl fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Restarting => write!(f, "restarting"),
            Self::Error => write!(f, "error"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}

impl std::str::FromStr for InstanceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "running" => Ok(Self::Running),
            "restarting" => Ok(Self::Restarting),
            "error" => Ok(Self::Error),
            "stopped" => Ok(Self::Stopped),
            other => Err(format!("Unknown instance status: {}", other)),
        }
    }
}

/// Desired configuration of one owner's instance.
#[derive(Debug, Clone, PartialEq, Default)]
pub(crate) struct InstanceConfig {
    pub(crate) instance_id: String,
    pub(crate) owner_identity: String,
    pub(crate) secrets: BTreeMap<String, String>,
    pub(crate) model_name: Option<String>,
}

/// Raw state read from a container inspection.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct ContainerSnapshot {
    pub(crate) running: bool,
    pub(crate) restarting: bool,
    pub(crate) has_healthcheck: bool,
    pub(crate) health: Option<String>,
    pub(crate) exit_code: i64,
    pub(crate) restart_count: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ContainerSpec {
    pub(crate) name: String,
    pub(crate) image: String,
    pub(crate) env: Vec<String>,
    pub(crate) labels: HashMap<String, String>,
    pub(crate) host_path: String,
    pub(crate) mount_path: String,
    pub(crate) memory_bytes: i64,
    pub(crate) nano_cpus: i64,
    pub(crate) dns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct ManagedContainer {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) instance_id: Option<String>,
    pub(crate) status: String,
    pub(crate) image: String,
}

/// Counters from one non-streaming stats sample.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct RawStats {
    pub(crate) cpu_total: u64,
    pub(crate) precpu_total: u64,
    pub(crate) system_cpu: u64,
    pub(crate) presystem_cpu: u64,
    pub(crate) online_cpus: u32,
    pub(crate) memory_usage: u64,
    pub(crate) memory_limit: u64,
    pub(crate) networks: Vec<(u64, u64)>,
    pub(crate) pids: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trips_through_strings() {
        for status in [
            InstanceStatus::Pending,
            InstanceStatus::Running,
            InstanceStatus::Restarting,
            InstanceStatus::Error,
            InstanceStatus::Stopped,
        ] {
            assert_eq!(status.to_string().parse::<InstanceStatus>(), Ok(status));
        }

        assert!("CrashLoopBackOff".parse::<InstanceStatus>().is_err());
    }

    #[test]
    fn test_live_statuses() {
        assert!(InstanceStatus::Pending.is_live());
        assert!(InstanceStatus::Restarting.is_live());
        assert!(!InstanceStatus::Stopped.is_live());
        assert!(!InstanceStatus::Error.is_live());
    }
}
