use std::env;
use std::fs;
use std::time::Duration;
use serde::Deserialize;
use toml::de::Error as TomlError;

use crate::config;
use crate::config::units::{parse_duration, parse_memory_string};

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub(crate) struct Config {
    pub(crate) docker: DockerSettings,
    pub(crate) images: ImageSettings,
    pub(crate) instances: InstanceSettings,
    pub(crate) enforcer: EnforcerSettings,
    pub(crate) api: config::api::Api,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub(crate) struct DockerSettings {
    pub(crate) socket: String,
}

impl Default for DockerSettings {
    fn default() -> Self {
        DockerSettings {
            socket: "/var/run/docker.sock".to_string(),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub(crate) struct ImageSettings {
    pub(crate) base: String,
    pub(crate) instance: String,
    pub(crate) context: String,
    pub(crate) base_dockerfile: String,
    pub(crate) instance_dockerfile: String,
    pub(crate) build_timeout: String,
    pub(crate) log_throttle: String,
}

impl Default for ImageSettings {
    fn default() -> Self {
        ImageSettings {
            base: "botyard-base:latest".to_string(),
            instance: "botyard-instance:latest".to_string(),
            context: "./docker".to_string(),
            base_dockerfile: "Dockerfile.base".to_string(),
            instance_dockerfile: "Dockerfile".to_string(),
            build_timeout: "30m".to_string(),
            log_throttle: "5s".to_string(),
        }
    }
}

impl ImageSettings {
    pub(crate) fn build_timeout(&self) -> Duration {
        duration_or(&self.build_timeout, Duration::from_secs(30 * 60))
    }

    pub(crate) fn log_throttle(&self) -> Duration {
        duration_or(&self.log_throttle, Duration::from_secs(5))
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub(crate) struct InstanceSettings {
    pub(crate) data_root: String,
    pub(crate) mount_path: String,
    pub(crate) memory_limit: String,
    pub(crate) cpus: f64,
    pub(crate) dns: Vec<String>,
}

impl Default for InstanceSettings {
    fn default() -> Self {
        InstanceSettings {
            data_root: "/var/lib/botyard/instances".to_string(),
            mount_path: "/data".to_string(),
            memory_limit: "2Gi".to_string(),
            cpus: 1.0,
            dns: vec!["8.8.8.8".to_string(), "1.1.1.1".to_string()],
        }
    }
}

impl InstanceSettings {
    pub(crate) fn memory_bytes(&self) -> i64 {
        match parse_memory_string(&self.memory_limit) {
            Ok(bytes) => bytes,
            Err(e) => {
                error!("{}, falling back to 2Gi", e);
                2 * 1024 * 1024 * 1024
            }
        }
    }

    pub(crate) fn nano_cpus(&self) -> i64 {
        (self.cpus * 1_000_000_000.0) as i64
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub(crate) struct EnforcerSettings {
    pub(crate) interval: String,
    pub(crate) grace_period: String,
}

impl Default for EnforcerSettings {
    fn default() -> Self {
        EnforcerSettings {
            interval: "60s".to_string(),
            grace_period: "0s".to_string(),
        }
    }
}

impl EnforcerSettings {
    pub(crate) fn interval(&self) -> Duration {
        duration_or(&self.interval, Duration::from_secs(60))
    }

    pub(crate) fn grace_period(&self) -> Duration {
        duration_or(&self.grace_period, Duration::ZERO)
    }
}

fn duration_or(value: &str, fallback: Duration) -> Duration {
    match parse_duration(value) {
        Ok(duration) => duration,
        Err(e) => {
            error!("{}, falling back to {:?}", e, fallback);
            fallback
        }
    }
}

pub(crate) fn get_config_dir() -> String {
    match env::var("BOTYARD_CONFIG_DIR") {
        Ok(variable) => variable,
        Err(_) => format!("{}/.config/botyard", env::var("HOME").unwrap_or_else(|_| ".".to_string())),
    }
}

pub(crate) fn parse_config(contents: &str) -> Result<Config, TomlError> {
    toml::from_str(contents)
}

pub(crate) fn load_config() -> Config {
    let file = format!("{}/config.toml", get_config_dir());

    debug!("load config file {}", file);

    if let Ok(contents) = fs::read_to_string(&file) {
        match parse_config(&contents) {
            Ok(config) => return config,
            Err(err) => {
                error!("Error while deserializing the TOML file : {}", err);
            }
        }
    }

    debug!("Switch to default configuration");

    Config::default()
}
