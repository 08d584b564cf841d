pub mod build_log;
pub mod data_dir;
pub mod demux;
pub mod docker;
pub mod error;
pub mod image;
pub mod manager;
pub mod rollout;
pub mod runtime;
pub mod stats;
pub mod status;
pub mod types;

#[cfg(test)]
pub(crate) mod fake;
