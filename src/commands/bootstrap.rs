use std::error::Error;
use std::sync::Arc;

use crate::config::config::Config;
use crate::database::init_database_connection;
use crate::orchestration::Orchestrator;
use crate::runtime::docker::connect_runtime;

pub(crate) type CommandResult = Result<(), Box<dyn Error>>;

/// Opens the database and the daemon connection every command works with.
pub(crate) async fn orchestrator(configuration: &Config) -> Result<Arc<Orchestrator>, Box<dyn Error>> {
    let pool = init_database_connection().await?;
    let runtime = connect_runtime(configuration)?;

    Ok(Arc::new(Orchestrator::from_config(pool, runtime, configuration)))
}
