use clap::{ArgMatches, Command};
use tokio::task;

use crate::api::server as ApiServer;
use crate::commands::bootstrap::{orchestrator, CommandResult};
use crate::config::config::Config;
use crate::scheduler::enforcer;

pub(crate) fn command_config() -> Command {
    Command::new("server")
        .about("Serve the HTTP API and run the subscription enforcer")
}

pub(crate) async fn execute(_args: &ArgMatches, configuration: Config) -> CommandResult {
    info!("Start server");

    let orchestrator = orchestrator(&configuration).await?;

    let warmup = orchestrator.clone();
    task::spawn(async move {
        if let Err(e) = warmup.builder.ensure_images_ready().await {
            warn!("Images are not ready yet: {}", e);
        }
    });

    let enforcer_handler = task::spawn(enforcer::run(
        orchestrator.clone(),
        configuration.enforcer.interval(),
        configuration.enforcer.grace_period(),
    ));

    let result = ApiServer::start(orchestrator, configuration).await;
    enforcer_handler.abort();

    Ok(result?)
}
