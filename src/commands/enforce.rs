use chrono::Utc;
use clap::{ArgMatches, Command};

use crate::commands::bootstrap::{orchestrator, CommandResult};
use crate::config::config::Config;
use crate::scheduler::enforcer::sweep;

pub(crate) fn command_config() -> Command {
    Command::new("enforce")
        .about("Run one subscription enforcement sweep")
}

pub(crate) async fn execute(_args: &ArgMatches, configuration: Config) -> CommandResult {
    let orchestrator = orchestrator(&configuration).await?;
    let grace = chrono::Duration::from_std(configuration.enforcer.grace_period())?;

    let report = sweep(&orchestrator, Utc::now(), grace).await?;

    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
