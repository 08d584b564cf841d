use clap::{Arg, ArgMatches, Command};

use crate::commands::bootstrap::{orchestrator, CommandResult};
use crate::config::config::Config;

pub(crate) fn command_config() -> Command {
    Command::new("status")
        .about("Show the detailed status of a container")
        .arg(
            Arg::new("container")
                .required(true)
        )
}

pub(crate) async fn execute(args: &ArgMatches, configuration: Config) -> CommandResult {
    let container = args.get_one::<String>("container").ok_or("missing container")?;
    let orchestrator = orchestrator(&configuration).await?;

    let status = orchestrator.manager.get_detailed_status(container).await;
    println!("{}", serde_json::to_string_pretty(&status)?);

    Ok(())
}
