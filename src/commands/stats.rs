use clap::{Arg, ArgMatches, Command};
use cli_table::{print_stdout, Cell, Table};

use crate::commands::bootstrap::{orchestrator, CommandResult};
use crate::config::config::Config;

pub(crate) fn command_config() -> Command {
    Command::new("stats")
        .about("Sample the resource usage of a container")
        .arg(
            Arg::new("container")
                .required(true)
        )
}

pub(crate) async fn execute(args: &ArgMatches, configuration: Config) -> CommandResult {
    let container = args.get_one::<String>("container").ok_or("missing container")?;
    let orchestrator = orchestrator(&configuration).await?;

    let stats = orchestrator.manager.get_container_stats(container).await?;

    let table = vec![
        vec!["CPU %".cell(), stats.cpu_percent.cell()],
        vec!["Memory (MB)".cell(), format!("{} / {}", stats.memory_usage_mb, stats.memory_limit_mb).cell()],
        vec!["Memory %".cell(), stats.memory_percent.cell()],
        vec!["Network rx (MB)".cell(), stats.network_rx_mb.cell()],
        vec!["Network tx (MB)".cell(), stats.network_tx_mb.cell()],
        vec!["PIDs".cell(), stats.pids.cell()],
    ]
    .table();

    print_stdout(table)?;

    Ok(())
}
