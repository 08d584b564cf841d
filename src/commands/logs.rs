use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use futures::StreamExt;

use crate::commands::bootstrap::{orchestrator, CommandResult};
use crate::config::config::Config;

pub(crate) fn command_config() -> Command {
    Command::new("logs")
        .about("Print the output of a container")
        .arg(
            Arg::new("container")
                .required(true)
        )
        .arg(
            Arg::new("tail")
                .long("tail")
                .short('n')
                .help("Number of lines from the end")
                .value_parser(value_parser!(u32))
                .default_value("100")
        )
        .arg(
            Arg::new("follow")
                .long("follow")
                .short('f')
                .help("Keep printing new lines until interrupted")
                .action(ArgAction::SetTrue)
        )
}

pub(crate) async fn execute(args: &ArgMatches, configuration: Config) -> CommandResult {
    let container = args.get_one::<String>("container").ok_or("missing container")?;
    let tail = args.get_one::<u32>("tail").copied();
    let orchestrator = orchestrator(&configuration).await?;

    if !args.get_flag("follow") {
        print!("{}", orchestrator.manager.get_logs(container, tail).await?);
        return Ok(());
    }

    let mut lines = orchestrator.manager.stream_logs(container, tail).await?;

    loop {
        tokio::select! {
            line = lines.next() => match line {
                Some(line) => println!("{}", line?),
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                lines.cancel();
                break;
            }
        }
    }

    Ok(())
}
