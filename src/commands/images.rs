use clap::{ArgMatches, Command};

use crate::commands::bootstrap::{orchestrator, CommandResult};
use crate::config::config::Config;

pub(crate) fn command_config() -> Command {
    Command::new("images")
        .about("Manage the base and instance images")
        .subcommand_required(true)
        .subcommand(Command::new("ensure").about("Build whichever image is missing"))
        .subcommand(Command::new("rebuild").about("Rebuild the instance image without cache"))
}

pub(crate) async fn execute(args: &ArgMatches, configuration: Config) -> CommandResult {
    let orchestrator = orchestrator(&configuration).await?;
    let images = orchestrator.builder.images();

    match args.subcommand_name() {
        Some("rebuild") => {
            orchestrator.builder.force_rebuild_instance_image().await?;
            println!("Rebuilt {}", images.instance);
        }
        _ => {
            orchestrator.builder.ensure_images_ready().await?;
            println!("{} and {} are ready", images.base, images.instance);
        }
    }

    Ok(())
}
