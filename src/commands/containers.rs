use clap::{ArgMatches, Command};
use cli_table::{print_stdout, Table, WithTitle};

use crate::commands::bootstrap::{orchestrator, CommandResult};
use crate::config::config::Config;

pub(crate) fn command_config() -> Command {
    Command::new("containers")
        .about("List the managed containers")
}

#[derive(Table)]
struct ContainerItem {
    #[table(title = "ID")]
    id: String,
    #[table(title = "Name")]
    name: String,
    #[table(title = "Instance")]
    instance: String,
    #[table(title = "Image")]
    image: String,
    #[table(title = "Status")]
    status: String,
}

pub(crate) async fn execute(_args: &ArgMatches, configuration: Config) -> CommandResult {
    let orchestrator = orchestrator(&configuration).await?;

    let items: Vec<ContainerItem> = orchestrator.manager
        .list_managed_containers()
        .await?
        .into_iter()
        .map(|container| ContainerItem {
            id: container.id.chars().take(12).collect(),
            name: container.name,
            instance: container.instance_id.unwrap_or_default(),
            image: container.image,
            status: container.status,
        })
        .collect();

    print_stdout(items.with_title())?;

    Ok(())
}
