use clap::{ArgMatches, Command};
use cli_table::{print_stdout, Table, WithTitle};

use crate::commands::bootstrap::{orchestrator, CommandResult};
use crate::config::config::Config;
use crate::runtime::rollout::UpdateOutcome;

pub(crate) fn command_config() -> Command {
    Command::new("rollout")
        .about("Rebuild the instance image and recreate every managed container on it")
}

#[derive(Table)]
struct RolloutItem {
    #[table(title = "Container")]
    container: String,
    #[table(title = "Name")]
    name: String,
    #[table(title = "Outcome")]
    outcome: String,
    #[table(title = "Detail")]
    detail: String,
}

pub(crate) async fn execute(_args: &ArgMatches, configuration: Config) -> CommandResult {
    let orchestrator = orchestrator(&configuration).await?;
    let results = orchestrator.rollout().await?;

    let items: Vec<RolloutItem> = results
        .into_iter()
        .map(|result| {
            let (outcome, detail) = match result.outcome {
                UpdateOutcome::Updated { new_container_id, .. } => ("updated", new_container_id),
                UpdateOutcome::Skipped => ("skipped", "no instance record".to_string()),
                UpdateOutcome::Failed { error } => ("failed", error),
            };

            RolloutItem {
                container: result.container_id,
                name: result.container_name,
                outcome: outcome.to_string(),
                detail,
            }
        })
        .collect();

    print_stdout(items.with_title())?;

    Ok(())
}
