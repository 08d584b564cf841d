use clap::Command;

#[macro_use]
extern crate log;
extern crate env_logger;

mod commands {
  pub(crate) mod bootstrap;
  pub(crate) mod containers;
  pub(crate) mod enforce;
  pub(crate) mod images;
  pub(crate) mod logs;
  pub(crate) mod rollout;
  pub(crate) mod server;
  pub(crate) mod stats;
  pub(crate) mod status;
}

mod scheduler {
  pub(crate) mod enforcer;
}

mod runtime;

mod models {
  pub(crate) mod instances;
  pub(crate) mod subscriptions;
}

mod api {
  pub(crate) mod error;
  pub(crate) mod server;

  pub(crate) mod action {
    pub(crate) mod container;
    pub(crate) mod healthz;
    pub(crate) mod image;
    pub(crate) mod instance;
    pub(crate) mod rollout;
  }
}

mod config {
    pub(crate) mod api;
    pub(crate) mod config;
    pub(crate) mod units;
}

mod database;
mod orchestration;

#[cfg(test)]
mod fixtures;

#[tokio::main]
async fn main() {
    env_logger::init();

    let mut app = Command::new("botyard")
        .version("0.1.0")
        .about("Runs one isolated agent container per owner")
        .subcommand(commands::server::command_config())
        .subcommand(commands::images::command_config())
        .subcommand(commands::rollout::command_config())
        .subcommand(commands::enforce::command_config())
        .subcommand(commands::containers::command_config())
        .subcommand(commands::status::command_config())
        .subcommand(commands::logs::command_config())
        .subcommand(commands::stats::command_config());

    let matches = app.get_matches_mut();
    let config = config::config::load_config();

    let result = match matches.subcommand() {
        Some(("server", sub_matches)) => commands::server::execute(sub_matches, config).await,
        Some(("images", sub_matches)) => commands::images::execute(sub_matches, config).await,
        Some(("rollout", sub_matches)) => commands::rollout::execute(sub_matches, config).await,
        Some(("enforce", sub_matches)) => commands::enforce::execute(sub_matches, config).await,
        Some(("containers", sub_matches)) => commands::containers::execute(sub_matches, config).await,
        Some(("status", sub_matches)) => commands::status::execute(sub_matches, config).await,
        Some(("logs", sub_matches)) => commands::logs::execute(sub_matches, config).await,
        Some(("stats", sub_matches)) => commands::stats::execute(sub_matches, config).await,
        _ => app.print_help().map_err(Into::into),
    };

    if let Err(e) = result {
        error!("{}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
