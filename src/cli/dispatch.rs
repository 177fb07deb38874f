//! Routes a parsed `Commands` variant to its subcommand module.

use anyhow::Result;
use wayfarer_config::ConfigSnapshot;

use super::args::{CliArgs, Commands};
use super::{record, replay, run, serve};
use crate::errors::ExitCode;

pub async fn dispatch(args: CliArgs, config: ConfigSnapshot) -> Result<ExitCode> {
    match args.command {
        Commands::Run { task, start_url, model_api_base, model_name } => {
            run::cmd_run(&config, &task, &start_url, model_api_base, model_name).await
        }
        Commands::Serve { bind } => serve::cmd_serve(&config, &bind).await,
        Commands::Replay { macro_id, macro_dir, start_url } => replay::cmd_replay(&config, &macro_id, &macro_dir, &start_url).await,
        Commands::Record { name, macro_dir } => record::cmd_record(&name, &macro_dir).await,
    }
}
