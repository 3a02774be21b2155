//! romset CLI
//!
//! Builds one-game-one-ROM sets from DAT files.

mod cli_types;
mod commands;
mod error;
mod logging;

use clap::Parser;

use cli_types::{Cli, Commands, ConfigAction};
use error::CliError;

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Generate(args) => commands::generate::run_generate(&args, cli.quiet),
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config::run_config_show(),
            ConfigAction::Path => {
                commands::config::run_config_path();
                Ok(())
            }
            ConfigAction::Init => commands::config::run_config_init(),
        },
    }
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = logging::init(cli.quiet, cli.verbose, cli.logfile.as_deref()) {
        eprintln!("Cannot open log file: {e}");
        std::process::exit(2);
    }

    if let Err(e) = run(cli) {
        log::error!("{e}");
        std::process::exit(1);
    }
}
