mod commands;

use anyhow::Result;
use clap::Parser;

use sparkcache::cli::{Cli, Commands};
use sparkcache::config_discovery::load_config_with_discovery;
use sparkcache::logging;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Configuration drives logging; a broken file is reported by the command
    let config = load_config_with_discovery(cli.config_path());
    match &config {
        Ok(config) => logging::init_from_config(&config.observability),
        Err(_) => logging::init(),
    }

    match cli.command {
        Commands::Status(args) => commands::status::run(&args, config?),
        Commands::Inspect(args) => commands::inspect::run(&args, config?),
        Commands::Config(args) => commands::config::run(args.command, config),
    }
}
