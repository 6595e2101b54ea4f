mod commands;

use anyhow::Result;
use clap::Parser;

use spindle_cli::{Cli, Commands, verbosity_to_log_level};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = verbosity_to_log_level(cli.verbose);
    unsafe {
        std::env::set_var("RUST_LOG", log_level);
    }
    env_logger::init();

    match cli.command {
        Commands::Run(args) => commands::run::run(args).await,
        Commands::Download {
            model,
            force,
            token,
        } => commands::model::download(&model, force, token).await,
        Commands::List => commands::model::list(),
        Commands::Delete { model, yes } => commands::model::delete(&model, yes),
        Commands::Mock(args) => commands::mock::run(args),
    }
}
