use clap::{CommandFactory, Parser};
use photosphere::logging;

mod cli;

use cli::{execute_command, Cli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match &cli.command {
        Some(command) => {
            let output = execute_command(&cli, command).await?;
            println!("{}", output);
        }
        None => Cli::command().print_help()?,
    }

    Ok(())
}
