use std::io::Write;

use clap::{Parser, Subcommand};

use crate::error::{CliError, Result};
use crate::render::{RenderArgs, kinds_table, run_render};

#[derive(Debug, Parser)]
#[command(
    name = "trellis",
    about = "Render trellis element-descriptor trees to HTML",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Render a descriptor tree to a complete HTML page.
    Render(RenderArgs),

    /// Print the property-kind table as JSON.
    Kinds,
}

pub fn run_from_env() -> Result<()> {
    let cli = Cli::parse();
    run(cli)
}

pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Render(args) => run_render(&args),
        Commands::Kinds => {
            let table = serde_json::to_string_pretty(&kinds_table())
                .map_err(|e| CliError::Render(e.into()))?;
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{table}").map_err(CliError::io("<stdout>"))
        }
    }
}
