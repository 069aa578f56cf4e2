mod cli;
mod commands;
mod mcp;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use commands::split::SplitTarget;
use commands::PdfEngine;
use pagecraft::Config;
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: bool) {
    let default = if verbose { "pagecraft=debug" } else { "pagecraft=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    // stdout belongs to command output and the MCP transport.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = Config::load(cli.config.as_deref())?;
    let engine = PdfEngine::pdf(config);

    match cli.command {
        Commands::Mcp => {
            mcp::run_server(engine).await?;
        }
        Commands::Info { path } => {
            commands::info::run(&engine, &path).await?;
        }
        Commands::Merge { inputs, output } => {
            commands::merge::run(&engine, &inputs, &output).await?;
        }
        Commands::Split {
            path,
            mode,
            output_dir,
            zip,
        } => {
            let target = SplitTarget {
                output_dir: &output_dir,
                zip: zip.as_deref(),
            };
            commands::split::run(&engine, &path, &mode, target).await?;
        }
        Commands::Organize {
            path,
            order,
            output,
        } => {
            commands::organize::run(&engine, &path, &order, &output).await?;
        }
    }

    Ok(())
}
