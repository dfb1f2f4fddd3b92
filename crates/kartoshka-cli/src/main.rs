//! CLI entry point - the composition root.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use kartoshka_cli::handlers::download::DownloadArgs;
use kartoshka_cli::handlers::playlist::PlaylistArgs;
use kartoshka_cli::{Cli, CliConfig, CliError, Commands, bootstrap, handlers};

fn init_logging(verbose: bool) -> anyhow::Result<()> {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!(e))
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = CliConfig {
        backend: cli.backend,
        download_dir: cli.dir,
    };
    let mut ctx = bootstrap(config)?;

    match cli.command {
        Commands::Info { url } => handlers::info::execute(&mut ctx, &url).await,
        Commands::Download {
            url,
            quality,
            format,
            one_shot,
        } => {
            let args = DownloadArgs {
                url: &url,
                quality: quality.as_deref(),
                format: format.as_deref(),
                one_shot,
            };
            handlers::download::execute(&mut ctx, args).await
        }
        Commands::Playlist {
            url,
            quality,
            format,
            select,
            current,
        } => {
            let args = PlaylistArgs {
                url: &url,
                quality: quality.as_deref(),
                format: format.as_deref(),
                select: select.as_deref(),
                current,
            };
            handlers::playlist::execute(&mut ctx, args).await
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    if let Err(err) = run(cli).await {
        eprintln!("Error: {err}");
        std::process::exit(err.exit_code());
    }
    Ok(())
}
