mod artifact;
mod backend;
mod breakdown;
mod cli;
mod client;
mod commands;
mod config;
mod error;
mod figma;
mod items;
mod mapping;
mod markup;
mod output;
mod patch;
mod query;
mod reader;
mod responses;
mod types;
mod writer;

use std::io;

use clap::{CommandFactory, Parser};
use clap_complete::generate;

use cli::{Cli, Commands};
use client::AdoClient;
use config::Config;
use error::Result;
use std::error::Error;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        if matches!(e.status(), Some(401 | 403)) {
            eprintln!("Hint: the PAT was rejected; check that it is valid and has Work Items access");
        }

        // Show error chain if verbose flag was passed
        if std::env::args().any(|arg| arg == "--verbose" || arg == "-v") {
            let mut source = e.source();
            while let Some(cause) = source {
                eprintln!("Caused by: {cause}");
                source = std::error::Error::source(cause);
            }
        }

        std::process::exit(1);
    }
}

fn setup_logging(verbose: bool, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    let default = if verbose {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    // Set global output format
    output::set_json_output(cli.json);
    output::set_quiet(cli.quiet);

    match cli.command {
        // Commands that don't require credentials
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "ado-sync", &mut io::stdout());
        }
        Commands::Init => {
            commands::init::run(cli.config.as_deref()).await?;
        }
        Commands::Mapping { file } => {
            let config = Config::load(cli.config.as_deref())?;
            commands::mapping::show(&config, file)?;
        }
        Commands::Push(args) => {
            let config = Config::load(cli.config.as_deref())?;
            commands::push::run(&config, args).await?;
        }
        // Commands that require credentials and a client
        command => {
            let config = Config::load(cli.config.as_deref())?;
            let client = AdoClient::new(config.credentials()?);

            match command {
                Commands::Pull(args) => {
                    commands::pull::run(&client, args).await?;
                }
                Commands::Children { id } => {
                    commands::children::list(&client, id).await?;
                }
                Commands::Check => {
                    commands::check::run(&client).await?;
                }
                Commands::Update(args) => {
                    commands::update::run(&client, args).await?;
                }
                Commands::Attach(args) => {
                    commands::attach::run(&client, args).await?;
                }
                Commands::Validate(args) => {
                    commands::bundle::validate(&client, &config, args).await?;
                }
                Commands::Enrich(args) => {
                    commands::bundle::enrich(&client, &config, args).await?;
                }
                Commands::Completions { .. }
                | Commands::Init
                | Commands::Mapping { .. }
                | Commands::Push(_) => {
                    // Already handled above
                }
            }
        }
    }

    Ok(())
}
