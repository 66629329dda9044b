//! Point d'entrée CLI pour poi-conflate

use anyhow::Result;
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::{fmt, EnvFilter};

// Charger .env au démarrage (endpoint Overpass, proxy)
fn load_env() {
    // Chercher .env dans le répertoire courant ou parent
    if dotenvy::dotenv().is_err() {
        // Essayer depuis le répertoire du binaire
        if let Ok(exe) = std::env::current_exe() {
            if let Some(dir) = exe.parent() {
                let _ = dotenvy::from_path(dir.join(".env"));
            }
        }
    }
}

mod cli;
mod config;
mod error;
mod io;
mod overpass;

use cli::{Commands, PipelineArgs};

/// Conflation d'objets d'infrastructure sociale : source distante + fichier local
#[derive(Parser)]
#[command(name = "poi-conflate")]
#[command(author, version)]
#[command(about = "Fusionner les objets d'infrastructure sociale d'une source distante et d'un fichier local")]
#[command(long_about = "Interroge la source distante pour un lieu, normalise et projette le \
résultat, puis le fusionne avec un fichier local faisant autorité.\n\nPar défaut, exécute le \
pipeline complet. Utilisez 'fetch' ou 'conflate' pour une seule étape.")]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    /// Augmenter la verbosité (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Mode silencieux
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Sous-commande (défaut : pipeline complet)
    #[command(subcommand)]
    command: Option<Commands>,

    /// Arguments du pipeline complet (commande par défaut)
    #[command(flatten)]
    pipeline: Option<PipelineArgs>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Charger .env avant tout
    load_env();

    let cli = Cli::parse();

    // Configurer le logging
    init_logging(cli.verbose, cli.quiet);

    match cli.command {
        Some(Commands::Fetch {
            place,
            output,
            filter,
        }) => {
            info!(place = %place, filter = %filter, "Fetch distant");
            cli::cmd_fetch(&place, output.as_deref(), &filter).await?;
        }
        Some(Commands::Conflate {
            local,
            remote,
            output,
        }) => {
            info!(local = %local.display(), remote = %remote.display(), "Conflation");
            cli::cmd_conflate(&local, &remote, &output)?;
        }
        None => {
            // Commande par défaut : pipeline complet
            let args = cli
                .pipeline
                .expect("Arguments du pipeline requis (--place et --local)");
            info!(place = %args.place, local = %args.local.display(), "Pipeline complet");
            cli::cmd_run(&args).await?;
        }
    }

    Ok(())
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => Level::WARN,
        (_, 0) => Level::INFO,
        (_, 1) => Level::DEBUG,
        (_, _) => Level::TRACE,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .init();
}
