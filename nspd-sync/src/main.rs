//! Point d'entrée CLI pour nspd-sync

use anyhow::Result;
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::{fmt, EnvFilter};

// Charger .env au démarrage
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

use cli::Commands;

/// Récupérer les géométries cadastrales du NSPD
#[derive(Parser)]
#[command(name = "nspd-sync")]
#[command(author, version)]
#[command(about = "Récupérer les parcelles du NSPD vers PostgreSQL ou GeoJSON")]
#[command(long_about = "Client du géoportail NSPD (cadastre russe).\n\nRecherche par numéro cadastral, centroïde géographique, statut foncier, synchronisation par lot avec délai entre les requêtes.")]
struct Cli {
    /// Augmenter la verbosité (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Mode silencieux
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Charger .env avant tout
    load_env();

    let cli = Cli::parse();

    // Configurer le logging
    init_logging(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Fetch {
            cadastral_number,
            json,
            network,
        } => {
            info!(cadastral_number = %cadastral_number, "Fetch NSPD");
            cli::cmd_fetch(&cadastral_number, json, &network).await?;
        }
        Commands::Sync {
            input,
            from_db,
            update_db,
            limit,
            delay_ms,
            output,
            report,
            network,
            db,
        } => {
            info!(input = ?input, from_db, output = ?output, "Sync NSPD");
            cli::cmd_sync(
                input.as_deref(),
                from_db,
                update_db,
                limit,
                delay_ms,
                output.as_deref(),
                report.as_deref(),
                &network,
                &db,
            )
            .await?;
        }
        Commands::CheckProxy { proxy, settings } => {
            cli::cmd_check_proxy(proxy.as_deref(), settings.as_deref()).await?;
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
