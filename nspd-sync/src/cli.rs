//! Définition et implémentation des commandes CLI
//!
//! - `fetch` : une parcelle, affichage du résultat (test de connexion)
//! - `sync` : lot de parcelles vers GeoJSON et/ou PostgreSQL
//! - `check-proxy` : joignabilité TCP d'un proxy

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use tracing::{info, warn};

use nspd::{detect_land_status, CadastralRecord, ClientConfig, CoordsOrder, NspdClient, Transport};
use nspd_sync::config::NspdSettings;
use nspd_sync::export::pool::{create_pool, test_connection, DatabaseConfig, DatabaseOverrides};
use nspd_sync::export::postgres::DEFAULT_TABLE;
use nspd_sync::export::{GeoJsonSink, LandPlotStore};
use nspd_sync::proxy_check::{check_proxy, CHECK_TIMEOUT};
use nspd_sync::sync::{read_cadastral_numbers, run_batch, BatchOptions, RecordSink, DEFAULT_DELAY_MS};
use nspd_sync::SyncStatus;

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch one parcel and print it (connection test)
    Fetch {
        /// Cadastral number, e.g. 39:03:040036:328
        cadastral_number: String,

        /// Print the full record as JSON
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        network: NetworkArgs,
    },

    /// Fetch a batch of parcels and store them
    Sync {
        /// Text file with one cadastral number per line
        #[arg(short, long, required_unless_present = "from_db", conflicts_with = "from_db")]
        input: Option<PathBuf>,

        /// Read active parcels without coordinates from the database
        #[arg(long)]
        from_db: bool,

        /// Also update the database when reading from a file
        #[arg(long)]
        update_db: bool,

        /// Maximum number of parcels read from the database
        #[arg(long, requires = "from_db")]
        limit: Option<i64>,

        /// Delay between two requests, in milliseconds
        #[arg(long, default_value_t = DEFAULT_DELAY_MS)]
        delay_ms: u64,

        /// GeoJSON output file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// JSON report file
        #[arg(long)]
        report: Option<PathBuf>,

        #[command(flatten)]
        network: NetworkArgs,

        #[command(flatten)]
        db: DbArgs,
    },

    /// Check that a proxy accepts TCP connections
    CheckProxy {
        /// Proxy (host:port, user:pass@host:port, host:port:user:pass); defaults to the configured one
        proxy: Option<String>,

        /// JSON settings file (bare object or row with `nspd_settings`)
        #[arg(long)]
        settings: Option<PathBuf>,
    },
}

/// Options réseau communes
#[derive(Args, Debug, Clone, Default)]
pub struct NetworkArgs {
    /// JSON settings file (bare object or row with `nspd_settings`)
    #[arg(long)]
    pub settings: Option<PathBuf>,

    /// Proxy overriding the configured ones
    #[arg(long)]
    pub proxy: Option<String>,

    /// Request timeout in milliseconds (défaut : env NSPD_TIMEOUT_MS / 15000)
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Centroid coordinate order: lat,lon or lon,lat
    #[arg(long)]
    pub coords_order: Option<CoordsOrder>,

    /// Search endpoint URL
    #[arg(long, hide = true)]
    pub base_url: Option<String>,
}

/// Options PostgreSQL
#[derive(Args, Debug, Clone, Default)]
pub struct DbArgs {
    /// Table holding the parcels
    #[arg(long, default_value = DEFAULT_TABLE)]
    pub table: String,

    /// PostgreSQL host (défaut : env PGHOST / localhost)
    #[arg(long)]
    pub host: Option<String>,

    /// PostgreSQL database name (défaut : env PGDATABASE / postgres)
    #[arg(long)]
    pub database: Option<String>,

    /// PostgreSQL user (défaut : env PGUSER / postgres)
    #[arg(long)]
    pub user: Option<String>,

    /// PostgreSQL password (défaut : env PGPASSWORD)
    #[arg(long)]
    pub password: Option<String>,

    /// PostgreSQL port (défaut : env PGPORT / 5432)
    #[arg(long)]
    pub port: Option<u16>,

    /// SSL mode: disable, prefer, require (défaut : env PGSSLMODE / disable)
    #[arg(long)]
    pub ssl: Option<String>,
}

impl DbArgs {
    fn overrides(&self) -> DatabaseOverrides {
        DatabaseOverrides {
            host: self.host.clone(),
            database: self.database.clone(),
            user: self.user.clone(),
            password: self.password.clone(),
            port: self.port,
            ssl: self.ssl.clone(),
        }
    }
}

/// Réglages effectifs : environnement, puis fichier
fn load_settings(path: Option<&Path>) -> Result<NspdSettings> {
    let settings = NspdSettings::from_env();
    match path {
        Some(path) => Ok(settings.merge(NspdSettings::load(path)?)),
        None => Ok(settings),
    }
}

/// Configuration du client : réglages puis options de la ligne de commande
fn client_config(network: &NetworkArgs) -> Result<ClientConfig> {
    let settings = load_settings(network.settings.as_deref())?;
    let mut config = settings.client_config();

    if let Some(proxy) = &network.proxy {
        config = config.with_proxy(Some(proxy.as_str()));
    }
    if let Some(ms) = network.timeout_ms {
        config = config.with_timeout_ms(ms);
    }
    if let Some(order) = network.coords_order {
        config = config.with_coords_order(order);
    }
    if let Some(url) = &network.base_url {
        config = config.with_base_url(url.as_str());
    }
    Ok(config)
}

fn build_client(network: &NetworkArgs) -> Result<NspdClient> {
    let client = NspdClient::new(client_config(network)?)?;
    if let Transport::DirectFallback { reason } = client.transport() {
        warn!("Proxy ignored, using a direct connection: {}", reason);
    }
    Ok(client)
}

/// Exécute la commande fetch
pub async fn cmd_fetch(cadastral_number: &str, json: bool, network: &NetworkArgs) -> Result<()> {
    let client = build_client(network)?;
    println!("Transport: {}", client.transport());

    match client.fetch(cadastral_number).await {
        Ok(record) if json => {
            println!("{}", serde_json::to_string_pretty(&record)?);
            Ok(())
        }
        Ok(record) => {
            print_record(&record);
            Ok(())
        }
        Err(e) => {
            println!("Failed: {}", e.kind());
            println!("{}", e);
            anyhow::bail!("Failed to fetch {}", cadastral_number)
        }
    }
}

fn print_record(record: &CadastralRecord) {
    let or_dash = |value: &Option<String>| value.clone().unwrap_or_else(|| "-".to_string());

    println!("Cadastral number: {}", record.cadastral_number);
    println!("Address: {}", or_dash(&record.address));
    match record.centroid {
        Some([a, b]) => println!("Centroid ({}): {:.6}, {:.6}", record.coords_order, a, b),
        None => println!("Centroid: -"),
    }
    println!("Geometry: {}", record.geometry_type);
    if let Some(crs) = &record.crs {
        println!("CRS: {}", crs);
    }
    println!("Land category: {}", or_dash(&record.land_category));
    println!("Permitted use: {}", or_dash(&record.permitted_use));
    if let Some(area) = record.area {
        println!(
            "Area: {} {}",
            area,
            record.area_unit.as_deref().unwrap_or_default()
        );
    }
    println!(
        "Land status: {}",
        detect_land_status(record).map(|s| s.label()).unwrap_or("-")
    );
}

/// Exécute la commande sync
#[allow(clippy::too_many_arguments)]
pub async fn cmd_sync(
    input: Option<&Path>,
    from_db: bool,
    update_db: bool,
    limit: Option<i64>,
    delay_ms: u64,
    output: Option<&Path>,
    report_path: Option<&Path>,
    network: &NetworkArgs,
    db: &DbArgs,
) -> Result<()> {
    let client = build_client(network)?;

    let store = if from_db || update_db {
        let mut db_config = DatabaseConfig::from_env();
        db_config.apply_overrides(db.overrides())?;
        println!(
            "Database: {}@{}:{}/{} (SSL: {:?})",
            db_config.user, db_config.host, db_config.port, db_config.dbname, db_config.ssl_mode
        );

        let pool = create_pool(&db_config).await?;
        test_connection(&pool).await?;
        println!("Connected to PostgreSQL");
        Some(LandPlotStore::new(pool, &db.table)?.require_existing_row(from_db))
    } else {
        None
    };

    let (source, numbers) = match (&store, input) {
        (Some(store), None) => (store.table().to_string(), store.pending(limit).await?),
        (_, Some(path)) => (path.display().to_string(), read_cadastral_numbers(path)?),
        (None, None) => anyhow::bail!("Use --input <file> or --from-db"),
    };

    if numbers.is_empty() {
        println!("No parcels to sync in {}", source);
        return Ok(());
    }

    let mut sinks: Vec<Box<dyn RecordSink>> = Vec::new();
    if let Some(store) = store {
        sinks.push(Box::new(store));
    }
    if let Some(path) = output {
        sinks.push(Box::new(GeoJsonSink::new(path)));
    }
    if sinks.is_empty() {
        warn!("No --output and no database: results are only reported");
    }

    println!("=== Sync {} ===", source);
    println!("Parcels: {}", numbers.len());
    println!("Transport: {}", client.transport());
    println!("Delay: {} ms", delay_ms);

    let options = BatchOptions {
        delay: Duration::from_millis(delay_ms),
    };
    let report = run_batch(&client, &source, &numbers, &options, &mut sinks).await;

    report.display();
    if let Some(path) = report_path {
        report
            .save_to_file(path)
            .context(format!("Failed to save report: {}", path.display()))?;
        info!("Report saved to {}", path.display());
    }
    info!("{}", report.summary());

    if report.status == SyncStatus::Failed {
        anyhow::bail!("Sync failed: {}", report.summary());
    }
    Ok(())
}

/// Exécute la commande check-proxy
pub async fn cmd_check_proxy(proxy: Option<&str>, settings: Option<&Path>) -> Result<()> {
    let configured = load_settings(settings)?;
    let raw = match proxy.or(configured.proxy_url()) {
        Some(raw) => raw.to_string(),
        None => anyhow::bail!("No proxy given and none configured"),
    };

    let result = check_proxy(&raw, CHECK_TIMEOUT).await;
    println!("{}", result.message);
    if !result.success {
        anyhow::bail!("Proxy check failed");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_config_overrides() {
        let network = NetworkArgs {
            proxy: Some("1.2.3.4:8080".into()),
            timeout_ms: Some(2500),
            coords_order: Some(CoordsOrder::LonLat),
            base_url: Some("http://127.0.0.1:9/search".into()),
            ..Default::default()
        };
        let config = client_config(&network).unwrap();

        assert_eq!(config.proxy.as_deref(), Some("1.2.3.4:8080"));
        assert_eq!(config.timeout, Duration::from_millis(2500));
        assert_eq!(config.coords_order, CoordsOrder::LonLat);
        assert_eq!(config.base_url, "http://127.0.0.1:9/search");
    }

    #[test]
    fn test_missing_settings_file() {
        let network = NetworkArgs {
            settings: Some(PathBuf::from("/nonexistent/settings.json")),
            ..Default::default()
        };
        assert!(client_config(&network).is_err());
    }
}
