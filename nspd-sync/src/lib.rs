//! # nspd-sync
//!
//! Synchronisation des parcelles NSPD vers PostgreSQL ou GeoJSON.
//!
//! ## Features
//!
//! - Recherche ponctuelle d'une parcelle (test de connexion)
//! - Synchronisation par lot, depuis un fichier ou la table `land_plots`
//! - Export GeoJSON standalone
//! - Test de joignabilité d'un proxy
//!
//! ## Usage CLI
//!
//! ```bash
//! # Une parcelle
//! nspd-sync fetch 39:03:040036:328
//!
//! # Lot depuis un fichier, export GeoJSON
//! nspd-sync sync --input plots.txt --output plots.geojson
//!
//! # Parcelles sans coordonnées de la base
//! nspd-sync sync --from-db --limit 100 --report report.json
//!
//! # Proxy
//! nspd-sync check-proxy 1.2.3.4:8080:user:pass
//! ```

pub mod config;
pub mod export;
pub mod proxy_check;
pub mod report;
pub mod sync;

pub use config::NspdSettings;
pub use export::pool::{create_pool, DatabaseConfig};
pub use proxy_check::{check_proxy, ProxyCheck};
pub use report::{SyncReport, SyncStatus};
pub use sync::{run_batch, BatchOptions, RecordSink};
