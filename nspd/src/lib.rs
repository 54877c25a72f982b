//! # nspd
//!
//! Client pour le géoportail NSPD (nspd.gov.ru), cadastre foncier russe.
//!
//! ## Features
//!
//! - Recherche d'une parcelle par numéro cadastral
//! - Connexion directe ou via proxy HTTP(S) authentifié
//! - Centroïde approximatif et passage en coordonnées géographiques
//! - Détection du statut foncier (ИЖС, ЛПХ, СНТ, ДНП)
//! - Erreurs typées, jamais de panique : adapté aux traitements par lot
//!
//! ## Usage
//!
//! ```rust,ignore
//! use nspd::{ClientConfig, CoordsOrder, NspdClient};
//!
//! let client = NspdClient::new(
//!     ClientConfig::default()
//!         .with_proxy(Some("1.2.3.4:8080:user:pass"))
//!         .with_coords_order(CoordsOrder::LatLon),
//! )?;
//!
//! match client.fetch("39:03:040036:328").await {
//!     Ok(record) => println!("{} {:?}", record.geometry_type, record.centroid),
//!     Err(e) => println!("{}: {}", e.kind(), e),
//! }
//! ```

pub mod client;
pub mod error;
pub mod geometry;
pub mod land_status;
pub mod proxy;
pub mod reproject;
pub mod types;

pub use client::{ClientConfig, NspdClient, Transport, DEFAULT_BASE_URL, DEFAULT_TIMEOUT_MS};
pub use error::{FailureKind, FetchError};
pub use land_status::{detect_land_status, LandStatus};
pub use proxy::{normalize_proxy, redact_proxy, ProxyEndpoint};
pub use types::{CadastralRecord, CoordsOrder, Geometry, Position};

/// Recherche ponctuelle d'une parcelle, sans réutiliser de client
///
/// Pour un lot, construire un [`NspdClient`] une fois et appeler
/// [`NspdClient::fetch`] : le pool de connexions est alors partagé.
pub async fn fetch_by_cadastral_number(
    cadastral_number: &str,
    coords_order: CoordsOrder,
    proxy: Option<&str>,
    timeout_ms: u64,
) -> Result<CadastralRecord, FetchError> {
    let config = ClientConfig::default()
        .with_proxy(proxy)
        .with_timeout_ms(timeout_ms)
        .with_coords_order(coords_order);

    NspdClient::new(config)?.fetch(cadastral_number).await
}
