//! Réglages NSPD (proxy, timeout, ordre des coordonnées)
//!
//! Même forme que l'objet `nspd_settings` des réglages de l'organisation.
//! Sources, de la plus faible à la plus forte : variables d'environnement,
//! fichier JSON, options de la ligne de commande.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use nspd::{ClientConfig, CoordsOrder, DEFAULT_TIMEOUT_MS};

/// Réglages NSPD
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct NspdSettings {
    /// Ancien champ unique, conservé pour compatibilité
    #[serde(default)]
    pub proxy: Option<String>,

    /// Proxy authentifié (login:password@host:port)
    #[serde(default)]
    pub proxy_auth: Option<String>,

    /// Proxy simple (ip:port)
    #[serde(default)]
    pub proxy_simple: Option<String>,

    #[serde(default)]
    pub timeout_ms: Option<u64>,

    /// "lat,lon" ou "lon,lat"
    #[serde(default)]
    pub coords_order: Option<String>,
}

/// Fichier de réglages : objet nu ou ligne `organization_settings`
#[derive(Deserialize)]
#[serde(untagged)]
enum SettingsFile {
    Wrapped { nspd_settings: NspdSettings },
    Bare(NspdSettings),
}

impl NspdSettings {
    /// Charge les réglages depuis un fichier JSON
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read settings file: {}", path.display()))?;

        let file: SettingsFile =
            serde_json::from_str(&content).context("Failed to parse settings JSON")?;
        Ok(match file {
            SettingsFile::Wrapped { nspd_settings } => nspd_settings,
            SettingsFile::Bare(settings) => settings,
        })
    }

    /// Charge les réglages depuis les variables d'environnement
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Charge les réglages via une fonction de lecture des variables
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_blank = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            proxy: non_blank("NSPD_PROXY"),
            proxy_auth: non_blank("NSPD_PROXY_AUTH"),
            proxy_simple: non_blank("NSPD_PROXY_SIMPLE"),
            timeout_ms: non_blank("NSPD_TIMEOUT_MS").and_then(|v| v.trim().parse().ok()),
            coords_order: non_blank("NSPD_COORDS_ORDER"),
        }
    }

    /// Superpose `other` : ses champs renseignés remplacent les nôtres
    pub fn merge(self, other: NspdSettings) -> Self {
        Self {
            proxy: other.proxy.or(self.proxy),
            proxy_auth: other.proxy_auth.or(self.proxy_auth),
            proxy_simple: other.proxy_simple.or(self.proxy_simple),
            timeout_ms: other.timeout_ms.or(self.timeout_ms),
            coords_order: other.coords_order.or(self.coords_order),
        }
    }

    /// Proxy effectif : proxy_auth, puis proxy_simple, puis proxy
    pub fn proxy_url(&self) -> Option<&str> {
        [&self.proxy_auth, &self.proxy_simple, &self.proxy]
            .into_iter()
            .filter_map(|p| p.as_deref())
            .map(str::trim)
            .find(|p| !p.is_empty())
    }

    pub fn timeout_ms(&self) -> u64 {
        self.timeout_ms
            .filter(|ms| *ms > 0)
            .unwrap_or(DEFAULT_TIMEOUT_MS)
    }

    pub fn coords_order(&self) -> CoordsOrder {
        self.coords_order
            .as_deref()
            .map(CoordsOrder::normalize)
            .unwrap_or_default()
    }

    /// Configuration du client NSPD correspondante
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::default()
            .with_proxy(self.proxy_url())
            .with_timeout_ms(self.timeout_ms())
            .with_coords_order(self.coords_order())
    }
}
