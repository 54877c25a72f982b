//! Client HTTP du géoportail NSPD
//!
//! Le NSPD présente une chaîne de certificats invalide : la vérification TLS
//! est désactivée, mais uniquement sur le `reqwest::Client` dédié construit
//! ici. Le reste du processus n'est pas affecté.
//!
//! Le service rejette les requêtes sans en-têtes de navigateur réalistes,
//! d'où le jeu d'en-têtes complet de [`browser_headers`].

use std::error::Error as StdError;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::StatusCode;
use tracing::{debug, info, warn};

use crate::error::FetchError;
use crate::proxy::{normalize_proxy, redact_proxy};
use crate::reproject;
use crate::types::{
    number_property, text_property, CadastralRecord, CoordsOrder, Geometry, RawFeature,
    SearchResponse,
};

/// Endpoint de recherche du géoportail
pub const DEFAULT_BASE_URL: &str = "https://nspd.gov.ru/api/geoportal/v2/search/geoportal";

/// Timeout par défaut de la requête complète
pub const DEFAULT_TIMEOUT_MS: u64 = 15_000;

const BROWSER_HEADERS: &[(&str, &str)] = &[
    (
        "user-agent",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.0.0 Safari/537.36",
    ),
    ("accept", "*/*"),
    ("accept-language", "ru-RU,ru;q=0.9,en-US;q=0.8,en;q=0.7"),
    (
        "referer",
        "https://nspd.gov.ru/map?thematic=PKK&zoom=16&active_layers=36049",
    ),
    ("origin", "https://nspd.gov.ru"),
    (
        "sec-ch-ua",
        "\"Not(A:Brand\";v=\"8\", \"Chromium\";v=\"132\", \"Google Chrome\";v=\"132\"",
    ),
    ("sec-ch-ua-mobile", "?0"),
    ("sec-ch-ua-platform", "\"Windows\""),
    ("sec-fetch-dest", "empty"),
    ("sec-fetch-mode", "cors"),
    ("sec-fetch-site", "same-origin"),
    ("dnt", "1"),
    ("priority", "u=1, i"),
];

/// En-têtes imitant un navigateur sur nspd.gov.ru
pub fn browser_headers() -> HeaderMap {
    BROWSER_HEADERS
        .iter()
        .map(|&(name, value)| {
            (
                HeaderName::from_static(name),
                HeaderValue::from_static(value),
            )
        })
        .collect()
}

/// Configuration du client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// URL de l'endpoint de recherche
    pub base_url: String,

    /// Proxy brut (`host:port`, `user:pass@host:port`, `host:port:user:pass`)
    pub proxy: Option<String>,

    /// Timeout de la requête complète (connexion + réponse)
    pub timeout: Duration,

    /// Ordre des coordonnées du centroïde
    pub coords_order: CoordsOrder,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            proxy: None,
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            coords_order: CoordsOrder::default(),
        }
    }
}

impl ClientConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_proxy(mut self, proxy: Option<impl Into<String>>) -> Self {
        self.proxy = proxy.map(Into::into);
        self
    }

    /// Un timeout nul retombe sur la valeur par défaut
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        let ms = if timeout_ms == 0 {
            DEFAULT_TIMEOUT_MS
        } else {
            timeout_ms
        };
        self.timeout = Duration::from_millis(ms);
        self
    }

    pub fn with_coords_order(mut self, order: CoordsOrder) -> Self {
        self.coords_order = order;
        self
    }
}

/// Chemin réseau effectivement utilisé par le client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transport {
    /// Connexion directe
    Direct,
    /// Via le proxy (URL masquée)
    Proxied { proxy: String },
    /// Proxy inutilisable, repli en connexion directe
    DirectFallback { reason: String },
}

impl std::fmt::Display for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Direct => f.write_str("direct"),
            Self::Proxied { proxy } => write!(f, "proxy {}", proxy),
            Self::DirectFallback { reason } => write!(f, "direct (proxy ignored: {})", reason),
        }
    }
}

/// Client du géoportail NSPD
///
/// Sans état mutable : un clone partage le pool de connexions et peut être
/// utilisé en parallèle pour des numéros différents. Aucun retry interne,
/// le rythme des lots est à la charge de l'appelant.
#[derive(Debug, Clone)]
pub struct NspdClient {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
    coords_order: CoordsOrder,
    transport: Transport,
}

impl NspdClient {
    /// Construit le client et son transport
    ///
    /// Un proxy mal formé n'est pas une erreur : il est journalisé et le
    /// client passe en connexion directe.
    pub fn new(config: ClientConfig) -> Result<Self, FetchError> {
        let (http, transport) = match config.proxy.as_deref().and_then(normalize_proxy) {
            None => (build_http(config.timeout, None)?, Transport::Direct),
            Some(proxy_url) => {
                let redacted = redact_proxy(&proxy_url);
                let proxied = reqwest::Url::parse(&proxy_url)
                    .map_err(|e| format!("invalid proxy URL: {}", e))
                    .and_then(|url| {
                        reqwest::Proxy::all(url).map_err(|e| redact_proxy(&error_chain(&e)))
                    })
                    .and_then(|proxy| {
                        build_http(config.timeout, Some(proxy))
                            .map_err(|e| redact_proxy(&e.to_string()))
                    });

                match proxied {
                    Ok(http) => {
                        info!(proxy = %redacted, "Proxy configured");
                        (http, Transport::Proxied { proxy: redacted })
                    }
                    Err(reason) => {
                        warn!(
                            proxy = %redacted,
                            "Failed to configure proxy, falling back to direct connection: {}",
                            reason
                        );
                        (
                            build_http(config.timeout, None)?,
                            Transport::DirectFallback { reason },
                        )
                    }
                }
            }
        };

        Ok(Self {
            http,
            base_url: config.base_url,
            timeout: config.timeout,
            coords_order: config.coords_order,
            transport,
        })
    }

    /// Transport retenu à la construction
    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    pub fn coords_order(&self) -> CoordsOrder {
        self.coords_order
    }

    /// URL de recherche pour un numéro cadastral
    pub fn search_url(&self, cadastral_number: &str) -> String {
        format!(
            "{}?query={}",
            self.base_url,
            urlencoding::encode(cadastral_number)
        )
    }

    /// Recherche une parcelle avec l'ordre de coordonnées configuré
    pub async fn fetch(&self, cadastral_number: &str) -> Result<CadastralRecord, FetchError> {
        self.fetch_with_order(cadastral_number, self.coords_order)
            .await
    }

    /// Recherche une parcelle par numéro cadastral
    ///
    /// Une seule tentative ; un timeout est une [`FetchError::Network`].
    pub async fn fetch_with_order(
        &self,
        cadastral_number: &str,
        coords_order: CoordsOrder,
    ) -> Result<CadastralRecord, FetchError> {
        let result = self.request(cadastral_number, coords_order).await;
        if let Err(ref e) = result {
            warn!(
                cadastral_number,
                kind = %e.kind(),
                "Failed to fetch {}: {}",
                cadastral_number,
                e
            );
        }
        result
    }

    async fn request(
        &self,
        cadastral_number: &str,
        coords_order: CoordsOrder,
    ) -> Result<CadastralRecord, FetchError> {
        let url = self.search_url(cadastral_number);
        debug!(url = %url, transport = %self.transport, "NSPD search");

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| self.network_error(&e))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(FetchError::not_found(format!(
                "{} (HTTP {})",
                cadastral_number,
                status.as_u16()
            )));
        }
        if !status.is_success() {
            return Err(FetchError::UpstreamStatus {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or_default().to_string(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| self.network_error(&e))?;

        parse_search_response(&body, cadastral_number, coords_order)
    }

    fn network_error(&self, error: &reqwest::Error) -> FetchError {
        if error.is_timeout() {
            FetchError::Network(format!(
                "request timed out after {} ms: {}",
                self.timeout.as_millis(),
                error_chain(error)
            ))
        } else {
            FetchError::Network(error_chain(error))
        }
    }
}

/// Client dédié au NSPD : certificats non vérifiés, en-têtes navigateur
fn build_http(timeout: Duration, proxy: Option<reqwest::Proxy>) -> Result<reqwest::Client, FetchError> {
    let builder = reqwest::Client::builder()
        .default_headers(browser_headers())
        .danger_accept_invalid_certs(true)
        .timeout(timeout);

    let builder = match proxy {
        Some(proxy) => builder.proxy(proxy),
        None => builder.no_proxy(),
    };

    builder
        .build()
        .map_err(|e| FetchError::network(format!("failed to build HTTP client: {}", error_chain(&e))))
}

/// Message d'erreur avec toute la chaîne des causes
fn error_chain(error: &dyn StdError) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}

/// Interprète la réponse JSON du géoportail (première feature uniquement)
pub fn parse_search_response(
    body: &str,
    cadastral_number: &str,
    coords_order: CoordsOrder,
) -> Result<CadastralRecord, FetchError> {
    let response: SearchResponse = serde_json::from_str(body)
        .map_err(|e| FetchError::parse(format!("invalid JSON response: {}", e)))?;

    let first = response
        .data
        .and_then(|data| data.features)
        .and_then(|features| features.into_iter().next())
        .ok_or_else(|| FetchError::not_found(cadastral_number))?;
    let feature: RawFeature = serde_json::from_value(first)
        .map_err(|e| FetchError::parse(format!("invalid feature: {}", e)))?;

    let raw_geometry = match feature.geometry {
        Some(value) if !value.is_null() => value,
        _ => return Err(FetchError::not_found(cadastral_number)),
    };

    let crs = raw_geometry
        .pointer("/crs/properties/name")
        .and_then(|v| v.as_str())
        .map(str::to_string);

    let geometry: Geometry = serde_json::from_value(raw_geometry)
        .map_err(|e| FetchError::parse(format!("invalid geometry: {}", e)))?;

    let centroid = geometry
        .centroid()
        .and_then(|(x, y)| reproject::to_geographic(x, y, coords_order));

    let properties = feature.properties.unwrap_or_default();

    Ok(CadastralRecord {
        cadastral_number: text_property(&properties, "cadastral_number")
            .unwrap_or_else(|| cadastral_number.to_string()),
        address: text_property(&properties, "address"),
        geometry_type: geometry.type_name().to_string(),
        geometry,
        crs,
        centroid,
        coords_order,
        land_category: text_property(&properties, "category_id"),
        permitted_use: text_property(&properties, "utilization_id"),
        area: number_property(&properties, "area_value"),
        area_unit: text_property(&properties, "area_unit"),
    })
}
