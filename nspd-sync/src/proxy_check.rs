//! Test de joignabilité d'un proxy
//!
//! Simple ouverture de connexion TCP vers l'hôte et le port du proxy : aucune
//! requête HTTP n'est envoyée, les identifiants ne sont pas vérifiés.

use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::net::TcpStream;
use tracing::debug;

use nspd::ProxyEndpoint;

/// Délai par défaut du test
pub const CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// Résultat du test
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProxyCheck {
    pub success: bool,
    pub message: String,
    /// Temps d'ouverture de la connexion, en millisecondes
    pub response_time_ms: Option<u64>,
}

impl ProxyCheck {
    fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            response_time_ms: None,
        }
    }
}

/// Teste la connexion TCP vers un proxy
pub async fn check_proxy(raw: &str, timeout: Duration) -> ProxyCheck {
    let Some(endpoint) = ProxyEndpoint::parse(raw) else {
        return ProxyCheck::failure("invalid proxy format");
    };
    debug!(proxy = %endpoint, authenticated = endpoint.authenticated, "Checking proxy");

    let started_at = Instant::now();
    let connect = TcpStream::connect((endpoint.host.as_str(), endpoint.port));

    match tokio::time::timeout(timeout, connect).await {
        Ok(Ok(_stream)) => {
            let elapsed = started_at.elapsed().as_millis() as u64;
            ProxyCheck {
                success: true,
                message: format!("proxy {} reachable in {} ms", endpoint, elapsed),
                response_time_ms: Some(elapsed),
            }
        }
        Ok(Err(e)) => ProxyCheck::failure(format!("proxy {} unreachable: {}", endpoint, e)),
        Err(_) => ProxyCheck::failure(format!(
            "proxy {} did not answer within {} ms",
            endpoint,
            timeout.as_millis()
        )),
    }
}
