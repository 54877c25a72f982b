//! Types d'erreurs pour le crate nspd

use serde::Serialize;
use thiserror::Error;

/// Catégorie d'échec, pour les décomptes des traitements par lot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum FailureKind {
    /// Connexion, timeout ou négociation TLS
    Network,
    /// Réponse HTTP hors 2xx
    UpstreamStatus,
    /// Aucun objet correspondant
    NotFound,
    /// JSON invalide ou forme inattendue
    Parse,
}

impl FailureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Network => "NetworkError",
            Self::UpstreamStatus => "UpstreamStatusError",
            Self::NotFound => "NotFoundError",
            Self::Parse => "ParseError",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Erreurs pouvant survenir lors d'une requête NSPD
///
/// Toutes les erreurs sont des valeurs : [`crate::NspdClient::fetch`] ne panique
/// jamais et ne laisse rien remonter d'autre que cette énumération.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// Erreur réseau (connexion, DNS, timeout, TLS)
    #[error("Network error: {0}")]
    Network(String),

    /// Le serveur a répondu avec un statut hors 2xx
    #[error("API Error: {status} {status_text}")]
    UpstreamStatus { status: u16, status_text: String },

    /// L'API a répondu mais sans objet correspondant
    #[error("object not found: {0}")]
    NotFound(String),

    /// Réponse illisible
    #[error("Parse error: {0}")]
    Parse(String),
}

impl FetchError {
    /// Crée une erreur réseau depuis une cause bas niveau
    pub fn network(cause: impl std::fmt::Display) -> Self {
        Self::Network(cause.to_string())
    }

    /// Crée une erreur de parsing
    pub fn parse(reason: impl Into<String>) -> Self {
        Self::Parse(reason.into())
    }

    /// Crée une erreur "objet introuvable" pour un numéro cadastral
    pub fn not_found(cadastral_number: impl Into<String>) -> Self {
        Self::NotFound(cadastral_number.into())
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Network(_) => FailureKind::Network,
            Self::UpstreamStatus { .. } => FailureKind::UpstreamStatus,
            Self::NotFound(_) => FailureKind::NotFound,
            Self::Parse(_) => FailureKind::Parse,
        }
    }
}
