//! Rapport de synchronisation
//!
//! Un échec par parcelle n'interrompt jamais le lot : il est compté par
//! catégorie et conservé pour l'affichage final.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use serde::Serialize;

use nspd::FetchError;

/// Statut global de la synchronisation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SyncStatus {
    /// Toutes les parcelles ont été synchronisées
    Success,
    /// Certaines parcelles ont échoué
    PartialSuccess,
    /// Aucune parcelle synchronisée, ou erreur fatale
    Failed,
}

/// Niveau de sévérité des erreurs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorLevel {
    /// Erreur fatale : le lot n'a pas pu être finalisé
    Fatal,
    /// Erreur : parcelle non synchronisée
    Error,
}

/// Catégorie d'une erreur de synchronisation (hors échecs NSPD)
pub const STORAGE_ERROR: &str = "StorageError";

/// Erreur sur une parcelle
#[derive(Debug, Clone, Serialize)]
pub struct SyncError {
    pub level: ErrorLevel,
    /// Numéro cadastral (absent pour une erreur de finalisation)
    pub cadastral_number: Option<String>,
    /// Catégorie : NetworkError, UpstreamStatusError, NotFoundError, ParseError, StorageError
    pub kind: String,
    /// Message brut, affiché tel quel
    pub message: String,
}

/// Rapport complet d'une synchronisation
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    /// Source des numéros cadastraux (fichier, table)
    pub source: String,
    pub duration_secs: f64,
    pub status: SyncStatus,

    /// Nombre de parcelles demandées
    pub total: usize,
    /// Parcelles récupérées et enregistrées
    pub synced: usize,
    /// Parcelles récupérées mais sans centroïde exploitable
    pub without_centroid: usize,
    /// Parcelles en échec
    pub failed: usize,

    /// Décompte des échecs par catégorie
    pub by_kind: BTreeMap<String, usize>,

    pub errors: Vec<SyncError>,
}

impl SyncReport {
    /// Crée un rapport pour une source
    pub fn new(source: &str, total: usize) -> Self {
        Self {
            source: source.to_string(),
            duration_secs: 0.0,
            status: SyncStatus::Success,
            total,
            synced: 0,
            without_centroid: 0,
            failed: 0,
            by_kind: BTreeMap::new(),
            errors: Vec::new(),
        }
    }

    /// Enregistre une parcelle synchronisée
    pub fn record_success(&mut self, has_centroid: bool) {
        self.synced += 1;
        if !has_centroid {
            self.without_centroid += 1;
        }
    }

    /// Enregistre un échec NSPD
    pub fn record_fetch_failure(&mut self, cadastral_number: &str, error: &FetchError) {
        self.record_failure(cadastral_number, error.kind().as_str(), &error.to_string());
    }

    /// Enregistre un échec d'enregistrement
    pub fn record_storage_failure(&mut self, cadastral_number: &str, message: &str) {
        self.record_failure(cadastral_number, STORAGE_ERROR, message);
    }

    fn record_failure(&mut self, cadastral_number: &str, kind: &str, message: &str) {
        self.failed += 1;
        *self.by_kind.entry(kind.to_string()).or_default() += 1;
        self.errors.push(SyncError {
            level: ErrorLevel::Error,
            cadastral_number: Some(cadastral_number.to_string()),
            kind: kind.to_string(),
            message: message.to_string(),
        });
    }

    /// Enregistre une erreur fatale (finalisation d'un export, etc.)
    pub fn record_fatal(&mut self, message: &str) {
        self.errors.push(SyncError {
            level: ErrorLevel::Fatal,
            cadastral_number: None,
            kind: STORAGE_ERROR.to_string(),
            message: message.to_string(),
        });
    }

    pub fn set_duration(&mut self, duration: Duration) {
        self.duration_secs = duration.as_secs_f64();
    }

    /// Détermine le statut final basé sur les erreurs
    pub fn finalize(&mut self) {
        let has_fatal = self.errors.iter().any(|e| e.level == ErrorLevel::Fatal);
        let has_errors = !self.errors.is_empty();

        self.status = if has_fatal {
            SyncStatus::Failed
        } else if has_errors && self.synced > 0 {
            SyncStatus::PartialSuccess
        } else if has_errors {
            SyncStatus::Failed
        } else {
            SyncStatus::Success
        };
    }

    /// Affiche le rapport sur la console
    pub fn display(&self) {
        println!("\n{}", "=".repeat(60));
        println!("SYNC REPORT - {}", self.source);
        println!("{}", "=".repeat(60));

        println!("\nStatus: {:?}", self.status);
        println!("Duration: {:.2}s", self.duration_secs);

        println!("\n--- SUMMARY ---");
        println!(
            "Parcels: {} requested, {} synced ({} without centroid), {} failed",
            self.total, self.synced, self.without_centroid, self.failed
        );

        if !self.by_kind.is_empty() {
            println!("\n--- FAILURES BY KIND ---");
            for (kind, count) in &self.by_kind {
                println!("  {}: {}", kind, count);
            }
        }

        if !self.errors.is_empty() {
            println!("\n--- ERRORS ({}) ---", self.errors.len());
            for e in self.errors.iter().take(20) {
                let location = e
                    .cadastral_number
                    .as_deref()
                    .map(|n| format!("[{}]", n))
                    .unwrap_or_default();
                println!("  {:?} {} {}: {}", e.level, location, e.kind, e.message);
            }
            if self.errors.len() > 20 {
                println!("  ... and {} more", self.errors.len() - 20);
            }
        }

        println!("\n{}", "=".repeat(60));
    }

    /// Sauvegarde le rapport en JSON
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Affichage compact pour le résumé
    pub fn summary(&self) -> String {
        format!(
            "{}: {} synced, {} failed of {}",
            self.source, self.synced, self.failed, self.total
        )
    }
}
