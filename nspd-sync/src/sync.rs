//! Synchronisation par lot
//!
//! Une requête par parcelle, un délai fixe entre deux requêtes, aucun retry :
//! le NSPD tolère mal les rafales, et une parcelle en échec est simplement
//! reportée dans le rapport.

use std::collections::HashSet;
use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{info, warn};

use nspd::{CadastralRecord, FetchError, NspdClient};

use crate::report::SyncReport;

/// Délai par défaut entre deux requêtes
pub const DEFAULT_DELAY_MS: u64 = 1500;

/// Destination des parcelles récupérées
#[async_trait]
pub trait RecordSink: Send {
    /// Nom court pour les logs
    fn name(&self) -> &str;

    /// Enregistre une parcelle récupérée
    ///
    /// `cadastral_number` est le numéro demandé, qui peut différer de
    /// l'écriture renvoyée par le NSPD (`record.cadastral_number`).
    async fn save(&mut self, cadastral_number: &str, record: &CadastralRecord) -> Result<()>;

    /// Enregistre l'échec d'une parcelle
    async fn save_failure(&mut self, _cadastral_number: &str, _error: &FetchError) -> Result<()> {
        Ok(())
    }

    /// Fin du lot (écriture d'un fichier, etc.)
    async fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Options du lot
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Délai entre deux requêtes
    pub delay: Duration,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(DEFAULT_DELAY_MS),
        }
    }
}

/// Lit une liste de numéros cadastraux (un par ligne)
///
/// Les lignes vides et les commentaires `#` sont ignorés, les doublons
/// supprimés en conservant l'ordre.
pub fn read_cadastral_numbers(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .context(format!("Failed to read input file: {}", path.display()))?;
    Ok(parse_cadastral_numbers(&content))
}

fn parse_cadastral_numbers(content: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter(|line| seen.insert(line.to_string()))
        .map(str::to_string)
        .collect()
}

/// Synchronise une liste de parcelles
pub async fn run_batch(
    client: &NspdClient,
    source: &str,
    cadastral_numbers: &[String],
    options: &BatchOptions,
    sinks: &mut [Box<dyn RecordSink>],
) -> SyncReport {
    let started_at = Instant::now();
    let total = cadastral_numbers.len();
    let mut report = SyncReport::new(source, total);

    info!(
        source,
        total,
        transport = %client.transport(),
        delay_ms = options.delay.as_millis() as u64,
        "Starting sync"
    );

    for (i, cadastral_number) in cadastral_numbers.iter().enumerate() {
        if i > 0 && !options.delay.is_zero() {
            tokio::time::sleep(options.delay).await;
        }
        let progress = format!("[{}/{}]", i + 1, total);

        match client.fetch(cadastral_number).await {
            Ok(record) => {
                let mut stored = true;
                for sink in sinks.iter_mut() {
                    if let Err(e) = sink.save(cadastral_number, &record).await {
                        warn!("{} {} - {} error: {:#}", progress, cadastral_number, sink.name(), e);
                        report.record_storage_failure(
                            cadastral_number,
                            &format!("{}: {:#}", sink.name(), e),
                        );
                        stored = false;
                        break;
                    }
                }
                if stored {
                    info!(
                        "{} {} - {} {:?}",
                        progress, cadastral_number, record.geometry_type, record.centroid
                    );
                    report.record_success(record.centroid.is_some());
                }
            }
            Err(e) => {
                info!("{} {} - {}: {}", progress, cadastral_number, e.kind(), e);
                for sink in sinks.iter_mut() {
                    if let Err(store_err) = sink.save_failure(cadastral_number, &e).await {
                        warn!(
                            "{} - failed to record error in {}: {:#}",
                            cadastral_number,
                            sink.name(),
                            store_err
                        );
                    }
                }
                report.record_fetch_failure(cadastral_number, &e);
            }
        }
    }

    for sink in sinks.iter_mut() {
        if let Err(e) = sink.finish().await {
            warn!("Failed to finalize {}: {:#}", sink.name(), e);
            report.record_fatal(&format!("{}: {:#}", sink.name(), e));
        }
    }

    report.set_duration(started_at.elapsed());
    report.finalize();
    report
}
