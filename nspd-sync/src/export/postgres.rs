//! Enregistrement des parcelles dans PostgreSQL
//!
//! La table cible (par défaut `land_plots`) doit porter les colonnes
//! `cadastral_number`, `coordinates_json`, `center_lat`, `center_lon`,
//! `has_coordinates`, `sync_error`, `is_active` et `updated_at`.
//!
//! Les lignes sont retrouvées par le numéro demandé, jamais par l'écriture
//! renvoyée par le NSPD (zéros de tête, espaces).

use anyhow::{Context, Result};
use async_trait::async_trait;
use deadpool_postgres::Pool;
use tracing::debug;

use nspd::{CadastralRecord, FetchError};

use crate::sync::RecordSink;

/// Table par défaut
pub const DEFAULT_TABLE: &str = "land_plots";

/// Vérifie un nom de table (`table` ou `schema.table`)
///
/// Le nom est interpolé dans le SQL : seuls lettres ASCII, chiffres et `_`
/// sont acceptés.
pub fn validate_table_name(name: &str) -> Result<()> {
    let valid_part = |part: &str| {
        let mut chars = part.chars();
        matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
    };

    let parts: Vec<&str> = name.split('.').collect();
    if parts.len() > 2 || !parts.iter().all(|p| valid_part(p)) {
        anyhow::bail!("Invalid table name: {}", name);
    }
    Ok(())
}

/// Accès à la table des parcelles
pub struct LandPlotStore {
    pool: Pool,
    table: String,
    require_row: bool,
}

impl LandPlotStore {
    pub fn new(pool: Pool, table: &str) -> Result<Self> {
        validate_table_name(table)?;
        Ok(Self {
            pool,
            table: table.to_string(),
            require_row: false,
        })
    }

    /// Une parcelle sans ligne correspondante devient un échec
    /// d'enregistrement (parcelles lues depuis la table)
    pub fn require_existing_row(mut self, require: bool) -> Self {
        self.require_row = require;
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Parcelles actives sans coordonnées
    pub async fn pending(&self, limit: Option<i64>) -> Result<Vec<String>> {
        let client = self.pool.get().await?;
        let sql = format!(
            "SELECT cadastral_number FROM {} \
             WHERE coordinates_json IS NULL \
               AND cadastral_number IS NOT NULL \
               AND is_active = true \
             ORDER BY cadastral_number \
             LIMIT $1::bigint",
            self.table
        );

        let rows = client
            .query(&sql, &[&limit])
            .await
            .context(format!("Failed to list pending parcels in {}", self.table))?;

        Ok(rows.iter().map(|r| r.get(0)).collect())
    }

    /// Enregistre la géométrie et le centroïde d'une parcelle
    ///
    /// Une géométrie vide ou un centroïde absent ne remplacent pas les
    /// valeurs déjà connues. `has_coordinates` suit la présence d'une
    /// géométrie, centroïde calculé ou non.
    pub async fn save_record(&self, cadastral_number: &str, record: &CadastralRecord) -> Result<u64> {
        let client = self.pool.get().await?;
        let sql = format!(
            "UPDATE {} SET \
                coordinates_json = COALESCE($2::text::jsonb, coordinates_json), \
                center_lat = COALESCE($3::float8, center_lat), \
                center_lon = COALESCE($4::float8, center_lon), \
                has_coordinates = COALESCE(has_coordinates, false) OR $5::bool, \
                sync_error = NULL, \
                updated_at = NOW() \
             WHERE cadastral_number = $1",
            self.table
        );

        let has_geometry = !record.geometry.is_empty();
        let coordinates_json = has_geometry
            .then(|| serde_json::to_string(&record.geometry))
            .transpose()?;
        let lat_lon = record.lat_lon();
        let center_lat = lat_lon.map(|(lat, _)| lat);
        let center_lon = lat_lon.map(|(_, lon)| lon);
        let has_coordinates = has_geometry || lat_lon.is_some();

        let updated = client
            .execute(
                &sql,
                &[
                    &cadastral_number,
                    &coordinates_json,
                    &center_lat,
                    &center_lon,
                    &has_coordinates,
                ],
            )
            .await
            .context(format!("Failed to update {}", cadastral_number))?;

        if updated == 0 {
            debug!("{} not present in {}", cadastral_number, self.table);
        }
        Ok(updated)
    }

    /// Conserve le message d'échec sur la parcelle
    pub async fn save_error(&self, cadastral_number: &str, message: &str) -> Result<u64> {
        let client = self.pool.get().await?;
        let sql = format!(
            "UPDATE {} SET sync_error = $2, updated_at = NOW() WHERE cadastral_number = $1",
            self.table
        );

        client
            .execute(&sql, &[&cadastral_number, &message])
            .await
            .context(format!("Failed to record error for {}", cadastral_number))
    }
}

#[async_trait]
impl RecordSink for LandPlotStore {
    fn name(&self) -> &str {
        "postgres"
    }

    async fn save(&mut self, cadastral_number: &str, record: &CadastralRecord) -> Result<()> {
        let updated = self.save_record(cadastral_number, record).await?;
        if updated == 0 && self.require_row {
            anyhow::bail!("{} not found in {}", cadastral_number, self.table);
        }
        Ok(())
    }

    async fn save_failure(&mut self, cadastral_number: &str, error: &FetchError) -> Result<()> {
        let message = format!("{}: {}", error.kind(), error);
        self.save_error(cadastral_number, &message).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_table_name() {
        assert!(validate_table_name("land_plots").is_ok());
        assert!(validate_table_name("crm.land_plots").is_ok());
        assert!(validate_table_name("_plots2").is_ok());

        assert!(validate_table_name("").is_err());
        assert!(validate_table_name("2plots").is_err());
        assert!(validate_table_name("land_plots; DROP TABLE x").is_err());
        assert!(validate_table_name("a.b.c").is_err());
        assert!(validate_table_name("crm.").is_err());
    }
}
