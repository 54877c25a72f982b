//! Export des parcelles en GeoJSON
//!
//! Les géométries sont écrites dans la projection native du NSPD (non
//! reprojetées) ; le centroïde géographique est porté par les propriétés.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use geojson::{Feature, FeatureCollection, JsonObject, JsonValue};

use nspd::{detect_land_status, CadastralRecord, Geometry};

use crate::sync::RecordSink;

/// Convertit une géométrie NSPD en géométrie GeoJSON
pub fn to_geojson_geometry(geometry: &Geometry) -> geojson::Geometry {
    let value = match geometry {
        Geometry::Point(position) => geojson::Value::Point(position.clone()),
        Geometry::Polygon(rings) => geojson::Value::Polygon(rings.clone()),
        Geometry::MultiPolygon(polygons) => geojson::Value::MultiPolygon(polygons.clone()),
    };
    geojson::Geometry::new(value)
}

/// Feature GeoJSON d'une parcelle
pub fn record_to_feature(record: &CadastralRecord) -> Feature {
    let mut properties = JsonObject::new();
    properties.insert(
        "cadastral_number".into(),
        record.cadastral_number.clone().into(),
    );
    properties.insert("address".into(), optional(&record.address));
    properties.insert("geometry_type".into(), record.geometry_type.clone().into());
    properties.insert("crs".into(), optional(&record.crs));
    properties.insert(
        "centroid".into(),
        record
            .centroid
            .map(|c| JsonValue::from(c.to_vec()))
            .unwrap_or(JsonValue::Null),
    );
    properties.insert("coords_order".into(), record.coords_order.as_str().into());
    properties.insert("land_category".into(), optional(&record.land_category));
    properties.insert("permitted_use".into(), optional(&record.permitted_use));
    properties.insert(
        "area".into(),
        record.area.map(JsonValue::from).unwrap_or(JsonValue::Null),
    );
    properties.insert("area_unit".into(), optional(&record.area_unit));
    properties.insert(
        "land_status".into(),
        detect_land_status(record)
            .map(|s| JsonValue::from(s.label()))
            .unwrap_or(JsonValue::Null),
    );

    Feature {
        bbox: None,
        geometry: Some(to_geojson_geometry(&record.geometry)),
        id: Some(geojson::feature::Id::String(record.cadastral_number.clone())),
        properties: Some(properties),
        foreign_members: None,
    }
}

fn optional(value: &Option<String>) -> JsonValue {
    value
        .as_ref()
        .map(|s| JsonValue::from(s.as_str()))
        .unwrap_or(JsonValue::Null)
}

/// Exporte des parcelles en FeatureCollection
pub fn export_to_geojson(records: &[CadastralRecord], output_path: &Path) -> Result<()> {
    let collection = build_collection(records.iter().map(record_to_feature).collect(), records);

    let file = File::create(output_path)
        .context(format!("Failed to create file: {}", output_path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, &collection)?;
    writer.flush()?;

    Ok(())
}

/// FeatureCollection avec le CRS annoncé par la première parcelle
fn build_collection(features: Vec<Feature>, records: &[CadastralRecord]) -> FeatureCollection {
    let foreign_members = records.iter().find_map(|r| r.crs.as_ref()).map(|crs| {
        let mut members = JsonObject::new();
        members.insert(
            "crs".into(),
            serde_json::json!({"type": "name", "properties": {"name": crs}}),
        );
        members
    });

    FeatureCollection {
        bbox: None,
        features,
        foreign_members,
    }
}

/// Accumule les parcelles et écrit le fichier en fin de lot
pub struct GeoJsonSink {
    path: PathBuf,
    records: Vec<CadastralRecord>,
}

impl GeoJsonSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            records: Vec::new(),
        }
    }
}

#[async_trait]
impl RecordSink for GeoJsonSink {
    fn name(&self) -> &str {
        "geojson"
    }

    async fn save(&mut self, _cadastral_number: &str, record: &CadastralRecord) -> Result<()> {
        self.records.push(record.clone());
        Ok(())
    }

    async fn finish(&mut self) -> Result<()> {
        export_to_geojson(&self.records, &self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nspd::CoordsOrder;

    fn record() -> CadastralRecord {
        CadastralRecord {
            cadastral_number: "39:03:040036:328".to_string(),
            address: Some("Гурьевский район".to_string()),
            geometry: Geometry::Polygon(vec![vec![
                vec![2283000.0, 7379000.0],
                vec![2283100.0, 7379000.0],
                vec![2283100.0, 7379100.0],
            ]]),
            crs: Some("EPSG:3857".to_string()),
            centroid: Some([55.1, 20.5]),
            coords_order: CoordsOrder::LatLon,
            geometry_type: "Polygon".to_string(),
            land_category: None,
            permitted_use: Some("для ведения личного подсобного хозяйства".to_string()),
            area: Some(1500.0),
            area_unit: Some("кв. м".to_string()),
        }
    }

    #[test]
    fn test_record_to_feature() {
        let feature = record_to_feature(&record());
        let json = feature.to_string();

        assert!(json.contains(r#""type":"Feature""#));
        assert!(json.contains(r#""id":"39:03:040036:328""#));
        assert!(json.contains("Polygon"));
        assert_eq!(feature.property("land_status"), Some(&JsonValue::from("ЛПХ")));
        assert_eq!(
            feature.property("centroid"),
            Some(&serde_json::json!([55.1, 20.5]))
        );
    }

    #[test]
    fn test_point_geometry() {
        let geom = to_geojson_geometry(&Geometry::Point(vec![20.51, 54.71]));
        assert_eq!(geom.value, geojson::Value::Point(vec![20.51, 54.71]));
    }

    #[tokio::test]
    async fn test_sink_writes_on_finish() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plots.geojson");

        let mut sink = GeoJsonSink::new(&path);
        sink.save("39:03:040036:328", &record()).await.unwrap();
        assert!(!path.exists());
        sink.finish().await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let collection: FeatureCollection = content.parse::<geojson::GeoJson>()
            .unwrap()
            .try_into()
            .unwrap();
        assert_eq!(collection.features.len(), 1);
        assert!(content.contains("EPSG:3857"));
    }
}
