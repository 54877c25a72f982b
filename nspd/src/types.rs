//! Types de données pour le crate nspd

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::geometry;

/// Position brute telle que renvoyée par le NSPD (x, y[, z])
pub type Position = Vec<f64>;

/// Ordre des coordonnées géographiques demandé par l'appelant
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoordsOrder {
    /// (latitude, longitude), défaut
    #[default]
    #[serde(rename = "lat,lon")]
    LatLon,
    /// (longitude, latitude)
    #[serde(rename = "lon,lat")]
    LonLat,
}

impl CoordsOrder {
    /// Normalisation tolérante : tout ce qui n'est pas `lon,lat` vaut `lat,lon`
    pub fn normalize(value: &str) -> Self {
        value.parse().unwrap_or_default()
    }

    /// Ordonne un couple (lat, lon) selon l'ordre demandé
    pub fn arrange(self, lat: f64, lon: f64) -> [f64; 2] {
        match self {
            Self::LatLon => [lat, lon],
            Self::LonLat => [lon, lat],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::LatLon => "lat,lon",
            Self::LonLat => "lon,lat",
        }
    }
}

impl std::str::FromStr for CoordsOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let compact: String = s
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_lowercase();
        match compact.as_str() {
            "lat,lon" | "latlon" => Ok(Self::LatLon),
            "lon,lat" | "lonlat" => Ok(Self::LonLat),
            _ => Err(format!(
                "Invalid coordinate order: {}. Use: lat,lon or lon,lat",
                s
            )),
        }
    }
}

impl std::fmt::Display for CoordsOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Géométrie d'une parcelle, coordonnées dans la projection native du NSPD
///
/// Sérialisée en GeoJSON (`{"type": ..., "coordinates": ...}`), désérialisée
/// de façon tolérante : des coordonnées absentes donnent une géométrie vide,
/// une composante non numérique devient NaN (réécrite `null` en JSON). Seule
/// une imbrication incorrecte est une erreur.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    Point(Position),
    Polygon(Vec<Vec<Position>>),
    MultiPolygon(Vec<Vec<Vec<Position>>>),
}

impl Geometry {
    /// Nom du type GeoJSON
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Point(_) => "Point",
            Self::Polygon(_) => "Polygon",
            Self::MultiPolygon(_) => "MultiPolygon",
        }
    }

    /// Aucune coordonnée exploitable
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Point(p) => p.is_empty(),
            Self::Polygon(rings) => rings.iter().all(|r| r.is_empty()),
            Self::MultiPolygon(polys) => polys.iter().flatten().all(|r| r.is_empty()),
        }
    }

    /// Centre approximatif dans la projection native, voir [`geometry::centroid`]
    pub fn centroid(&self) -> Option<(f64, f64)> {
        geometry::centroid(self)
    }
}

impl<'de> Deserialize<'de> for Geometry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawGeometry::deserialize(deserializer)?;
        Geometry::try_from(raw).map_err(serde::de::Error::custom)
    }
}

/// Forme brute d'une géométrie NSPD, avant validation du type
#[derive(Debug, Deserialize)]
struct RawGeometry {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    coordinates: Value,
}

impl TryFrom<RawGeometry> for Geometry {
    type Error = String;

    fn try_from(raw: RawGeometry) -> Result<Self, Self::Error> {
        let coordinates = raw.coordinates;
        match raw.kind.as_str() {
            "Point" => position(coordinates).map(Geometry::Point),
            "Polygon" => array(coordinates, ring).map(Geometry::Polygon),
            "MultiPolygon" => array(coordinates, |polygon| array(polygon, ring))
                .map(Geometry::MultiPolygon),
            other => Err(format!("unsupported geometry type: {}", other)),
        }
    }
}

/// Tableau JSON dont chaque élément est converti par `item` (`null` vaut vide)
fn array<T>(value: Value, item: impl Fn(Value) -> Result<T, String>) -> Result<Vec<T>, String> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => items.into_iter().map(item).collect(),
        other => Err(format!("invalid coordinates: expected an array, found {}", other)),
    }
}

fn ring(value: Value) -> Result<Vec<Position>, String> {
    array(value, position)
}

/// Sommet ; une composante non numérique devient NaN et le sommet est ignoré
/// par le calcul du centre
fn position(value: Value) -> Result<Position, String> {
    array(value, |component| Ok(component.as_f64().unwrap_or(f64::NAN)))
}

/// Parcelle cadastrale résolue
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CadastralRecord {
    /// Numéro cadastral confirmé par le NSPD (ou celui demandé)
    pub cadastral_number: String,

    pub address: Option<String>,

    /// Géométrie non reprojetée
    pub geometry: Geometry,

    /// Nom du CRS annoncé par le NSPD (ex: "EPSG:3857")
    pub crs: Option<String>,

    /// Centroïde géographique, dans l'ordre `coords_order`
    pub centroid: Option<[f64; 2]>,

    pub coords_order: CoordsOrder,

    /// Type de géométrie ("Point", "Polygon", "MultiPolygon")
    pub geometry_type: String,

    pub land_category: Option<String>,
    pub permitted_use: Option<String>,
    pub area: Option<f64>,
    pub area_unit: Option<String>,
}

impl CadastralRecord {
    /// Centroïde sous la forme (latitude, longitude), quel que soit l'ordre demandé
    pub fn lat_lon(&self) -> Option<(f64, f64)> {
        self.centroid.map(|[a, b]| match self.coords_order {
            CoordsOrder::LatLon => (a, b),
            CoordsOrder::LonLat => (b, a),
        })
    }
}

/// Réponse de l'endpoint de recherche du géoportail
#[derive(Debug, Deserialize)]
pub(crate) struct SearchResponse {
    #[serde(default)]
    pub data: Option<SearchData>,
}

/// Les features restent brutes : seule la première est interprétée
#[derive(Debug, Deserialize)]
pub(crate) struct SearchData {
    #[serde(default)]
    pub features: Option<Vec<Value>>,
}

/// Feature NSPD, la géométrie est validée plus tard
#[derive(Debug, Deserialize)]
pub(crate) struct RawFeature {
    #[serde(default)]
    pub geometry: Option<Value>,
    #[serde(default)]
    pub properties: Option<Map<String, Value>>,
}

/// Champ texte non vide (les identifiants NSPD sont parfois numériques)
pub(crate) fn text_property(properties: &Map<String, Value>, key: &str) -> Option<String> {
    match properties.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Champ numérique, accepte aussi "12.5" ou "12,5"
pub(crate) fn number_property(properties: &Map<String, Value>, key: &str) -> Option<f64> {
    let value = match properties.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', ".").parse().ok(),
        _ => None,
    }?;
    value.is_finite().then_some(value)
}
