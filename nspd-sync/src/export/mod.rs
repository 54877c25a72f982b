//! Destinations des parcelles (GeoJSON, PostgreSQL)

pub mod geojson;
pub mod pool;
pub mod postgres;

pub use self::geojson::GeoJsonSink;
pub use postgres::LandPlotStore;
