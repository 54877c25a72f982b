//! Passage des coordonnées NSPD en coordonnées géographiques
//!
//! Le NSPD mélange les systèmes selon les endpoints : certaines réponses sont
//! en degrés (lon, lat), d'autres en mètres Web Mercator. La détection est
//! heuristique, par ordre de priorité :
//!
//! 1. `|x| ≤ 180` et `|y| ≤ 90` : déjà géographique (lon, lat)
//! 2. `|x| ≤ 90` et `|y| ≤ 180` : déjà géographique (lat, lon)
//! 3. sinon : mètres Web Mercator, projection inverse sphérique
//!
//! Les seuils sont ceux observés côté NSPD et le rendu cartographique en
//! dépend : ne pas les modifier sans vérifier les réponses réelles.

mod mercator;

pub use mercator::{web_mercator_to_degrees, HALF_CIRCUMFERENCE};

use crate::types::CoordsOrder;

/// Convertit un couple natif en (latitude, longitude)
///
/// Retourne `None` si le résultat n'est pas fini (NaN, infini).
pub fn to_lat_lon(x: f64, y: f64) -> Option<(f64, f64)> {
    let (lat, lon) = if x.abs() <= 180.0 && y.abs() <= 90.0 {
        (y, x)
    } else if x.abs() <= 90.0 && y.abs() <= 180.0 {
        (x, y)
    } else {
        let (lon, lat) = web_mercator_to_degrees(x, y);
        (lat, lon)
    };

    (lat.is_finite() && lon.is_finite()).then_some((lat, lon))
}

/// Convertit un couple natif en coordonnées géographiques dans l'ordre demandé
pub fn to_geographic(x: f64, y: f64, order: CoordsOrder) -> Option<[f64; 2]> {
    let (lat, lon) = to_lat_lon(x, y)?;
    Some(order.arrange(lat, lon))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geographic_lon_lat_is_transposed() {
        assert_eq!(
            to_geographic(20.51, 54.71, CoordsOrder::LatLon),
            Some([54.71, 20.51])
        );
        assert_eq!(
            to_geographic(20.51, 54.71, CoordsOrder::LonLat),
            Some([20.51, 54.71])
        );
    }

    #[test]
    fn test_geographic_lat_lon_kept() {
        // y hors [-90, 90] mais dans [-180, 180] : déjà (lat, lon)
        assert_eq!(to_lat_lon(54.71, 120.5), Some((54.71, 120.5)));
    }

    #[test]
    fn test_projected_meters() {
        let [lat, lon] = to_geographic(2283000.0, 7379000.0, CoordsOrder::LatLon).unwrap();
        assert!(lat > 50.0 && lat < 60.0, "lat={}", lat);
        assert!(lon > 15.0 && lon < 25.0, "lon={}", lon);

        let [lon2, lat2] = to_geographic(2283000.0, 7379000.0, CoordsOrder::LonLat).unwrap();
        assert_eq!((lat, lon), (lat2, lon2));
    }

    #[test]
    fn test_boundaries_are_inclusive() {
        assert_eq!(to_lat_lon(180.0, 90.0), Some((90.0, 180.0)));
        assert_eq!(to_lat_lon(-90.0, -180.0), Some((-90.0, -180.0)));

        // Juste au-delà : traité comme des mètres
        let (lat, lon) = to_lat_lon(180.5, 90.5).unwrap();
        assert!(lat.abs() < 0.01 && lon.abs() < 0.01);
    }

    #[test]
    fn test_non_finite_is_rejected() {
        assert_eq!(to_lat_lon(f64::NAN, 10.0), None);
        assert_eq!(to_lat_lon(f64::INFINITY, 1e9), None);
    }
}
