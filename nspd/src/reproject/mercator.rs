//! Projection Web Mercator sphérique (EPSG:3857)
//!
//! Aussi connue sous le nom de Pseudo-Mercator. C'est la projection native
//! des géométries du géoportail NSPD.

/// Demi-circonférence terrestre à l'équateur (mètres), bornes de l'EPSG:3857
pub const HALF_CIRCUMFERENCE: f64 = 20037508.34;

/// Convertit Web Mercator vers (longitude, latitude) en degrés
pub fn web_mercator_to_degrees(x: f64, y: f64) -> (f64, f64) {
    let lon = x * 180.0 / HALF_CIRCUMFERENCE;

    // Latitude "Mercator" en degrés, puis inversion de la projection
    let lat = y * 180.0 / HALF_CIRCUMFERENCE;
    let lat = 180.0 / std::f64::consts::PI
        * (2.0 * (lat * std::f64::consts::PI / 180.0).exp().atan() - std::f64::consts::FRAC_PI_2);

    (lon, lat)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Projection directe, pour vérifier l'aller-retour
    fn degrees_to_web_mercator(lon: f64, lat: f64) -> (f64, f64) {
        let x = lon * HALF_CIRCUMFERENCE / 180.0;
        let y = (std::f64::consts::FRAC_PI_4 + lat.to_radians() / 2.0).tan().ln()
            / std::f64::consts::PI
            * HALF_CIRCUMFERENCE;
        (x, y)
    }

    #[test]
    fn test_origin() {
        let (lon, lat) = web_mercator_to_degrees(0.0, 0.0);
        assert!(lon.abs() < 1e-12 && lat.abs() < 1e-12);
    }

    #[test]
    fn test_kaliningrad_region() {
        let (lon, lat) = web_mercator_to_degrees(2283000.0, 7379000.0);
        assert!(lon > 15.0 && lon < 25.0, "lon={}", lon);
        assert!(lat > 50.0 && lat < 60.0, "lat={}", lat);
    }

    #[test]
    fn test_roundtrip() {
        let (x, y) = degrees_to_web_mercator(20.51, 54.71);
        let (lon, lat) = web_mercator_to_degrees(x, y);

        assert!((lon - 20.51).abs() < 1e-6, "lon={}", lon);
        assert!((lat - 54.71).abs() < 1e-6, "lat={}", lat);
    }
}
