//! Calcul du centre d'une géométrie NSPD
//!
//! Moyenne simple des sommets (non pondérée par la surface) : suffisant pour
//! placer un marqueur sur une carte, pas pour un vrai centroïde de surface.
//! Pour un MultiPolygon, seul le premier anneau du premier polygone compte.

use crate::types::{Geometry, Position};

/// Centre approximatif d'une géométrie, en coordonnées natives
///
/// Retourne `None` si aucun couple numérique exploitable n'est trouvé,
/// jamais `(0, 0)`.
pub fn centroid(geometry: &Geometry) -> Option<(f64, f64)> {
    match geometry {
        Geometry::Point(position) => vertex(position),
        Geometry::Polygon(rings) => rings.first().and_then(|ring| ring_mean(ring)),
        Geometry::MultiPolygon(polygons) => polygons
            .first()
            .and_then(|rings| rings.first())
            .and_then(|ring| ring_mean(ring)),
    }
}

/// Couple (x, y) fini, les composantes supplémentaires (z) sont ignorées
fn vertex(position: &Position) -> Option<(f64, f64)> {
    match position.as_slice() {
        [x, y, ..] if x.is_finite() && y.is_finite() => Some((*x, *y)),
        _ => None,
    }
}

/// Moyenne des sommets valides d'un anneau
fn ring_mean(ring: &[Position]) -> Option<(f64, f64)> {
    let (sum_x, sum_y, count) = ring
        .iter()
        .filter_map(vertex)
        .fold((0.0, 0.0, 0usize), |(sx, sy, n), (x, y)| (sx + x, sy + y, n + 1));

    if count == 0 {
        return None;
    }
    Some((sum_x / count as f64, sum_y / count as f64))
}
