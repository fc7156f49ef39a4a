//! Spherical geometry for area indexing: S2 coverings, ring areas, and the
//! circular zones drawn around airports.

use airspace_shared::geo::{LatLng, LatLngBounds};
use airspace_shared::models::{Position, Ring};
use s2::rect::Rect;
use s2::region::RegionCoverer;

pub const EARTH_RADIUS_KM: f64 = 6371.01;

/// Largest polygon accepted on upload.
pub const MAX_AREA_KM2: f64 = 2_500.0;

/// Largest viewport that is answered; anything bigger gets an empty collection.
pub const MAX_BOUNDS_AREA_KM2: f64 = 100_000.0;

pub const AIRPORT_RADIUS_KM: f64 = 9.0;
pub const HELIPORT_RADIUS_KM: f64 = 3.0;
pub const CIRCLE_VERTICES: usize = 32;

// Upper bound handed to the coverer; a fixed level overrides it anyway
const MAX_COVERING_CELLS: usize = 1 << 17;

/// Covers regions with S2 cells at a single fixed level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Coverer {
    level: u8,
}

impl Coverer {
    pub fn new(level: u8) -> Self {
        Coverer { level }
    }

    pub fn level(&self) -> u8 {
        self.level
    }

    /// Cells covering the lat/lng box around `points`.
    pub fn cover_points(&self, points: &[LatLng]) -> Vec<u64> {
        match LatLngBounds::around(points.iter().copied()) {
            Some(bounds) => self.cover_bounds(&bounds),
            None => Vec::new(),
        }
    }

    /// Sorted, de-duplicated cell ids covering `bounds`.
    pub fn cover_bounds(&self, bounds: &LatLngBounds) -> Vec<u64> {
        let rect = Rect::from_degrees(
            bounds.south_west.lat,
            bounds.south_west.lng,
            bounds.north_east.lat,
            bounds.north_east.lng,
        );
        let coverer = RegionCoverer {
            min_level: self.level,
            max_level: self.level,
            level_mod: 1,
            max_cells: MAX_COVERING_CELLS,
        };
        let mut cells: Vec<u64> = coverer.covering(&rect).0.into_iter().map(|c| c.0).collect();
        cells.sort_unstable();
        cells.dedup();
        cells
    }
}

fn km_to_angle_rad(km: f64) -> f64 {
    km / EARTH_RADIUS_KM
}

/// Great-circle distance in kilometres.
pub fn haversine_km(a: LatLng, b: LatLng) -> f64 {
    let (lat1, lat2) = (a.lat.to_radians(), b.lat.to_radians());
    let dlat = lat2 - lat1;
    let dlng = (b.lng - a.lng).to_radians();
    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().min(1.0).asin()
}

/// Distinct vertices of a GeoJSON ring: malformed positions and the closing
/// duplicate are dropped.
pub fn ring_points(ring: &[Position]) -> Vec<LatLng> {
    let mut points: Vec<LatLng> = ring
        .iter()
        .filter(|p| p.len() >= 2 && p[0].is_finite() && p[1].is_finite())
        .map(|p| LatLng::new(p[1], p[0]))
        .collect();
    if points.len() > 1 && points.first() == points.last() {
        points.pop();
    }
    points
}

/// Signed area of a ring on the sphere in km², positive when counter-clockwise.
pub fn signed_area_km2(points: &[LatLng]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for (i, a) in points.iter().enumerate() {
        let b = points[(i + 1) % points.len()];
        let dlng = (b.lng - a.lng).to_radians();
        sum += dlng * (2.0 + a.lat.to_radians().sin() + b.lat.to_radians().sin());
    }
    -sum * EARTH_RADIUS_KM * EARTH_RADIUS_KM / 2.0
}

pub fn area_km2(points: &[LatLng]) -> f64 {
    signed_area_km2(points).abs()
}

/// Reverse the ring in place if it winds clockwise.
pub fn normalize_ccw(ring: &mut Ring) {
    if signed_area_km2(&ring_points(ring)) < 0.0 {
        ring.reverse();
    }
}

/// Closed, counter-clockwise ring of `vertices` points at `radius_km` around `center`.
pub fn circle_ring(center: LatLng, radius_km: f64, vertices: usize) -> Ring {
    let delta = km_to_angle_rad(radius_km);
    let lat1 = center.lat.to_radians();
    let lng1 = center.lng.to_radians();
    let step = std::f64::consts::TAU / vertices.max(3) as f64;

    let mut ring: Ring = (0..vertices.max(3))
        .map(|i| {
            // Bearings decrease from north so the ring winds counter-clockwise
            let bearing = -(i as f64) * step;
            let lat2 = (lat1.sin() * delta.cos() + lat1.cos() * delta.sin() * bearing.cos()).asin();
            let lng2 = lng1
                + (bearing.sin() * delta.sin() * lat1.cos())
                    .atan2(delta.cos() - lat1.sin() * lat2.sin());
            vec![lng2.to_degrees(), lat2.to_degrees()]
        })
        .collect();
    if let Some(first) = ring.first().cloned() {
        ring.push(first);
    }
    ring
}
