use std::fmt;
use std::str::FromStr;

use crate::geo::{LatLng, LatLngBounds};

/// Number of values in the `bounds` query parameter.
pub const BOUNDS_LEN: usize = 8;

/// Viewport bounds as the area endpoints expect them: four `(lat, lng)` corner pairs,
/// NE, SE, SW, NW.
///
/// The order is part of the wire contract and must not be "normalized":
/// `[NE.lat, NE.lng, SW.lat, NE.lng, SW.lat, SW.lng, NE.lat, SW.lng]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QueryBounds([f64; BOUNDS_LEN]);

impl QueryBounds {
    pub fn from_lat_lng_bounds(bounds: &LatLngBounds) -> Self {
        let ne = bounds.north_east;
        let sw = bounds.south_west;
        QueryBounds([
            ne.lat, ne.lng, sw.lat, ne.lng, sw.lat, sw.lng, ne.lat, sw.lng,
        ])
    }

    /// Adapter entry point for a map that may not be measured yet.
    /// `None` means "no bounds available, skip the fetch".
    pub fn from_viewport(bounds: Option<&LatLngBounds>) -> Option<Self> {
        bounds.map(Self::from_lat_lng_bounds)
    }

    pub fn values(&self) -> &[f64; BOUNDS_LEN] {
        &self.0
    }

    /// The four corners in wire order.
    pub fn corners(&self) -> [LatLng; 4] {
        let v = &self.0;
        [
            LatLng::new(v[0], v[1]),
            LatLng::new(v[2], v[3]),
            LatLng::new(v[4], v[5]),
            LatLng::new(v[6], v[7]),
        ]
    }

    /// Smallest rectangle containing all four corners.
    pub fn enclosing(&self) -> LatLngBounds {
        let corners = self.corners();
        let mut north = f64::MIN;
        let mut south = f64::MAX;
        let mut east = f64::MIN;
        let mut west = f64::MAX;
        for c in corners {
            north = north.max(c.lat);
            south = south.min(c.lat);
            east = east.max(c.lng);
            west = west.min(c.lng);
        }
        LatLngBounds::new(LatLng::new(north, east), LatLng::new(south, west))
    }
}

impl fmt::Display for QueryBounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, v) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}", v)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BoundsParseError {
    WrongCount(usize),
    InvalidNumber(String),
}

impl fmt::Display for BoundsParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundsParseError::WrongCount(n) => {
                write!(f, "expected {} comma-separated numbers, got {}", BOUNDS_LEN, n)
            }
            BoundsParseError::InvalidNumber(s) => write!(f, "invalid number in bounds: {:?}", s),
        }
    }
}

impl std::error::Error for BoundsParseError {}

impl FromStr for QueryBounds {
    type Err = BoundsParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != BOUNDS_LEN {
            return Err(BoundsParseError::WrongCount(parts.len()));
        }
        let mut values = [0.0; BOUNDS_LEN];
        for (slot, part) in values.iter_mut().zip(parts) {
            let v: f64 = part
                .parse()
                .map_err(|_| BoundsParseError::InvalidNumber(part.to_string()))?;
            if !v.is_finite() {
                return Err(BoundsParseError::InvalidNumber(part.to_string()));
            }
            *slot = v;
        }
        Ok(QueryBounds(values))
    }
}
