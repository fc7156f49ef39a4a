/// Web Mercator map geometry.
///
/// World pixel space at zoom `z` is a `256 * 2^z` pixel square with its origin
/// at the north-west corner (lng -180, lat ~85.05). Zoom levels are integral,
/// matching the raster tile pyramid.
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

// Raster tile edge in pixels
pub const TILE_SIZE: f64 = 256.0;

// Latitude limit of the square Mercator world
pub const MAX_LATITUDE: f64 = 85.0511287798;

pub const MIN_ZOOM: u8 = 0;
pub const MAX_ZOOM: u8 = 18;

/// Subdomains rotated through by `{s}` in a tile URL template.
pub const TILE_SUBDOMAINS: [&str; 3] = ["a", "b", "c"];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub const fn new(lat: f64, lng: f64) -> Self {
        LatLng { lat, lng }
    }
}

/// Axis-aligned geographic rectangle given by its north-east and south-west corners.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLngBounds {
    pub north_east: LatLng,
    pub south_west: LatLng,
}

impl LatLngBounds {
    pub fn new(north_east: LatLng, south_west: LatLng) -> Self {
        LatLngBounds {
            north_east,
            south_west,
        }
    }

    pub fn contains(&self, p: LatLng) -> bool {
        p.lat <= self.north_east.lat
            && p.lat >= self.south_west.lat
            && p.lng <= self.north_east.lng
            && p.lng >= self.south_west.lng
    }

    /// True when the two rectangles share at least one point.
    pub fn intersects(&self, other: &LatLngBounds) -> bool {
        self.south_west.lat <= other.north_east.lat
            && self.north_east.lat >= other.south_west.lat
            && self.south_west.lng <= other.north_east.lng
            && self.north_east.lng >= other.south_west.lng
    }

    /// Smallest rectangle containing every point, or `None` for no points.
    pub fn around(points: impl IntoIterator<Item = LatLng>) -> Option<Self> {
        points.into_iter().fold(None, |acc, p| {
            Some(match acc {
                None => LatLngBounds::new(p, p),
                Some(b) => LatLngBounds::new(
                    LatLng::new(b.north_east.lat.max(p.lat), b.north_east.lng.max(p.lng)),
                    LatLng::new(b.south_west.lat.min(p.lat), b.south_west.lng.min(p.lng)),
                ),
            })
        })
    }

    pub fn center(&self) -> LatLng {
        LatLng::new(
            (self.north_east.lat + self.south_west.lat) / 2.0,
            (self.north_east.lng + self.south_west.lng) / 2.0,
        )
    }
}

/// A point in pixels, either world space or container space depending on context.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pixel {
    pub x: f64,
    pub y: f64,
}

impl Pixel {
    pub const fn new(x: f64, y: f64) -> Self {
        Pixel { x, y }
    }
}

/// Edge length of the world in pixels at `zoom`.
pub fn world_size(zoom: u8) -> f64 {
    TILE_SIZE * 2f64.powi(zoom as i32)
}

/// Spherical Mercator projection of `p` into world pixels at `zoom`.
pub fn project(p: LatLng, zoom: u8) -> Pixel {
    let size = world_size(zoom);
    let lat = p.lat.clamp(-MAX_LATITUDE, MAX_LATITUDE);
    let sin_lat = lat.to_radians().sin();
    let x = (p.lng + 180.0) / 360.0 * size;
    let y = (0.5 - ((1.0 + sin_lat) / (1.0 - sin_lat)).ln() / (4.0 * PI)) * size;
    Pixel::new(x, y)
}

/// Inverse of [`project`].
pub fn unproject(px: Pixel, zoom: u8) -> LatLng {
    let size = world_size(zoom);
    let lng = px.x / size * 360.0 - 180.0;
    let n = PI - 2.0 * PI * px.y / size;
    LatLng::new(n.sinh().atan().to_degrees(), lng)
}

/// One raster tile placed in container space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileCoord {
    pub x: u32,
    pub y: u32,
    pub z: u8,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileSlot {
    pub coord: TileCoord,
    /// Container-space offset of the tile's top-left corner.
    pub left: f64,
    pub top: f64,
}

/// Expand an XYZ URL template (`{s}`, `{z}`, `{x}`, `{y}`) for one tile.
pub fn tile_url(template: &str, coord: TileCoord) -> String {
    let sub = TILE_SUBDOMAINS[((coord.x + coord.y) as usize) % TILE_SUBDOMAINS.len()];
    template
        .replace("{s}", sub)
        .replace("{z}", &coord.z.to_string())
        .replace("{x}", &coord.x.to_string())
        .replace("{y}", &coord.y.to_string())
}

/// The visible map window: a center, an integral zoom and the container size in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub center: LatLng,
    pub zoom: u8,
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(center: LatLng, zoom: u8, width: f64, height: f64) -> Self {
        Viewport {
            center,
            zoom: zoom.clamp(MIN_ZOOM, MAX_ZOOM),
            width,
            height,
        }
    }

    pub fn with_size(self, width: f64, height: f64) -> Self {
        Viewport {
            width,
            height,
            ..self
        }
    }

    /// World pixel at the container's top-left corner.
    fn pixel_origin(&self) -> Pixel {
        let c = project(self.center, self.zoom);
        Pixel::new(c.x - self.width / 2.0, c.y - self.height / 2.0)
    }

    /// Container-space position of a geographic point.
    pub fn container_point(&self, p: LatLng) -> Pixel {
        let origin = self.pixel_origin();
        let world = project(p, self.zoom);
        Pixel::new(world.x - origin.x, world.y - origin.y)
    }

    /// Geographic position under a container-space point.
    pub fn lat_lng_at(&self, point: Pixel) -> LatLng {
        let origin = self.pixel_origin();
        unproject(Pixel::new(origin.x + point.x, origin.y + point.y), self.zoom)
    }

    /// Geographic bounds of the container, or `None` before the container has a size.
    pub fn bounds(&self) -> Option<LatLngBounds> {
        if self.width <= 0.0 || self.height <= 0.0 {
            return None;
        }
        let north_east = self.lat_lng_at(Pixel::new(self.width, 0.0));
        let south_west = self.lat_lng_at(Pixel::new(0.0, self.height));
        Some(LatLngBounds::new(north_east, south_west))
    }

    /// Viewport after dragging the map content by `(dx, dy)` container pixels.
    pub fn panned_by(&self, dx: f64, dy: f64) -> Self {
        let c = project(self.center, self.zoom);
        let mut center = unproject(Pixel::new(c.x - dx, c.y - dy), self.zoom);
        center.lat = center.lat.clamp(-MAX_LATITUDE, MAX_LATITUDE);
        Viewport { center, ..*self }
    }

    /// Viewport at `zoom` keeping the geographic point under `focus` fixed on screen.
    pub fn zoomed_at(&self, focus: Pixel, zoom: u8) -> Self {
        let zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        if zoom == self.zoom {
            return *self;
        }
        let anchor = self.lat_lng_at(focus);
        let anchor_px = project(anchor, zoom);
        let center_px = Pixel::new(
            anchor_px.x - (focus.x - self.width / 2.0),
            anchor_px.y - (focus.y - self.height / 2.0),
        );
        let mut center = unproject(center_px, zoom);
        center.lat = center.lat.clamp(-MAX_LATITUDE, MAX_LATITUDE);
        Viewport {
            center,
            zoom,
            ..*self
        }
    }

    /// Tiles covering the container. Columns wrap around the antimeridian; rows outside
    /// the world are skipped.
    pub fn visible_tiles(&self) -> Vec<TileSlot> {
        if self.width <= 0.0 || self.height <= 0.0 {
            return Vec::new();
        }
        let origin = self.pixel_origin();
        let tiles_per_side = 1i64 << self.zoom;

        let first_col = (origin.x / TILE_SIZE).floor() as i64;
        let last_col = ((origin.x + self.width) / TILE_SIZE).ceil() as i64 - 1;
        let first_row = ((origin.y / TILE_SIZE).floor() as i64).max(0);
        let last_row = (((origin.y + self.height) / TILE_SIZE).ceil() as i64 - 1)
            .min(tiles_per_side - 1);

        let mut slots = Vec::new();
        for row in first_row..=last_row {
            for col in first_col..=last_col {
                slots.push(TileSlot {
                    coord: TileCoord {
                        x: col.rem_euclid(tiles_per_side) as u32,
                        y: row as u32,
                        z: self.zoom,
                    },
                    left: col as f64 * TILE_SIZE - origin.x,
                    top: row as f64 * TILE_SIZE - origin.y,
                });
            }
        }
        slots
    }
}
