use std::fmt::Write;

use airspace_shared::geo::{LatLng, Pixel, Viewport};
use airspace_shared::models::Ring;

/// Get the bounding client rect of an element by id.
pub fn container_rect(container_id: &str) -> Option<web_sys::DomRect> {
    let document = web_sys::window()?.document()?;
    let element = document.get_element_by_id(container_id)?;
    Some(element.get_bounding_client_rect())
}

/// Convert client (viewport) coordinates to container-relative pixel coordinates.
pub fn client_to_container(client_x: f64, client_y: f64, rect_left: f64, rect_top: f64) -> Pixel {
    Pixel::new(client_x - rect_left, client_y - rect_top)
}

/// Geographic position under a client-space point, using the live container rect.
pub fn client_to_lat_lng(
    client_x: f64,
    client_y: f64,
    container_id: &str,
    viewport: &Viewport,
) -> Option<LatLng> {
    let rect = container_rect(container_id)?;
    let point = client_to_container(client_x, client_y, rect.left(), rect.top());
    Some(viewport.lat_lng_at(point))
}

/// SVG path data for one polygon (outer ring plus holes) in container space.
///
/// Positions are GeoJSON `[lng, lat]`; malformed positions are skipped and rings
/// with fewer than three usable vertices are dropped. Pair with `fill-rule: evenodd`
/// so holes render as holes.
pub fn polygon_path(viewport: &Viewport, rings: &[Ring]) -> String {
    let mut d = String::new();
    for ring in rings {
        let points: Vec<Pixel> = ring
            .iter()
            .filter(|pos| pos.len() >= 2)
            .map(|pos| viewport.container_point(LatLng::new(pos[1], pos[0])))
            .collect();
        if points.len() < 3 {
            continue;
        }
        for (i, p) in points.iter().enumerate() {
            let cmd = if i == 0 { 'M' } else { 'L' };
            let _ = write!(d, "{}{:.1} {:.1}", cmd, p.x, p.y);
        }
        d.push('Z');
    }
    d
}

#[cfg(test)]
mod tests {
    use super::*;
    use airspace_shared::geo::project;

    fn viewport() -> Viewport {
        Viewport::new(LatLng::new(35.694644, 139.732008), 13, 800.0, 600.0)
    }

    #[test]
    fn test_client_to_container_origin() {
        let p = client_to_container(100.0, 200.0, 100.0, 200.0);
        assert!((p.x - 0.0).abs() < 1e-9);
        assert!((p.y - 0.0).abs() < 1e-9);
    }

    #[test]
    fn test_client_to_container_offset() {
        let p = client_to_container(450.0, 350.0, 320.0, 50.0);
        assert!((p.x - 130.0).abs() < 1e-9);
        assert!((p.y - 300.0).abs() < 1e-9);
    }

    #[test]
    fn test_polygon_path_starts_with_move_and_closes() {
        let vp = viewport();
        let ring = vec![
            vec![139.72, 35.69],
            vec![139.74, 35.69],
            vec![139.74, 35.70],
            vec![139.72, 35.69],
        ];
        let d = polygon_path(&vp, &[ring]);
        assert!(d.starts_with('M'));
        assert!(d.ends_with('Z'));
        assert_eq!(d.matches('L').count(), 3);
    }

    #[test]
    fn test_polygon_path_center_maps_to_container_center() {
        let vp = viewport();
        let c = vp.center;
        let ring = vec![
            vec![c.lng, c.lat],
            vec![c.lng + 0.01, c.lat],
            vec![c.lng, c.lat + 0.01],
            vec![c.lng, c.lat],
        ];
        let d = polygon_path(&vp, &[ring]);
        assert!(d.starts_with("M400.0 300.0"), "{}", d);
    }

    #[test]
    fn test_polygon_path_holes_become_subpaths() {
        let vp = viewport();
        let outer = vec![
            vec![139.70, 35.68],
            vec![139.76, 35.68],
            vec![139.76, 35.71],
            vec![139.70, 35.71],
            vec![139.70, 35.68],
        ];
        let hole = vec![
            vec![139.72, 35.69],
            vec![139.73, 35.69],
            vec![139.73, 35.70],
            vec![139.72, 35.69],
        ];
        let d = polygon_path(&vp, &[outer, hole]);
        assert_eq!(d.matches('M').count(), 2);
        assert_eq!(d.matches('Z').count(), 2);
    }

    #[test]
    fn test_polygon_path_skips_degenerate_rings() {
        let vp = viewport();
        let d = polygon_path(&vp, &[vec![vec![139.7, 35.6], vec![139.8]]]);
        assert!(d.is_empty());
    }

    #[test]
    fn test_polygon_path_matches_projection() {
        let vp = viewport();
        let p = LatLng::new(35.70, 139.75);
        let world = project(p, vp.zoom);
        let center = project(vp.center, vp.zoom);
        let expected_x = world.x - center.x + 400.0;
        let ring = vec![
            vec![p.lng, p.lat],
            vec![p.lng + 0.01, p.lat],
            vec![p.lng, p.lat + 0.01],
        ];
        let d = polygon_path(&vp, &[ring]);
        assert!(d.starts_with(&format!("M{:.1}", expected_x)), "{}", d);
    }
}
