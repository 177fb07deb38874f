//! Quad/centroid math for click geometry (spec §4.E step-by-step click
//! algorithm): pick the best of content-quads/box-model/bounding-rect, find
//! its centroid, and clamp it into the viewport.

/// A quad as four (x, y) corners, in the `[x1,y1,x2,y2,x3,y3,x4,y4]` shape
/// CDP returns from `DOM.getContentQuads`/`DOM.getBoxModel`.
pub type Quad = [f64; 8];

/// Area of the quad via the shoelace formula; degenerate quads (zero-area)
/// are never picked as the click target.
pub fn quad_area(quad: &Quad) -> f64 {
    let mut area = 0.0;
    for i in 0..4 {
        let (x1, y1) = (quad[i * 2], quad[i * 2 + 1]);
        let j = (i + 1) % 4;
        let (x2, y2) = (quad[j * 2], quad[j * 2 + 1]);
        area += x1 * y2 - x2 * y1;
    }
    (area / 2.0).abs()
}

/// Axis-aligned intersection area between a quad's bounding box and the
/// viewport, used to pick the candidate most visible on screen.
pub fn intersection_with_viewport(quad: &Quad, viewport_width: f64, viewport_height: f64) -> f64 {
    let xs = [quad[0], quad[2], quad[4], quad[6]];
    let ys = [quad[1], quad[3], quad[5], quad[7]];
    let min_x = xs.iter().cloned().fold(f64::INFINITY, f64::min);
    let max_x = xs.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let min_y = ys.iter().cloned().fold(f64::INFINITY, f64::min);
    let max_y = ys.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

    let overlap_x = (max_x.min(viewport_width) - min_x.max(0.0)).max(0.0);
    let overlap_y = (max_y.min(viewport_height) - min_y.max(0.0)).max(0.0);
    overlap_x * overlap_y
}

/// Picks the quad with the largest intersection with the viewport among
/// `candidates`; if every candidate has zero intersection (fully off-screen,
/// e.g. before scrolling), falls back to the first candidate per spec §4.E.
pub fn pick_best_quad(candidates: &[Quad], viewport_width: f64, viewport_height: f64) -> Option<Quad> {
    let non_degenerate: Vec<&Quad> = candidates.iter().filter(|q| quad_area(q) > 0.0).collect();
    if non_degenerate.is_empty() {
        return None;
    }

    non_degenerate
        .iter()
        .max_by(|a, b| {
            let ia = intersection_with_viewport(a, viewport_width, viewport_height);
            let ib = intersection_with_viewport(b, viewport_width, viewport_height);
            ia.partial_cmp(&ib).unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|q| **q)
        .or_else(|| non_degenerate.first().map(|q| **q))
}

/// Centroid of a quad's four corners.
pub fn centroid(quad: &Quad) -> (f64, f64) {
    let x = (quad[0] + quad[2] + quad[4] + quad[6]) / 4.0;
    let y = (quad[1] + quad[3] + quad[5] + quad[7]) / 4.0;
    (x, y)
}

/// Clamps a point to `[0, viewport_width - 1] x [0, viewport_height - 1]` so
/// the dispatched mouse event always lands inside the visible surface.
pub fn clamp_to_viewport(point: (f64, f64), viewport_width: f64, viewport_height: f64) -> (f64, f64) {
    let max_x = (viewport_width - 1.0).max(0.0);
    let max_y = (viewport_height - 1.0).max(0.0);
    (point.0.clamp(0.0, max_x), point.1.clamp(0.0, max_y))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x: f64, y: f64, size: f64) -> Quad {
        [x, y, x + size, y, x + size, y + size, x, y + size]
    }

    #[test]
    fn quad_area_computes_square_area() {
        let quad = square(0.0, 0.0, 10.0);
        assert_eq!(quad_area(&quad), 100.0);
    }

    #[test]
    fn centroid_is_the_square_center() {
        let quad = square(0.0, 0.0, 10.0);
        assert_eq!(centroid(&quad), (5.0, 5.0));
    }

    #[test]
    fn pick_best_quad_prefers_more_visible_candidate() {
        let offscreen = square(-500.0, -500.0, 10.0);
        let onscreen = square(100.0, 100.0, 10.0);
        let best = pick_best_quad(&[offscreen, onscreen], 1280.0, 720.0).unwrap();
        assert_eq!(best, onscreen);
    }

    #[test]
    fn pick_best_quad_falls_back_to_first_when_all_offscreen() {
        let a = square(-1000.0, -1000.0, 10.0);
        let b = square(-2000.0, -2000.0, 10.0);
        let best = pick_best_quad(&[a, b], 1280.0, 720.0).unwrap();
        assert_eq!(best, a);
    }

    #[test]
    fn pick_best_quad_ignores_degenerate_quads() {
        let degenerate = [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0];
        let real = square(10.0, 10.0, 5.0);
        let best = pick_best_quad(&[degenerate, real], 1280.0, 720.0).unwrap();
        assert_eq!(best, real);
    }

    #[test]
    fn clamp_to_viewport_keeps_point_inside_bounds() {
        let clamped = clamp_to_viewport((2000.0, -50.0), 1280.0, 720.0);
        assert_eq!(clamped, (1279.0, 0.0));
    }
}
