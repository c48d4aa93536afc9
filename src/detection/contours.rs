use image::GrayImage;
use imageproc::contours::{find_contours, BorderType};
use imageproc::geometry::approximate_polygon_dp;

use crate::models::{Contour, Point};

/// Outer borders of the top-level white regions of a binary mask.
pub fn find_external_contours(mask: &GrayImage) -> Vec<Contour> {
    find_contours::<i32>(mask)
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .map(|c| Contour::new(c.points.into_iter().map(Point::from).collect()))
        .collect()
}

/// The contour enclosing the largest area.
pub fn largest_contour(contours: Vec<Contour>) -> Option<Contour> {
    contours
        .into_iter()
        .max_by(|a, b| a.area().total_cmp(&b.area()))
}

/// Simplify a closed outline with Douglas-Peucker.
pub fn approximate_polygon(points: &[Point], epsilon: f64) -> Vec<Point> {
    let mut curve: Vec<imageproc::point::Point<f32>> =
        points.iter().copied().map(Into::into).collect();
    // The outline is closed implicitly; a repeated start point would collapse the first chord.
    if curve.len() > 1 && curve.first() == curve.last() {
        curve.pop();
    }
    if curve.len() < 3 || epsilon <= 0.0 {
        return curve.into_iter().map(Point::from).collect();
    }
    approximate_polygon_dp(&curve, epsilon, true)
        .into_iter()
        .map(Point::from)
        .collect()
}
