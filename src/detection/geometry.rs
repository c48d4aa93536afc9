use image::imageops::FilterType;
use image::{DynamicImage, Rgb, RgbImage};
use imageproc::geometric_transformations::{warp_into, Interpolation, Projection};
use std::cmp::Ordering;
use tracing::{debug, instrument};

use crate::models::{OrderedQuadrilateral, Point, Quadrilateral};

/// Assign corner roles by `x + y` and `y - x`.
///
/// Smallest sum is top-left, largest sum bottom-right, smallest difference
/// top-right, largest difference bottom-left. Ties are broken on `(y, x)` so
/// the result never depends on input order.
pub fn order_points(quad: &Quadrilateral) -> OrderedQuadrilateral {
    let points = &quad.0;
    OrderedQuadrilateral {
        top_left: extreme(points, point_sum, false),
        top_right: extreme(points, point_diff, false),
        bottom_right: extreme(points, point_sum, true),
        bottom_left: extreme(points, point_diff, true),
    }
}

fn point_sum(p: &Point) -> f32 {
    p.x + p.y
}

fn point_diff(p: &Point) -> f32 {
    p.y - p.x
}

fn extreme(points: &[Point; 4], key: fn(&Point) -> f32, largest: bool) -> Point {
    let compare = |a: &&Point, b: &&Point| -> Ordering {
        key(a)
            .total_cmp(&key(b))
            .then(a.y.total_cmp(&b.y))
            .then(a.x.total_cmp(&b.x))
    };
    let found = if largest {
        points.iter().max_by(compare)
    } else {
        points.iter().min_by(compare)
    };
    // Four-element array, so there is always an extreme.
    *found.unwrap_or(&points[0])
}

/// Warp the region inside `quad` onto an upright `W x H` rectangle.
///
/// Collapsed or collinear corners leave the projective transform unsolvable;
/// the bounding region of the corners is then resized to the target size
/// instead, so this never fails.
#[instrument(level = "debug", skip(image))]
pub fn rectify(image: &DynamicImage, quad: &OrderedQuadrilateral) -> DynamicImage {
    let (width, height) = quad.target_size();
    let right = (width - 1) as f32;
    let bottom = (height - 1) as f32;

    let src = quad.corners().map(|p| (p.x, p.y));
    let dst = [(0.0, 0.0), (right, 0.0), (right, bottom), (0.0, bottom)];

    match Projection::from_control_points(src, dst) {
        Some(projection) => {
            let rgb = image.to_rgb8();
            let mut output = RgbImage::new(width, height);
            warp_into(
                &rgb,
                &projection,
                Interpolation::Bilinear,
                Rgb([255u8, 255, 255]),
                &mut output,
            );
            DynamicImage::ImageRgb8(output)
        }
        None => {
            debug!(width, height, "degenerate quadrilateral, resizing its bounding region");
            crop_to_corners(image, quad).resize_exact(width, height, FilterType::Triangle)
        }
    }
}

/// The part of `image` covered by the corners' bounding box, clamped to the image.
fn crop_to_corners(image: &DynamicImage, quad: &OrderedQuadrilateral) -> DynamicImage {
    let corners = quad.corners();
    let max_x = image.width().saturating_sub(1) as f32;
    let max_y = image.height().saturating_sub(1) as f32;
    let clamp_x = |v: f32| v.clamp(0.0, max_x) as u32;
    let clamp_y = |v: f32| v.clamp(0.0, max_y) as u32;

    let left = clamp_x(corners.iter().map(|p| p.x).fold(f32::MAX, f32::min));
    let right = clamp_x(corners.iter().map(|p| p.x).fold(f32::MIN, f32::max));
    let top = clamp_y(corners.iter().map(|p| p.y).fold(f32::MAX, f32::min));
    let bottom = clamp_y(corners.iter().map(|p| p.y).fold(f32::MIN, f32::max));

    image.crop_imm(left, top, right - left + 1, bottom - top + 1)
}
