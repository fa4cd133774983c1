//! Control point overlay
//!
//! Draws recorded points onto a copy of an image so the pairing can be
//! checked before warping: sources, targets, and an arrow for each pair.

use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut};

use crate::points::Point;

/// Marker colours and sizes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnnotationStyle {
    pub source_color: Rgb<u8>,
    pub target_color: Rgb<u8>,
    pub arrow_color: Rgb<u8>,
    pub radius: i32,
    /// Arrowhead barb length in pixels
    pub head_length: f32,
}

impl Default for AnnotationStyle {
    fn default() -> Self {
        Self {
            source_color: Rgb([0, 0, 255]),
            target_color: Rgb([255, 0, 0]),
            arrow_color: Rgb([0, 255, 0]),
            radius: 1,
            head_length: 4.0,
        }
    }
}

/// Draw source/target markers and pair arrows onto a copy of `image`.
///
/// Unpaired trailing points still get a marker.
pub fn annotate(
    image: &RgbImage,
    source: &[Point],
    target: &[Point],
    style: &AnnotationStyle,
) -> RgbImage {
    let mut canvas = image.clone();

    for (s, t) in source.iter().zip(target) {
        draw_arrow(&mut canvas, *s, *t, style);
    }
    for p in source {
        draw_filled_circle_mut(&mut canvas, pixel(*p), style.radius, style.source_color);
    }
    for p in target {
        draw_filled_circle_mut(&mut canvas, pixel(*p), style.radius, style.target_color);
    }

    canvas
}

fn draw_arrow(canvas: &mut RgbImage, from: Point, to: Point, style: &AnnotationStyle) {
    let start = (from.x as f32, from.y as f32);
    let end = (to.x as f32, to.y as f32);
    draw_line_segment_mut(canvas, start, end, style.arrow_color);

    let dx = end.0 - start.0;
    let dy = end.1 - start.1;
    let len = (dx * dx + dy * dy).sqrt();
    if len < f32::EPSILON {
        return;
    }

    // Two barbs at +/-30 degrees from the reversed shaft
    let (ux, uy) = (-dx / len, -dy / len);
    let (sin, cos) = std::f32::consts::FRAC_PI_6.sin_cos();
    for sign in [1.0f32, -1.0] {
        let bx = ux * cos - sign * uy * sin;
        let by = sign * ux * sin + uy * cos;
        let tip = (end.0 + bx * style.head_length, end.1 + by * style.head_length);
        draw_line_segment_mut(canvas, end, tip, style.arrow_color);
    }
}

#[inline]
fn pixel(p: Point) -> (i32, i32) {
    (p.x.round() as i32, p.y.round() as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markers_drawn() {
        let image = RgbImage::from_pixel(32, 32, Rgb([0, 0, 0]));
        let style = AnnotationStyle::default();
        let source = [Point::new(4.0, 4.0)];
        let target = [Point::new(24.0, 4.0)];

        let out = annotate(&image, &source, &target, &style);

        assert_eq!(*out.get_pixel(4, 4), style.source_color);
        assert_eq!(*out.get_pixel(24, 4), style.target_color);
        // Shaft midpoint
        assert_eq!(*out.get_pixel(14, 4), style.arrow_color);
        // Untouched corner
        assert_eq!(*out.get_pixel(31, 31), Rgb([0, 0, 0]));
        // Input unchanged
        assert_eq!(*image.get_pixel(4, 4), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_pending_source_marked_without_arrow() {
        let image = RgbImage::from_pixel(16, 16, Rgb([0, 0, 0]));
        let style = AnnotationStyle::default();
        let source = [Point::new(8.0, 8.0)];

        let out = annotate(&image, &source, &[], &style);

        assert_eq!(*out.get_pixel(8, 8), style.source_color);
        let arrow_pixels = out.pixels().filter(|p| **p == style.arrow_color).count();
        assert_eq!(arrow_pixels, 0);
    }

    #[test]
    fn test_points_outside_canvas_are_clipped() {
        let image = RgbImage::from_pixel(8, 8, Rgb([0, 0, 0]));
        let source = [Point::new(-20.0, -20.0)];
        let target = [Point::new(40.0, 40.0)];
        let out = annotate(&image, &source, &target, &AnnotationStyle::default());
        assert_eq!(out.dimensions(), (8, 8));
    }
}
