//! Point-guided image deformation
//!
//! This module implements the radial basis function (RBF) warp that drags a
//! set of source points onto a set of target points while the rest of the
//! image follows smoothly. The warp is a backward map: for every output pixel
//! we evaluate the interpolated displacement, round to the nearest source
//! pixel, and copy it. Samples that land outside the image take the
//! background colour.
//!
//! Pixel coordinates are 0-indexed `(column, row)` with the origin at the
//! top-left pixel. Control points use the same frame.

use image::{Rgb, RgbImage};
use nalgebra::DMatrix;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, WarpError};
use crate::points::Point;

/// Default kernel scale `d` in `f(r) = 1 / (r² + d)`
pub const DEFAULT_KERNEL_SCALE: f64 = 20000.0;

/// Smallest accepted ratio of smallest to largest singular value of the
/// kernel matrix
const MIN_RECIPROCAL_CONDITION: f64 = 1e-12;

/// Largest accepted `|A x - b| / |b|` after the solve
const MAX_RELATIVE_RESIDUAL: f64 = 1e-6;

/// Background colour for samples that fall outside the source image
pub const DEFAULT_BACKGROUND: [u8; 3] = [255, 255, 255];

/// Tunable warp parameters
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WarpParams {
    /// Kernel scale `d`; larger values spread each point's influence further
    pub kernel_scale: f64,
    /// Multiplier on the interpolated displacement (1.0 = full deformation)
    pub alpha: f64,
    /// Fill colour for out-of-image samples
    pub background: [u8; 3],
}

impl Default for WarpParams {
    fn default() -> Self {
        Self {
            kernel_scale: DEFAULT_KERNEL_SCALE,
            alpha: 1.0,
            background: DEFAULT_BACKGROUND,
        }
    }
}

impl WarpParams {
    pub fn validate(&self) -> Result<()> {
        if !self.kernel_scale.is_finite() || self.kernel_scale <= 0.0 {
            return Err(WarpError::InvalidParameter {
                name: "kernel_scale",
                value: self.kernel_scale,
            });
        }
        if !self.alpha.is_finite() {
            return Err(WarpError::InvalidParameter {
                name: "alpha",
                value: self.alpha,
            });
        }
        Ok(())
    }
}

/// Inverse-quadratic kernel `f(r) = 1 / (r² + d)`
///
/// Strictly positive and decreasing in `r`, finite at `r = 0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RbfKernel {
    scale: f64,
}

impl RbfKernel {
    pub fn new(scale: f64) -> Self {
        Self { scale }
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Evaluate the kernel for a squared distance
    #[inline]
    pub fn eval(&self, r_squared: f64) -> f64 {
        1.0 / (r_squared + self.scale)
    }
}

/// Dense backward map: for each output pixel, the (unrounded) source
/// coordinate it samples from. Row-major, `width * height` entries.
#[derive(Debug, Clone, PartialEq)]
pub struct InverseMap {
    width: u32,
    height: u32,
    coords: Vec<[f64; 2]>,
}

impl InverseMap {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Source coordinate for output pixel `(x, y)`
    pub fn get(&self, x: u32, y: u32) -> Option<[f64; 2]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.coords
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }

    pub fn as_slice(&self) -> &[[f64; 2]] {
        &self.coords
    }
}

/// A solved RBF deformation, ready to be applied to images
#[derive(Debug, Clone)]
pub struct RbfDeformation {
    kernel: RbfKernel,
    /// Target points (kernel centres)
    centers: Vec<Point>,
    /// Per-centre weight vectors
    coeffs: Vec<[f64; 2]>,
    alpha: f64,
    background: [u8; 3],
}

impl RbfDeformation {
    /// Solve the interpolation system for the given control points.
    ///
    /// The resulting field moves each target location back onto its source
    /// point, so warping copies `source[i]` to `target[i]`.
    pub fn compute(source: &[Point], target: &[Point], params: &WarpParams) -> Result<Self> {
        params.validate()?;
        check_points(source, target)?;

        let kernel = RbfKernel::new(params.kernel_scale);
        let coeffs = match source.len() {
            0 => Vec::new(),
            // 1x1 system: A = f(0) = 1/d, so the weight is just (s - t) * d
            1 => {
                let (s, t) = (source[0], target[0]);
                vec![[(s.x - t.x) * kernel.scale(), (s.y - t.y) * kernel.scale()]]
            }
            _ => solve_coefficients(&kernel, source, target)?,
        };

        if coeffs.iter().flatten().any(|c| !c.is_finite()) {
            return Err(WarpError::NonFiniteSolution);
        }

        Ok(Self {
            kernel,
            centers: target.to_vec(),
            coeffs,
            alpha: params.alpha,
            background: params.background,
        })
    }

    /// Number of control points
    pub fn len(&self) -> usize {
        self.centers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.centers.is_empty()
    }

    pub fn coefficients(&self) -> &[[f64; 2]] {
        &self.coeffs
    }

    /// Interpolated displacement at `(x, y)`, before `alpha` scaling
    #[inline]
    pub fn displacement(&self, x: f64, y: f64) -> (f64, f64) {
        let p = Point::new(x, y);
        self.centers
            .iter()
            .zip(&self.coeffs)
            .fold((0.0, 0.0), |(dx, dy), (c, w)| {
                let k = self.kernel.eval(p.distance_squared(c));
                (dx + k * w[0], dy + k * w[1])
            })
    }

    /// Map an output coordinate to the source coordinate it samples
    #[inline]
    pub fn inverse_transform_point(&self, x: f64, y: f64) -> (f64, f64) {
        let (dx, dy) = self.displacement(x, y);
        (x + self.alpha * dx, y + self.alpha * dy)
    }

    /// Evaluate the backward map over a `width`x`height` grid
    pub fn inverse_map(&self, width: u32, height: u32) -> InverseMap {
        let w = width as usize;
        let mut coords = vec![[0.0f64; 2]; w * height as usize];

        if w > 0 {
            coords
                .par_chunks_exact_mut(w)
                .enumerate()
                .for_each(|(row, chunk)| {
                    for (col, out) in chunk.iter_mut().enumerate() {
                        let (sx, sy) = self.inverse_transform_point(col as f64, row as f64);
                        *out = [sx, sy];
                    }
                });
        }

        InverseMap {
            width,
            height,
            coords,
        }
    }

    /// Apply the deformation to an RGB image
    pub fn warp_image(&self, image: &RgbImage) -> Result<RgbImage> {
        check_image(image)?;
        if self.is_empty() {
            return Ok(image.clone());
        }

        let map = self.inverse_map(image.width(), image.height());
        remap_nearest(image, &map, self.background)
    }
}

/// Warp `image` so that each `source[i]` lands on `target[i]`.
///
/// With no control points the image is returned unchanged. Fails on
/// mismatched point counts, an empty image, invalid parameters, or a
/// singular interpolation system (e.g. two identical targets). The input is
/// never modified.
pub fn warp(
    image: &RgbImage,
    source: &[Point],
    target: &[Point],
    params: &WarpParams,
) -> Result<RgbImage> {
    params.validate()?;
    check_points(source, target)?;
    check_image(image)?;

    if source.is_empty() {
        debug!("No control points, returning input unchanged");
        return Ok(image.clone());
    }

    let deformation = RbfDeformation::compute(source, target, params)?;
    deformation.warp_image(image)
}

/// Nearest-neighbour resample of `src` through an inverse map.
///
/// Coordinates are rounded half-to-even; anything outside
/// `[0, width) x [0, height)` gets `background`.
pub fn remap_nearest(src: &RgbImage, map: &InverseMap, background: [u8; 3]) -> Result<RgbImage> {
    check_image(src)?;
    let (width, height) = src.dimensions();
    if map.width != width || map.height != height {
        return Err(WarpError::MapSizeMismatch {
            map_width: map.width,
            map_height: map.height,
            width,
            height,
        });
    }

    let mut out = RgbImage::from_pixel(width, height, Rgb(background));
    let row_len = width as usize * 3;
    let buf: &mut [u8] = &mut out;

    let sampled: usize = buf
        .par_chunks_exact_mut(row_len)
        .zip(map.as_slice().par_chunks_exact(width as usize))
        .map(|(row, coords)| {
            let mut hits = 0;
            for (px, coord) in row.chunks_exact_mut(3).zip(coords) {
                if let Some((sx, sy)) = sample_index(*coord, width, height) {
                    px.copy_from_slice(&src.get_pixel(sx, sy).0);
                    hits += 1;
                }
            }
            hits
        })
        .sum();

    debug!(
        "Resampled {}x{} image: {} pixels sampled, {} background",
        width,
        height,
        sampled,
        (width as usize * height as usize) - sampled
    );

    Ok(out)
}

/// Round a source coordinate to a pixel index, if it lies inside the image
#[inline]
fn sample_index(coord: [f64; 2], width: u32, height: u32) -> Option<(u32, u32)> {
    let x = coord[0].round_ties_even();
    let y = coord[1].round_ties_even();
    // NaN fails both comparisons
    if x >= 0.0 && x < width as f64 && y >= 0.0 && y < height as f64 {
        Some((x as u32, y as u32))
    } else {
        None
    }
}

fn check_image(image: &RgbImage) -> Result<()> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(WarpError::EmptyImage { width, height });
    }
    Ok(())
}

fn check_points(source: &[Point], target: &[Point]) -> Result<()> {
    if source.len() != target.len() {
        return Err(WarpError::LengthMismatch {
            sources: source.len(),
            targets: target.len(),
        });
    }
    for (index, (s, t)) in source.iter().zip(target).enumerate() {
        if !s.is_finite() || !t.is_finite() {
            return Err(WarpError::NonFinitePoint { index });
        }
    }
    Ok(())
}

/// Solve `A * coeffs = source - target` with `A[i][j] = f(|t_i - t_j|)`
fn solve_coefficients(
    kernel: &RbfKernel,
    source: &[Point],
    target: &[Point],
) -> Result<Vec<[f64; 2]>> {
    let n = target.len();

    // Duplicate targets give two identical rows
    for i in 0..n {
        for j in (i + 1)..n {
            if target[i].distance_squared(&target[j]) == 0.0 {
                return Err(WarpError::SingularSystem {
                    reason: format!("target points {} and {} coincide", i, j),
                });
            }
        }
    }

    let a = DMatrix::from_fn(n, n, |i, j| {
        kernel.eval(target[i].distance_squared(&target[j]))
    });
    let b = DMatrix::from_fn(n, 2, |i, c| {
        if c == 0 {
            source[i].x - target[i].x
        } else {
            source[i].y - target[i].y
        }
    });

    // Clustered targets give a kernel matrix whose rows are nearly equal;
    // LU still succeeds there but returns roundoff as coefficients.
    let singular = a.singular_values();
    let max_sv = singular.max();
    let min_sv = singular.min();
    let rcond = if max_sv > 0.0 { min_sv / max_sv } else { 0.0 };
    if !(rcond > MIN_RECIPROCAL_CONDITION) {
        return Err(WarpError::SingularSystem {
            reason: format!("kernel matrix is ill-conditioned (rcond {:e})", rcond),
        });
    }

    let x = a.clone().lu().solve(&b).ok_or_else(|| WarpError::SingularSystem {
        reason: "LU decomposition is not invertible".to_string(),
    })?;

    let residual = (&a * &x - &b).norm();
    if !(residual <= MAX_RELATIVE_RESIDUAL * b.norm()) {
        return Err(WarpError::SingularSystem {
            reason: format!("solve residual {:e} too large", residual),
        });
    }

    debug!("Solved {}x{} RBF system", n, n);

    Ok((0..n).map(|i| [x[(i, 0)], x[(i, 1)]]).collect())
}
