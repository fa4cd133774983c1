//! Interactive warp session state
//!
//! Owns the currently loaded image and the recorded control points. A front
//! end drives it with image loads, clicks and clears, and asks it to run the
//! warp on a snapshot of the points.

use image::RgbImage;
use tracing::{debug, warn};

use crate::annotate::{annotate, AnnotationStyle};
use crate::error::{Result, WarpError};
use crate::points::{Point, PointRole, PointStore};
use crate::transform::{warp, WarpParams};

#[derive(Debug, Clone, Default)]
pub struct WarpSession {
    image: Option<RgbImage>,
    points: PointStore,
    params: WarpParams,
    style: AnnotationStyle,
}

impl WarpSession {
    pub fn new(params: WarpParams) -> Self {
        Self {
            params,
            ..Self::default()
        }
    }

    /// Replace the working image. Recorded points are discarded.
    pub fn load_image(&mut self, image: RgbImage) {
        debug!("Loaded {}x{} image", image.width(), image.height());
        self.points.clear();
        self.image = Some(image);
    }

    pub fn image(&self) -> Option<&RgbImage> {
        self.image.as_ref()
    }

    pub fn points(&self) -> &PointStore {
        &self.points
    }

    pub fn points_mut(&mut self) -> &mut PointStore {
        &mut self.points
    }

    pub fn params(&self) -> &WarpParams {
        &self.params
    }

    pub fn set_style(&mut self, style: AnnotationStyle) {
        self.style = style;
    }

    /// Record a click on the image as the next source or target point
    pub fn record_click(&mut self, x: f64, y: f64) -> Result<PointRole> {
        let image = self.image.as_ref().ok_or(WarpError::NoImage)?;
        let point = Point::new(x, y);
        if !point.is_inside(image.width(), image.height()) {
            return Err(WarpError::PointOutOfBounds {
                x,
                y,
                width: image.width(),
                height: image.height(),
            });
        }
        Ok(self.points.record(point))
    }

    pub fn clear_points(&mut self) {
        self.points.clear();
    }

    /// The loaded image with the recorded points drawn on top
    pub fn annotated(&self) -> Result<RgbImage> {
        let image = self.image.as_ref().ok_or(WarpError::NoImage)?;
        Ok(annotate(
            image,
            self.points.source(),
            self.points.target(),
            &self.style,
        ))
    }

    /// Warp the loaded image with the current points
    pub fn run_warp(&self) -> Result<RgbImage> {
        let image = self.image.as_ref().ok_or(WarpError::NoImage)?;
        if let Some(p) = self.points.pending_source() {
            warn!("Source point ({}, {}) has no target yet", p.x, p.y);
        }
        let (source, target) = self.points.snapshot();
        warp(image, &source, &target, &self.params)
    }
}
