//! Control point storage and click pairing
//!
//! Points are recorded in click order: the first click of each pair is the
//! source (the pixel to be moved), the second is the target (where it should
//! land). The deformation engine only ever sees owned snapshots.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

/// A 2D point in pixel coordinates (0-indexed, origin top-left)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean distance to another point
    #[inline]
    pub fn distance_squared(&self, other: &Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Whether the point addresses a pixel of a `width`x`height` image
    pub fn is_inside(&self, width: u32, height: u32) -> bool {
        self.x >= 0.0 && self.y >= 0.0 && self.x < width as f64 && self.y < height as f64
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

/// A source point and the target it is dragged onto
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ControlPair {
    pub source: Point,
    pub target: Point,
}

impl ControlPair {
    pub fn new(source: Point, target: Point) -> Self {
        Self { source, target }
    }
}

impl fmt::Display for ControlPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{}:{},{}",
            self.source.x, self.source.y, self.target.x, self.target.y
        )
    }
}

/// Parses `sx,sy:tx,ty`
impl FromStr for ControlPair {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (src, dst) = s
            .split_once(':')
            .ok_or_else(|| format!("expected 'sx,sy:tx,ty', got '{}'", s))?;
        Ok(Self {
            source: parse_point(src)?,
            target: parse_point(dst)?,
        })
    }
}

fn parse_point(s: &str) -> Result<Point, String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected 'x,y', got '{}'", s))?;
    let x: f64 = x
        .trim()
        .parse()
        .map_err(|e| format!("invalid x coordinate '{}': {}", x.trim(), e))?;
    let y: f64 = y
        .trim()
        .parse()
        .map_err(|e| format!("invalid y coordinate '{}': {}", y.trim(), e))?;
    Ok(Point::new(x, y))
}

/// What a recorded click became
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointRole {
    Source,
    Target,
}

/// Ordered source and target sequences built up one click at a time
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointStore {
    source: Vec<Point>,
    target: Vec<Point>,
}

impl PointStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs(pairs: &[ControlPair]) -> Self {
        Self {
            source: pairs.iter().map(|p| p.source).collect(),
            target: pairs.iter().map(|p| p.target).collect(),
        }
    }

    /// Record a click. Odd clicks start a pair, even clicks complete it.
    pub fn record(&mut self, point: Point) -> PointRole {
        if self.source.len() == self.target.len() {
            self.source.push(point);
            PointRole::Source
        } else {
            self.target.push(point);
            PointRole::Target
        }
    }

    /// Append a complete pair, dropping any dangling source click first
    pub fn push_pair(&mut self, pair: ControlPair) {
        if let Some(p) = self.pending_source() {
            warn!("Dropping source point ({}, {}) that has no target", p.x, p.y);
        }
        self.source.truncate(self.target.len());
        self.source.push(pair.source);
        self.target.push(pair.target);
    }

    pub fn clear(&mut self) {
        self.source.clear();
        self.target.clear();
    }

    pub fn source(&self) -> &[Point] {
        &self.source
    }

    pub fn target(&self) -> &[Point] {
        &self.target
    }

    /// Source click still waiting for its target
    pub fn pending_source(&self) -> Option<Point> {
        if self.source.len() > self.target.len() {
            self.source.last().copied()
        } else {
            None
        }
    }

    pub fn is_complete(&self) -> bool {
        self.source.len() == self.target.len()
    }

    /// Number of complete pairs
    pub fn len(&self) -> usize {
        self.target.len()
    }

    pub fn is_empty(&self) -> bool {
        self.source.is_empty() && self.target.is_empty()
    }

    /// Complete pairs in recording order
    pub fn pairs(&self) -> Vec<ControlPair> {
        self.source
            .iter()
            .zip(&self.target)
            .map(|(s, t)| ControlPair::new(*s, *t))
            .collect()
    }

    /// Owned copies of both sequences, as recorded
    pub fn snapshot(&self) -> (Vec<Point>, Vec<Point>) {
        (self.source.clone(), self.target.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_click_pairing() {
        let mut store = PointStore::new();
        assert_eq!(store.record(Point::new(1.0, 2.0)), PointRole::Source);
        assert!(!store.is_complete());
        assert_eq!(store.pending_source(), Some(Point::new(1.0, 2.0)));
        assert_eq!(store.len(), 0);

        assert_eq!(store.record(Point::new(3.0, 4.0)), PointRole::Target);
        assert!(store.is_complete());
        assert_eq!(store.pending_source(), None);
        assert_eq!(store.len(), 1);

        assert_eq!(store.record(Point::new(5.0, 6.0)), PointRole::Source);
        let pairs = store.pairs();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].source, Point::new(1.0, 2.0));
        assert_eq!(pairs[0].target, Point::new(3.0, 4.0));
    }

    #[test]
    fn test_snapshot_keeps_dangling_source() {
        let mut store = PointStore::new();
        store.record(Point::new(0.0, 0.0));
        store.record(Point::new(1.0, 1.0));
        store.record(Point::new(2.0, 2.0));

        let (source, target) = store.snapshot();
        assert_eq!(source.len(), 2);
        assert_eq!(target.len(), 1);

        // Snapshot is independent of later edits
        store.clear();
        assert!(store.is_empty());
        assert_eq!(source[1], Point::new(2.0, 2.0));
    }

    #[test]
    fn test_push_pair_drops_pending() {
        let mut store = PointStore::new();
        store.record(Point::new(9.0, 9.0));
        store.push_pair(ControlPair::new(Point::new(1.0, 1.0), Point::new(2.0, 2.0)));
        assert!(store.is_complete());
        assert_eq!(store.source(), &[Point::new(1.0, 1.0)]);
        assert_eq!(store.target(), &[Point::new(2.0, 2.0)]);
    }

    #[test]
    fn test_from_pairs() {
        let pairs = [
            ControlPair::new(Point::new(0.0, 1.0), Point::new(2.0, 3.0)),
            ControlPair::new(Point::new(4.0, 5.0), Point::new(6.0, 7.0)),
        ];
        let store = PointStore::from_pairs(&pairs);
        assert_eq!(store.pairs(), pairs.to_vec());
    }

    #[test]
    fn test_parse_control_pair() {
        let pair: ControlPair = "2,2:0, 0".parse().unwrap();
        assert_eq!(pair.source, Point::new(2.0, 2.0));
        assert_eq!(pair.target, Point::new(0.0, 0.0));

        let pair: ControlPair = "10.5,-3:7,8.25".parse().unwrap();
        assert_eq!(pair.source, Point::new(10.5, -3.0));
        assert_eq!(pair.target, Point::new(7.0, 8.25));
        assert_eq!(pair.to_string(), "10.5,-3:7,8.25");

        assert!("1,2".parse::<ControlPair>().is_err());
        assert!("1,2:3".parse::<ControlPair>().is_err());
        assert!("a,2:3,4".parse::<ControlPair>().is_err());
    }

    #[test]
    fn test_point_bounds() {
        assert!(Point::new(0.0, 0.0).is_inside(4, 4));
        assert!(Point::new(3.9, 3.0).is_inside(4, 4));
        assert!(!Point::new(4.0, 0.0).is_inside(4, 4));
        assert!(!Point::new(-0.5, 1.0).is_inside(4, 4));
        assert!(!Point::new(f64::NAN, 1.0).is_finite());
        assert_eq!(Point::new(0.0, 0.0).distance_squared(&Point::new(3.0, 4.0)), 25.0);
    }
}
