//! pointwarp - point-guided image deformation
//!
//! Drags a set of source points in an image onto a set of target points and
//! moves every other pixel smoothly along with them, using a radial basis
//! function interpolant of the point displacements.

pub mod annotate;
pub mod config;
pub mod error;
pub mod points;
pub mod session;
pub mod transform;

pub use error::WarpError;
pub use points::{ControlPair, Point, PointRole, PointStore};
pub use session::WarpSession;
pub use transform::{warp, RbfDeformation, WarpParams};
