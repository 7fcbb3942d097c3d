//! # Contracts
//!
//! Frozen interface contracts, defining inter-module data structures and traits.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Time Model
//! - Frame time is seconds since session start (f64)
//! - `frame_id` is the source's sequence number, used for ordering/diagnostics
//!
//! ## Coordinate Model
//! - Image coordinates, x to the right, y downward
//! - Undefined landmarks are `None`, never NaN

mod angle;
mod app_config;
mod body_model;
mod detection;
mod detection_source;
mod error;
mod keypoint;
mod record;
mod rom;
mod sink;
mod time_series;

pub use angle::*;
pub use app_config::*;
pub use body_model::BodyModel;
pub use detection::*;
pub use detection_source::{DetectionCallback, DetectionSource};
pub use error::*;
pub use keypoint::*;
pub use record::*;
pub use rom::*;
pub use sink::*;
pub use time_series::*;
