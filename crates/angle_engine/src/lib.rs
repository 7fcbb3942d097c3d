//! # Angle Engine
//!
//! Joint and segment angles from 2-D keypoints.
//!
//! Responsibilities:
//! - Static angle definition table (case-insensitive lookup)
//! - Geometric evaluation with offset, sign and wrap-around calibration
//! - `Neck` / `Hip` synthesis for models that lack them
//! - Per-frame calculation with local, per-angle failure recovery
//!
//! ## Example
//!
//! ```ignore
//! use angle_engine::AngleCalculator;
//!
//! let calculator = AngleCalculator::new(&["left knee", "trunk"], 0.3);
//! let out = calculator.calculate(&keypoint_set);
//! println!("{:?}", out.angles.get("trunk"));
//! ```

mod calculator;
pub mod definitions;
pub mod geometry;
pub mod landmarks;

pub use calculator::{calculate, AngleCalculation, AngleCalculator, SkippedAngle};
pub use definitions::{AngleDefinition, AngleFamily, WrapRange};
