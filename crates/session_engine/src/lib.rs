//! # Session Engine
//!
//! Per-session frame pipeline: detections in, per-person angle records out.
//!
//! Responsibilities:
//! - Enforce strictly increasing frame timestamps
//! - Keep person identities stable across frames (greedy association)
//! - Drive the angle calculator for the selected people
//! - Accumulate per-slot time series and live ROM
//!
//! ## Example
//!
//! ```ignore
//! use session_engine::SessionEngine;
//!
//! let mut engine = SessionEngine::new("cam0", &config.session)?;
//! while let Some(frame) = frames.next() {
//!     let record = engine.push(frame)?;
//!     sinks.dispatch(record).await;
//! }
//! let series = engine.time_series(0)?;
//! ```

mod associator;
mod context;
mod engine;

pub use associator::{associate, person_distance, Association};
pub use context::{
    AssociationStats, FrameContext, FrameProcessor, PersonTrack, TrackedFrame, Transition,
};
pub use engine::SessionEngine;
