//! # Ingestion Pipeline
//!
//! Detection frame ingestion module.
//!
//! Responsibilities:
//! - Register detection sources (replayed recordings, mock subjects, live detectors)
//! - Turn images into `DetectionFrame`s through a `PoseDetector`
//! - Backpressure management (`block` / `drop_newest`)
//! - Send to downstream via async-channel
//!
//! ## Usage Example
//!
//! ```ignore
//! use ingestion::{IngestionPipeline, ReplaySource};
//!
//! let mut pipeline = IngestionPipeline::new(256);
//! pipeline.register_source(Box::new(ReplaySource::from_path("session.jsonl")), None)?;
//!
//! let rx = pipeline.take_receiver().unwrap();
//! pipeline.start_all();
//! while let Ok(frame) = rx.recv().await {
//!     engine.push(frame)?;
//! }
//! ```

mod adapter;
mod config;
mod detector;
mod error;
mod generic_adapter;
mod mock;
mod pipeline;
mod replay;
mod send;

// Re-exports
pub use adapter::SourceAdapter;
pub use config::{BackpressureConfig, BackpressurePolicy, IngestionMetrics, MetricsSnapshot, SourceCounts};
pub use contracts::DetectionFrame;
pub use detector::DetectorAdapter;
pub use error::{IngestionError, Result};
pub use generic_adapter::GenericSourceAdapter;
pub use mock::{MockSubjectConfig, MockSubjectSource};
pub use pipeline::IngestionPipeline;
pub use replay::{load_recording, write_recording, ReplaySource};
