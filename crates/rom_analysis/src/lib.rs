//! # ROM Analysis
//!
//! Offline aggregation of angle time series.
//!
//! - `mot`: tab-separated angle file writer/reader
//! - `summary`: per-angle min/max/ROM/mean/std
//! - `running`: smoothed, cumulative ROM curve of a reference angle
//! - `report`: per-row ROM report entries

pub mod mot;
mod report;
mod running;
mod summary;

pub use mot::{read_mot, read_mot_file, write_mot, write_mot_file};
pub use report::{rom_report, REPORT_STATUS};
pub use running::{running_rom, window_samples};
pub use summary::summarize;
