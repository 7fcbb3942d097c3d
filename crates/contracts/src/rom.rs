//! ROM payloads - results/status responses

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::TimePoint;

/// Statistics of one angle column over a session.
///
/// All statistics are `None` when the column has no defined value; `std`
/// additionally needs two samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AngleRom {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub rom: Option<f64>,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    /// Defined samples used for the statistics
    pub count: usize,
    pub time_series: Vec<TimePoint>,
}

/// Session-level summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub total_frames: usize,
    /// Largest time value in seconds
    pub duration: f64,
    pub angles_measured: Vec<String>,
}

/// Result of `summarize`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RomAnalysis {
    pub rom_analysis: BTreeMap<String, AngleRom>,
    pub summary: SessionSummary,
}

/// One row of the running ROM curve of the reference angle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunningRomPoint {
    pub time: f64,
    /// Smoothed, convention-aligned reference angle
    pub smoothed: Option<f64>,
    pub min: f64,
    pub max: f64,
    pub rom: f64,
}

/// Per-frame ROM report entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RomReportEntry {
    /// Seconds, rounded to 3 decimals
    pub time: f64,
    pub test: String,
    pub is_ready: bool,
    /// Angles rounded to 1 decimal, `null` when undefined
    pub angles: BTreeMap<String, Option<f64>>,
    /// Running [min, max] of the reference angle
    pub rom: [f64; 2],
    pub rom_range: f64,
    pub status: String,
}
