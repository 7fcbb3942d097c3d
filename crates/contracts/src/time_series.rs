//! TimeSeries - per-session angle table
//!
//! Invariants enforced on every insertion:
//! - every row carries exactly one value slot per column
//! - `time` is strictly increasing

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::{AngleResult, ContractError};

/// One frame of the angle table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesRow {
    /// Seconds since session start
    pub time: f64,
    /// One slot per column, `None` when undefined in this frame
    pub values: Vec<Option<f64>>,
}

/// (time, value) sample of a single column
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimePoint {
    pub time: f64,
    pub value: Option<f64>,
}

/// Angle time series of one person over one session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawTimeSeries")]
pub struct TimeSeries {
    angle_names: Vec<String>,
    rows: Vec<TimeSeriesRow>,
}

#[derive(Deserialize)]
struct RawTimeSeries {
    angle_names: Vec<String>,
    rows: Vec<TimeSeriesRow>,
}

impl TryFrom<RawTimeSeries> for TimeSeries {
    type Error = ContractError;

    fn try_from(raw: RawTimeSeries) -> Result<Self, Self::Error> {
        let mut series = TimeSeries::new(raw.angle_names);
        for row in raw.rows {
            series.push_row(row.time, row.values)?;
        }
        Ok(series)
    }
}

impl TimeSeries {
    /// Empty series with a fixed column set
    pub fn new(angle_names: Vec<String>) -> Self {
        Self {
            angle_names,
            rows: Vec::new(),
        }
    }

    /// Build from per-frame angle results.
    ///
    /// Columns are the sorted union of every angle name seen; frames missing
    /// an angle get an undefined slot.
    ///
    /// # Errors
    /// `InvalidTimeSeries` when times are not strictly increasing
    pub fn from_results<'a, I>(frames: I) -> Result<Self, ContractError>
    where
        I: IntoIterator<Item = (f64, &'a AngleResult)>,
        I::IntoIter: Clone,
    {
        let frames = frames.into_iter();
        let names: BTreeSet<&str> = frames.clone().flat_map(|(_, r)| r.names()).collect();
        let mut series = TimeSeries::new(names.into_iter().map(str::to_string).collect());
        for (time, result) in frames {
            series.push_result(time, result)?;
        }
        Ok(series)
    }

    /// Append a row
    ///
    /// # Errors
    /// `InvalidTimeSeries` on a width mismatch or non-increasing time
    pub fn push_row(&mut self, time: f64, values: Vec<Option<f64>>) -> Result<(), ContractError> {
        if values.len() != self.angle_names.len() {
            return Err(ContractError::invalid_time_series(format!(
                "row at t={time} has {} values, expected {}",
                values.len(),
                self.angle_names.len()
            )));
        }
        if !time.is_finite() {
            return Err(ContractError::invalid_time_series(format!(
                "non-finite time {time}"
            )));
        }
        if let Some(last) = self.rows.last() {
            if time <= last.time {
                return Err(ContractError::invalid_time_series(format!(
                    "time {time} does not follow {}",
                    last.time
                )));
            }
        }
        self.rows.push(TimeSeriesRow { time, values });
        Ok(())
    }

    /// Append a row from an angle result, ignoring angles outside the columns
    pub fn push_result(&mut self, time: f64, result: &AngleResult) -> Result<(), ContractError> {
        let values = self.angle_names.iter().map(|n| result.get(n)).collect();
        self.push_row(time, values)
    }

    pub fn angle_names(&self) -> &[String] {
        &self.angle_names
    }

    pub fn rows(&self) -> &[TimeSeriesRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.angle_names.iter().position(|n| n == name)
    }

    /// Samples of one column in time order
    pub fn column(&self, name: &str) -> Option<Vec<TimePoint>> {
        let idx = self.column_index(name)?;
        Some(
            self.rows
                .iter()
                .map(|row| TimePoint {
                    time: row.time,
                    value: row.values[idx],
                })
                .collect(),
        )
    }

    pub fn times(&self) -> impl Iterator<Item = f64> + '_ {
        self.rows.iter().map(|r| r.time)
    }

    /// Largest time value (0 when empty)
    pub fn duration(&self) -> f64 {
        self.rows.last().map(|r| r.time).unwrap_or(0.0)
    }

    /// Mean spacing between consecutive rows
    pub fn mean_interval(&self) -> Option<f64> {
        if self.rows.len() < 2 {
            return None;
        }
        let first = self.rows[0].time;
        let last = self.rows[self.rows.len() - 1].time;
        Some((last - first) / (self.rows.len() - 1) as f64)
    }
}
