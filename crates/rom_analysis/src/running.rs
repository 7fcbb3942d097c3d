//! Running ROM of a reference angle.
//!
//! The reference angle is mapped to `180 - angle`, smoothed with a trailing
//! moving average, then tracked with a cumulative min/max: the curve is the
//! best range reached so far in the session, never a local range.

use contracts::{RunningRomPoint, TimeSeries};
use ringbuf::{traits::*, HeapRb};
use tracing::debug;

/// Moving-average width in samples: `round(window / interval)`, at least 1
pub fn window_samples(window_seconds: f64, mean_interval: Option<f64>) -> usize {
    match mean_interval {
        Some(dt) if dt > 0.0 && window_seconds.is_finite() => {
            ((window_seconds / dt).round().max(1.0)) as usize
        }
        _ => 1,
    }
}

/// One point per row of `series`.
///
/// Rows before the first defined smoothed value, and every row when the
/// reference column is absent, report zero range.
pub fn running_rom(
    series: &TimeSeries,
    window_seconds: f64,
    reference: &str,
) -> Vec<RunningRomPoint> {
    let Some(column) = series.column_index(reference) else {
        debug!(reference, "reference angle absent, running ROM is zero");
        return series
            .times()
            .map(|time| RunningRomPoint {
                time,
                smoothed: None,
                min: 0.0,
                max: 0.0,
                rom: 0.0,
            })
            .collect();
    };

    // a window longer than the session averages everything seen so far
    let width = window_samples(window_seconds, series.mean_interval())
        .min(series.len().max(1));
    let mut window: HeapRb<Option<f64>> = HeapRb::new(width);
    let mut range: Option<(f64, f64)> = None;

    series
        .rows()
        .iter()
        .map(|row| {
            window.push_overwrite(row.values[column].map(|angle| 180.0 - angle));

            let (sum, count) = window
                .iter()
                .flatten()
                .copied()
                .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
            let smoothed = (count > 0).then(|| sum / count as f64);

            if let Some(value) = smoothed {
                range = Some(match range {
                    Some((min, max)) => (min.min(value), max.max(value)),
                    None => (value, value),
                });
            }
            let (min, max) = range.unwrap_or((0.0, 0.0));

            RunningRomPoint {
                time: row.time,
                smoothed,
                min,
                max,
                rom: max - min,
            }
        })
        .collect()
}
