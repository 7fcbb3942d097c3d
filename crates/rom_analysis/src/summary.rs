//! Per-angle ROM statistics.

use std::collections::BTreeMap;

use contracts::{AngleRom, RomAnalysis, SessionSummary, TimeSeries};
use observability::RunningStats;

/// min/max/ROM/mean/std of every column, undefined values excluded.
///
/// `std` is the sample standard deviation (n-1), `None` below two samples.
pub fn summarize(series: &TimeSeries) -> RomAnalysis {
    let rom_analysis: BTreeMap<String, AngleRom> = series
        .angle_names()
        .iter()
        .enumerate()
        .map(|(idx, name)| (name.clone(), column_rom(series, idx)))
        .collect();

    RomAnalysis {
        rom_analysis,
        summary: SessionSummary {
            total_frames: series.len(),
            duration: series.duration(),
            angles_measured: series.angle_names().to_vec(),
        },
    }
}

fn column_rom(series: &TimeSeries, idx: usize) -> AngleRom {
    let stats: RunningStats = series
        .rows()
        .iter()
        .filter_map(|row| row.values[idx])
        .collect();

    let time_series = series
        .rows()
        .iter()
        .map(|row| contracts::TimePoint {
            time: row.time,
            value: row.values[idx],
        })
        .collect();

    let count = stats.count() as usize;
    let defined = |v: f64| (count > 0).then_some(v);

    AngleRom {
        min: defined(stats.min()),
        max: defined(stats.max()),
        rom: defined(stats.max() - stats.min()),
        mean: defined(stats.mean()),
        std: (count >= 2).then(|| stats.std_dev()),
        count,
        time_series,
    }
}
