//! Per-row ROM report.

use contracts::{RomOptions, RomReportEntry, TimeSeries};

use crate::running::running_rom;

/// Status reported for every computed row
pub const REPORT_STATUS: &str = "success";

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// One entry per row: rounded angles plus the running ROM of the reference
/// angle at that row.
pub fn rom_report(series: &TimeSeries, options: &RomOptions) -> Vec<RomReportEntry> {
    let running = running_rom(series, options.time_window, &options.reference_angle);

    series
        .rows()
        .iter()
        .zip(running)
        .map(|(row, point)| RomReportEntry {
            time: round_to(row.time, 3),
            test: options.test_name.clone(),
            is_ready: true,
            angles: series
                .angle_names()
                .iter()
                .zip(&row.values)
                .map(|(name, value)| (name.clone(), value.map(|v| round_to(v, 1))))
                .collect(),
            rom: [point.min, point.max],
            rom_range: point.rom,
            status: REPORT_STATUS.to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> RomOptions {
        RomOptions {
            test_name: "trunk flexion".into(),
            time_window: 0.4,
            reference_angle: "trunk".into(),
        }
    }

    #[test]
    fn entries_are_rounded_and_carry_running_rom() {
        let mut series = TimeSeries::new(vec!["left knee".into(), "trunk".into()]);
        series.push_row(0.0, vec![Some(12.345), Some(100.0)]).unwrap();
        series.push_row(1.00049, vec![None, Some(110.0)]).unwrap();

        let report = rom_report(&series, &options());
        assert_eq!(report.len(), 2);

        let first = &report[0];
        assert_eq!(first.test, "trunk flexion");
        assert!(first.is_ready);
        assert_eq!(first.status, "success");
        assert_eq!(first.angles["left knee"], Some(12.3));
        assert_eq!(first.rom, [80.0, 80.0]);

        let second = &report[1];
        assert_eq!(second.time, 1.0);
        assert_eq!(second.angles["left knee"], None);
        assert_eq!(second.rom, [70.0, 80.0]);
        assert_eq!(second.rom_range, 10.0);
    }

    #[test]
    fn missing_reference_reports_zero_rom() {
        let mut series = TimeSeries::new(vec!["left knee".into()]);
        series.push_row(0.0, vec![Some(5.0)]).unwrap();
        let report = rom_report(&series, &options());
        assert_eq!(report[0].rom, [0.0, 0.0]);
        assert_eq!(report[0].rom_range, 0.0);
    }

    #[test]
    fn serializes_with_null_angles() {
        let mut series = TimeSeries::new(vec!["trunk".into()]);
        series.push_row(0.0, vec![None]).unwrap();
        let json = serde_json::to_value(rom_report(&series, &options())).unwrap();
        assert!(json[0]["angles"]["trunk"].is_null());
        assert_eq!(json[0]["rom"], serde_json::json!([0.0, 0.0]));
    }
}
