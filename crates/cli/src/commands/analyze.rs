//! `analyze` command implementation.

use anyhow::{Context, Result};
use contracts::{RomAnalysis, RomOptions, RomReportEntry, RunningRomPoint};
use serde::Serialize;
use tracing::info;

use crate::cli::AnalyzeArgs;
use crate::error::CliError;

/// Analysis output for JSON
#[derive(Debug, Serialize)]
struct AnalysisOutput {
    input: String,
    test: String,
    reference_angle: String,
    #[serde(flatten)]
    analysis: RomAnalysis,
    /// Final running ROM of the reference angle
    reference_rom: Option<RunningRomPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    report: Option<Vec<RomReportEntry>>,
}

/// Execute the `analyze` command
pub fn run_analyze(args: &AnalyzeArgs) -> Result<()> {
    info!(input = %args.input.display(), "Analyzing angle file");

    let output = analyze(args)?;

    if args.json {
        let json =
            serde_json::to_string_pretty(&output).context("Failed to serialize analysis")?;
        println!("{json}");
    } else {
        print_analysis(&output);
    }

    Ok(())
}

fn analyze(args: &AnalyzeArgs) -> Result<AnalysisOutput> {
    if !args.input.exists() {
        return Err(CliError::input_not_found(args.input.display().to_string()).into());
    }
    if !(args.window > 0.0 && args.window.is_finite()) {
        return Err(CliError::invalid_argument("--window", "must be a positive number of seconds").into());
    }

    let series = rom_analysis::read_mot_file(&args.input)
        .with_context(|| format!("Failed to read angle file {}", args.input.display()))?;

    let options = RomOptions {
        test_name: args.test_name.clone(),
        time_window: args.window,
        reference_angle: args.reference.clone(),
    };

    let analysis = rom_analysis::summarize(&series);
    let reference_rom =
        rom_analysis::running_rom(&series, options.time_window, &options.reference_angle)
            .last()
            .copied();
    let report = args
        .report
        .then(|| rom_analysis::rom_report(&series, &options));

    info!(
        rows = series.len(),
        angles = series.angle_names().len(),
        duration = analysis.summary.duration,
        "Analysis complete"
    );

    Ok(AnalysisOutput {
        input: args.input.display().to_string(),
        test: options.test_name,
        reference_angle: options.reference_angle,
        analysis,
        reference_rom,
        report,
    })
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.1}"))
}

fn print_analysis(output: &AnalysisOutput) {
    let summary = &output.analysis.summary;
    println!("\n=== ROM Analysis: {} ===\n", output.input);
    println!("  Test: {}", output.test);
    println!("  Frames: {}", summary.total_frames);
    println!("  Duration: {:.3}s", summary.duration);

    println!(
        "\n  {:<18} {:>8} {:>8} {:>8} {:>8} {:>8} {:>6}",
        "angle", "min", "max", "rom", "mean", "std", "n"
    );
    for (name, rom) in &output.analysis.rom_analysis {
        println!(
            "  {:<18} {:>8} {:>8} {:>8} {:>8} {:>8} {:>6}",
            name,
            fmt_opt(rom.min),
            fmt_opt(rom.max),
            fmt_opt(rom.rom),
            fmt_opt(rom.mean),
            fmt_opt(rom.std),
            rom.count
        );
    }

    if let Some(point) = output.reference_rom {
        println!(
            "\n  Running ROM of '{}': [{:.1}, {:.1}] range {:.1}",
            output.reference_angle, point.min, point.max, point.rom
        );
    }

    if let Some(ref report) = output.report {
        println!("\n  Report ({} rows):", report.len());
        for entry in report {
            println!(
                "    t={:>8.3}  rom=[{:.1}, {:.1}]  range={:.1}",
                entry.time, entry.rom[0], entry.rom[1], entry.rom_range
            );
        }
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::TimeSeries;
    use std::path::{Path, PathBuf};

    fn args(input: PathBuf) -> AnalyzeArgs {
        AnalyzeArgs {
            input,
            window: 0.4,
            reference: "trunk".into(),
            test_name: "flexion".into(),
            report: true,
            json: true,
        }
    }

    fn write_series(dir: &Path) -> PathBuf {
        let mut series = TimeSeries::new(vec!["trunk".into(), "right knee".into()]);
        for (i, trunk) in [100.0, 110.0, 90.0, 120.0].into_iter().enumerate() {
            series
                .push_row(i as f64 * 0.1, vec![Some(trunk), None])
                .unwrap();
        }
        let path = dir.join("session_angles_person00.mot");
        rom_analysis::write_mot_file(&series, &path).unwrap();
        path
    }

    #[test]
    fn test_analyze_saved_file() {
        let dir = tempfile::tempdir().unwrap();
        let output = analyze(&args(write_series(dir.path()))).unwrap();

        let trunk = &output.analysis.rom_analysis["trunk"];
        assert_eq!(trunk.rom, Some(30.0));
        assert_eq!(output.analysis.rom_analysis["right knee"].count, 0);
        assert_eq!(output.report.as_ref().unwrap().len(), 4);
        assert_eq!(output.test, "flexion");
        assert!(output.reference_rom.is_some());
        assert!(serde_json::to_value(&output).unwrap()["rom_analysis"].is_object());
    }

    #[test]
    fn test_malformed_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.mot");
        std::fs::write(&path, "Coordinates\nno header here\n").unwrap();

        let err = analyze(&args(path)).unwrap_err();
        let chain = format!("{err:#}");
        assert!(chain.contains("malformed time series file"), "got: {chain}");
    }

    #[test]
    fn test_missing_input() {
        let err = analyze(&args(PathBuf::from("/nonexistent/a.mot"))).unwrap_err();
        assert!(err.to_string().contains("Input file not found"));
    }
}
