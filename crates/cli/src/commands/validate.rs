//! `validate` command: load a config and report what a run would do with it.

use anyhow::{Context, Result};
use angle_engine::definitions::{self, AngleDefinition};
use angle_engine::landmarks::COMPOSITE_LANDMARKS;
use contracts::{AppConfig, BodyModel, SinkType};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

#[derive(Debug, Serialize)]
struct ValidationReport {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

impl ValidationReport {
    fn invalid(config_path: String, error: String) -> Self {
        Self {
            valid: false,
            config_path,
            error: Some(error),
            warnings: Vec::new(),
            summary: None,
        }
    }
}

#[derive(Debug, Serialize)]
struct ConfigSummary {
    version: String,
    /// Canonical body model name
    model: String,
    /// Angles a session will compute, after defaults are applied
    angles: Vec<String>,
    person_selection: String,
    reference_angle: String,
    time_window: f64,
    sinks: Vec<String>,
}

pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let report = validate_config(args);
    if args.json {
        let json = serde_json::to_string_pretty(&report)
            .context("Failed to serialize validation report")?;
        println!("{json}");
    } else {
        print_report(&report);
    }

    anyhow::ensure!(report.valid, "Configuration validation failed");
    Ok(())
}

fn validate_config(args: &ValidateArgs) -> ValidationReport {
    let config_path = args.config.display().to_string();
    if !args.config.is_file() {
        return ValidationReport::invalid(config_path.clone(), format!("File not found: {config_path}"));
    }

    let app = match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(app) => app,
        Err(e) => return ValidationReport::invalid(config_path, e.to_string()),
    };
    // the loader already rejected unknown models
    let model = BodyModel::from_name(&app.session.model_type).ok();

    ValidationReport {
        valid: true,
        config_path,
        error: None,
        warnings: collect_warnings(&app, model),
        summary: Some(summarize(&app, model)),
    }
}

fn summarize(app: &AppConfig, model: Option<&BodyModel>) -> ConfigSummary {
    let sinks = app
        .sinks
        .iter()
        .map(|sink| match sink.sink_type {
            SinkType::Log => format!("{} (log)", sink.name),
            SinkType::File => format!(
                "{} (file -> {})",
                sink.name,
                sink.params.get("base_path").map_or("./output", String::as_str)
            ),
        })
        .collect();

    ConfigSummary {
        version: format!("{:?}", app.version),
        model: model.map_or_else(|| app.session.model_type.clone(), |m| m.name.to_string()),
        angles: app.session.angle_names(),
        person_selection: format!("{:?}", app.session.person_selection).to_lowercase(),
        reference_angle: app.rom.reference_angle.clone(),
        time_window: app.rom.time_window,
        sinks,
    }
}

/// Landmarks of `definition` the model can neither detect nor synthesize
fn unavailable_landmarks(model: &BodyModel, definition: &AngleDefinition) -> Vec<&'static str> {
    let available = |name: &str| model.index_of(name).is_some();
    definition
        .landmarks
        .iter()
        .copied()
        .filter(|&landmark| {
            if available(landmark) {
                return false;
            }
            match COMPOSITE_LANDMARKS.iter().find(|c| c.name == landmark) {
                Some(composite) => !(available(composite.left) && available(composite.right)),
                None => true,
            }
        })
        .collect()
}

/// Problems that do not stop a run but leave columns empty or output missing
fn collect_warnings(app: &AppConfig, model: Option<&BodyModel>) -> Vec<String> {
    let mut warnings = Vec::new();
    let requested = app.session.angle_names();

    for name in &requested {
        match definitions::lookup(name) {
            Err(_) => warnings.push(format!("Unknown angle '{name}' will never be computed")),
            Ok(definition) => {
                let Some(model) = model else { continue };
                let missing = unavailable_landmarks(model, definition);
                if !missing.is_empty() {
                    warnings.push(format!(
                        "Angle '{name}' needs {} which {} does not provide",
                        missing.join(", "),
                        model.name
                    ));
                }
            }
        }
    }

    if app.sinks.is_empty() {
        warnings.push("No sinks configured - records will be discarded".to_string());
    }

    let reference = &app.rom.reference_angle;
    if !requested.iter().any(|n| n.eq_ignore_ascii_case(reference)) {
        warnings.push(format!(
            "rom.reference_angle '{reference}' is not among the requested angles; running ROM stays at zero"
        ));
    }

    warnings
}

fn print_report(report: &ValidationReport) {
    if !report.valid {
        println!("✗ Configuration is invalid: {}", report.config_path);
        if let Some(error) = &report.error {
            println!("\n  Error: {error}");
        }
        return;
    }

    println!("✓ Configuration is valid: {}", report.config_path);
    if let Some(summary) = &report.summary {
        println!("\n  Version: {}", summary.version);
        println!("  Model: {}", summary.model);
        println!("  Angles ({}): {}", summary.angles.len(), summary.angles.join(", "));
        println!("  Person selection: {}", summary.person_selection);
        println!(
            "  Running ROM: {} over {:.2}s windows",
            summary.reference_angle, summary.time_window
        );
        if summary.sinks.is_empty() {
            println!("  Sinks: none");
        } else {
            println!("  Sinks: {}", summary.sinks.join(", "));
        }
    }

    if !report.warnings.is_empty() {
        println!("\n⚠ Warnings:");
        for warning in &report.warnings {
            println!("  - {warning}");
        }
    }
}
