//! `run` command implementation.

use anyhow::{Context, Result};
use contracts::{AppConfig, SinkConfig, SinkType};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

use crate::cli::RunArgs;
use crate::error::CliError;
use crate::pipeline::{Pipeline, PipelineConfig};

/// Execute the `run` command
pub async fn run_pipeline(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    // Validate config path
    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.display().to_string()).into());
    }

    // Load and parse configuration
    let mut app = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    // Apply CLI overrides
    if let Some(ref output) = args.output {
        info!(output = %output.display(), "Overriding angle file output from CLI");
        apply_output_override(&mut app, output);
    }
    check_run_args(args)?;

    info!(
        model = %app.session.model_type,
        angles = app.session.angle_names().len(),
        person_selection = ?app.session.person_selection,
        sinks = app.sinks.len(),
        "Configuration loaded"
    );

    // Dry run - just validate and exit
    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&app);
        return Ok(());
    }

    // Build pipeline configuration
    let pipeline_config = PipelineConfig {
        app,
        replay: args.replay.clone(),
        replay_speed: (args.replay_speed > 0.0).then_some(args.replay_speed),
        mock_sessions: args.mock,
        mock_fps: args.mock_fps,
        mock_duration: args.mock_duration,
        mock_people: args.mock_people,
        realtime: args.realtime,
        max_frames: (args.max_frames != 0).then_some(args.max_frames),
        timeout: (args.timeout != 0).then(|| Duration::from_secs(args.timeout)),
        buffer_size: args.buffer_size,
    };

    info!("Starting pipeline...");

    let stats = Pipeline::new(pipeline_config)
        .run(shutdown_signal())
        .await
        .context("Pipeline execution failed")?;

    info!(
        frames = stats.frames_received,
        records = stats.records_produced,
        rejected = stats.frames_rejected,
        duration_secs = stats.duration.as_secs_f64(),
        fps = format!("{:.2}", stats.fps()),
        "Pipeline completed"
    );
    stats.print_summary();

    info!("ROM Tracker finished");
    Ok(())
}

/// Reject values clap cannot check on its own
fn check_run_args(args: &RunArgs) -> Result<(), CliError> {
    if args.mock > 0 {
        if !(args.mock_fps > 0.0 && args.mock_fps.is_finite()) {
            return Err(CliError::invalid_argument("--mock-fps", "must be a positive number"));
        }
        if !(args.mock_duration > 0.0 && args.mock_duration.is_finite()) {
            return Err(CliError::invalid_argument(
                "--mock-duration",
                "must be a positive number of seconds",
            ));
        }
    }
    if args.replay_speed < 0.0 || !args.replay_speed.is_finite() {
        return Err(CliError::invalid_argument("--replay-speed", "must be >= 0"));
    }
    Ok(())
}

/// Point every file sink at `output`, adding one when none is configured
fn apply_output_override(app: &mut AppConfig, output: &Path) {
    let base_path = output.display().to_string();
    let mut found = false;
    for sink in app.sinks.iter_mut().filter(|s| s.sink_type == SinkType::File) {
        sink.params.insert("base_path".to_string(), base_path.clone());
        found = true;
    }
    if !found {
        app.sinks.push(SinkConfig {
            name: "angles".to_string(),
            sink_type: SinkType::File,
            queue_capacity: 1024,
            params: HashMap::from([("base_path".to_string(), base_path)]),
        });
    }
}

/// Resolve on Ctrl+C or SIGTERM
///
/// A handler that cannot be installed never resolves, so the pipeline
/// still ends through exhaustion or its limits.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(app: &AppConfig) {
    println!("\n=== Configuration Summary ===\n");
    println!("Session:");
    println!("  Model: {}", app.session.model_type);
    println!("  Confidence threshold: {}", app.session.confidence_threshold);
    println!("  Person selection: {:?}", app.session.person_selection);
    println!("  Subject height: {} m", app.session.subject_height);
    println!("  Angles: {}", app.session.angle_names().join(", "));

    println!("\nROM:");
    println!("  Test: {}", app.rom.test_name);
    println!("  Window: {} s", app.rom.time_window);
    println!("  Reference angle: {}", app.rom.reference_angle);

    println!(
        "\nIngestion: capacity {} ({:?})",
        app.ingestion.channel_capacity, app.ingestion.backpressure
    );

    if !app.sinks.is_empty() {
        println!("\nSinks ({}):", app.sinks.len());
        for sink in &app.sinks {
            println!("  - {} ({:?})", sink.name, sink.sink_type);
        }
    }

    println!();
}
