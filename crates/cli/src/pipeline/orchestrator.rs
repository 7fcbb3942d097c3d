//! Pipeline orchestrator - coordinates all components.
//!
//! Detection sources feed one ingestion channel; every `source_id` gets its
//! own [`SessionEngine`], and the resulting records fan out to the sinks.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::future::Future;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use contracts::{AppConfig, DetectionSource, FrameRecord};
use ingestion::{
    BackpressureConfig, IngestionPipeline, MockSubjectConfig, MockSubjectSource, ReplaySource,
};
use session_engine::SessionEngine;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::{PipelineStats, SessionStats};
use crate::error::CliError;

/// How often exhaustion and the deadline are checked
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Time allowed for sinks to write their files after the last record
const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Validated application configuration
    pub app: AppConfig,

    /// Recordings to replay, one session each
    pub replay: Vec<PathBuf>,

    /// Replay speed multiplier (None = as fast as possible)
    pub replay_speed: Option<f64>,

    /// Number of synthetic subject sessions
    pub mock_sessions: usize,

    pub mock_fps: f64,

    pub mock_duration: f64,

    pub mock_people: usize,

    /// Pace synthetic frames at their frame rate
    pub realtime: bool,

    /// Maximum number of frames to process (None = unlimited)
    pub max_frames: Option<u64>,

    /// Pipeline timeout (None = no timeout)
    pub timeout: Option<Duration>,

    /// Channel buffer size between sessions and the dispatcher
    pub buffer_size: usize,
}

/// Main pipeline orchestrator
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Create a new pipeline with the given configuration
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run until every source is exhausted, a limit is hit or `shutdown` resolves
    ///
    /// Sinks are always drained before returning, so partial sessions still
    /// end up on disk.
    pub async fn run<F>(self, shutdown: F) -> Result<PipelineStats>
    where
        F: Future<Output = ()>,
    {
        let start_time = Instant::now();
        let app = &self.config.app;

        // Setup Ingestion Pipeline
        let mut ingestion =
            IngestionPipeline::with_config(BackpressureConfig::from(&app.ingestion));
        for source in self.build_sources()? {
            ingestion
                .register_source(source, None)
                .context("Failed to register detection source")?;
        }
        if ingestion.source_count() == 0 {
            return Err(CliError::NoSources.into());
        }
        info!(
            sources = ingestion.source_count(),
            ids = ?ingestion.source_ids().collect::<Vec<_>>(),
            "Ingestion pipeline configured"
        );

        // Setup Dispatcher
        let (record_tx, record_rx) = mpsc::channel::<FrameRecord>(self.config.buffer_size.max(1));
        if app.sinks.is_empty() {
            warn!("No sinks configured - records will be discarded");
        }
        let dispatcher = dispatcher::create_dispatcher(app.sinks.clone(), &app.rom, record_rx)
            .context("Failed to create dispatcher")?;
        let dispatcher_handle = dispatcher.spawn();
        info!(active_sinks = app.sinks.len(), "Dispatcher started");

        let frame_rx = ingestion
            .take_receiver()
            .context("Failed to get ingestion receiver")?;
        ingestion.start_all();

        let mut stats = PipelineStats {
            active_sinks: app.sinks.len(),
            ..Default::default()
        };
        let mut engines: BTreeMap<String, SessionEngine> = BTreeMap::new();
        let deadline = self
            .config
            .timeout
            .map(|t| tokio::time::Instant::now() + t);
        let mut poll = tokio::time::interval(POLL_INTERVAL);
        tokio::pin!(shutdown);

        info!(max_frames = ?self.config.max_frames, "Pipeline running");

        loop {
            tokio::select! {
                received = frame_rx.recv() => {
                    let Ok(frame) = received else {
                        debug!("Ingestion channel closed");
                        break;
                    };
                    stats.frames_received += 1;

                    let engine = match engines.entry(frame.source_id.clone()) {
                        Entry::Occupied(entry) => entry.into_mut(),
                        Entry::Vacant(entry) => {
                            let engine = SessionEngine::new(entry.key().clone(), &app.session)
                                .with_context(|| format!("Failed to start session '{}'", entry.key()))?;
                            info!(source_id = %entry.key(), "Session started");
                            entry.insert(engine)
                        }
                    };

                    match engine.push(frame) {
                        Ok(record) => {
                            stats.records_produced += 1;
                            stats.session_metrics.update(&record);
                            if record_tx.send(record).await.is_err() {
                                warn!("Dispatcher channel closed");
                                break;
                            }
                        }
                        Err(e) => {
                            stats.frames_rejected += 1;
                            warn!(error = %e, "Frame rejected");
                        }
                    }

                    if let Some(max) = self.config.max_frames {
                        if stats.frames_received >= max {
                            info!(frames = stats.frames_received, "Reached max frames limit");
                            break;
                        }
                    }
                }
                _ = poll.tick() => {
                    if ingestion.all_exhausted() && frame_rx.is_empty() {
                        info!("All detection sources exhausted");
                        break;
                    }
                    if deadline.is_some_and(|d| tokio::time::Instant::now() >= d) {
                        warn!(frames = stats.frames_received, "Pipeline timed out");
                        break;
                    }
                }
                _ = &mut shutdown => {
                    warn!("Shutdown requested, draining sessions");
                    break;
                }
            }
        }

        // Shutdown
        info!("Shutting down pipeline...");
        ingestion.stop_all();
        drop(record_tx);

        stats.sink_metrics = match tokio::time::timeout(DRAIN_TIMEOUT, dispatcher_handle).await {
            Ok(Ok(metrics)) => metrics,
            Ok(Err(e)) => {
                warn!(error = %e, "Dispatcher task failed");
                Vec::new()
            }
            Err(_) => {
                warn!(timeout_secs = DRAIN_TIMEOUT.as_secs(), "Dispatcher did not drain in time");
                Vec::new()
            }
        };

        let ingestion_metrics = ingestion.snapshot();
        stats.frames_dropped = ingestion_metrics.frames_dropped;
        stats.parse_errors = ingestion_metrics.parse_errors;

        stats.sessions = engines
            .into_values()
            .map(|engine| {
                let people = engine.context().tracks().count();
                let session = SessionStats {
                    source_id: engine.source_id().to_string(),
                    frames: engine.frame_count(),
                    rejected: engine.rejected_count(),
                    dropped: ingestion_metrics
                        .per_source
                        .get(engine.source_id())
                        .map_or(0, |c| c.dropped),
                    people,
                };
                engine.finish();
                session
            })
            .collect();

        stats.duration = start_time.elapsed();

        info!(
            duration_secs = stats.duration.as_secs_f64(),
            fps = format!("{:.2}", stats.fps()),
            sessions = stats.sessions.len(),
            "Pipeline shutdown complete"
        );

        Ok(stats)
    }

    /// Replay recordings first, then synthetic subjects
    fn build_sources(&self) -> Result<Vec<Box<dyn DetectionSource>>> {
        let mut sources: Vec<Box<dyn DetectionSource>> = Vec::new();

        for path in &self.config.replay {
            if !path.exists() {
                return Err(CliError::input_not_found(path.display().to_string()).into());
            }
            let mut source = ReplaySource::from_path(path);
            if let Some(speed) = self.config.replay_speed {
                source = source.with_speed(speed);
            }
            debug!(source_id = source.source_id(), path = %path.display(), "Replay source");
            sources.push(Box::new(source));
        }

        for idx in 0..self.config.mock_sessions {
            let source = MockSubjectSource::new(MockSubjectConfig {
                source_id: format!("mock_{idx:02}"),
                model_type: self.config.app.session.model_type.clone(),
                fps: self.config.mock_fps,
                duration: Some(self.config.mock_duration),
                people: self.config.mock_people,
                realtime: self.config.realtime,
                ..Default::default()
            })
            .context("Failed to create mock subject")?;
            sources.push(Box::new(source));
        }

        Ok(sources)
    }
}
