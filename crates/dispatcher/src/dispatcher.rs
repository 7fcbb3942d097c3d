//! Dispatcher - fan-out of frame records to every configured sink

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, instrument, warn};

use contracts::{FrameRecord, RomOptions, SinkConfig, SinkType};

use crate::error::DispatcherError;
use crate::handle::SinkHandle;
use crate::metrics::{MetricsSnapshot, SinkMetrics};
use crate::sinks::{AngleFileSink, LogSink};

/// Sink param read for every sink type: seconds between periodic flushes
pub const FLUSH_INTERVAL_PARAM: &str = "flush_interval_secs";

const PROGRESS_EVERY: u64 = 500;

fn flush_interval(config: &SinkConfig) -> Result<Option<Duration>, DispatcherError> {
    let Some(raw) = config.params.get(FLUSH_INTERVAL_PARAM) else {
        return Ok(None);
    };
    match raw.trim().parse::<f64>() {
        Ok(secs) if secs == 0.0 => Ok(None),
        Ok(secs) if secs > 0.0 && secs.is_finite() => Ok(Some(Duration::from_secs_f64(secs))),
        _ => Err(DispatcherError::sink_creation(
            &config.name,
            format!("{FLUSH_INTERVAL_PARAM} must be a non-negative number, got '{raw}'"),
        )),
    }
}

/// Start the worker for one configured sink
///
/// `rom` holds the session ROM settings; file sink params may override them.
/// Must be called within a tokio runtime.
#[instrument(
    name = "dispatcher_create_sink_handle",
    skip(config, rom),
    fields(sink = %config.name, sink_type = ?config.sink_type)
)]
pub fn create_sink_handle(
    config: &SinkConfig,
    rom: &RomOptions,
) -> Result<SinkHandle, DispatcherError> {
    let flush_every = flush_interval(config)?;
    let handle = match config.sink_type {
        SinkType::Log => {
            SinkHandle::spawn_with_flush(LogSink::new(&config.name), config.queue_capacity, flush_every)
        }
        SinkType::File => {
            let sink = AngleFileSink::from_params(&config.name, &config.params, rom)
                .map_err(|e| DispatcherError::sink_creation(&config.name, e.to_string()))?;
            SinkHandle::spawn_with_flush(sink, config.queue_capacity, flush_every)
        }
    };
    Ok(handle)
}

/// Consumes frame records and offers each one to every sink
pub struct Dispatcher {
    handles: Vec<SinkHandle>,
    input_rx: mpsc::Receiver<FrameRecord>,
}

impl Dispatcher {
    /// Build from already running handles
    pub fn with_handles(handles: Vec<SinkHandle>, input_rx: mpsc::Receiver<FrameRecord>) -> Self {
        Self { handles, input_rx }
    }

    /// Start one worker per sink config
    ///
    /// # Errors
    /// `SinkCreation` for duplicate names or a sink that cannot be built.
    /// Workers already started are stopped again.
    pub fn from_configs(
        configs: &[SinkConfig],
        rom: &RomOptions,
        input_rx: mpsc::Receiver<FrameRecord>,
    ) -> Result<Self, DispatcherError> {
        let mut names = HashSet::new();
        let mut handles = Vec::with_capacity(configs.len());
        for config in configs {
            let created = if names.insert(config.name.as_str()) {
                create_sink_handle(config, rom)
            } else {
                Err(DispatcherError::sink_creation(&config.name, "duplicate sink name"))
            };
            match created {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    // dropping the senders lets the started workers finish on their own
                    drop(handles);
                    return Err(e);
                }
            }
        }
        Ok(Self::with_handles(handles, input_rx))
    }

    /// Current counters of all sinks, in configuration order
    pub fn metrics(&self) -> Vec<(String, MetricsSnapshot)> {
        self.handles
            .iter()
            .map(|h| (h.name().to_string(), h.metrics().snapshot()))
            .collect()
    }

    /// Forward records until the input closes, then drain and close every sink
    ///
    /// The returned counters are taken after the sinks have been closed.
    #[instrument(name = "dispatcher_run", skip(self), fields(sinks = self.handles.len()))]
    pub async fn run(mut self) -> Vec<(String, MetricsSnapshot)> {
        info!("Dispatcher started");

        let mut per_source: BTreeMap<String, u64> = BTreeMap::new();
        let mut total: u64 = 0;

        while let Some(record) = self.input_rx.recv().await {
            *per_source.entry(record.source_id.clone()).or_default() += 1;
            total += 1;

            let accepted = self
                .handles
                .iter()
                .filter(|h| h.try_send(record.clone()))
                .count();
            if accepted < self.handles.len() {
                debug!(
                    source_id = %record.source_id,
                    frame_id = record.frame_id,
                    accepted,
                    "Record not taken by every sink"
                );
            }
            if total % PROGRESS_EVERY == 0 {
                debug!(records = total, sources = per_source.len(), "Dispatcher progress");
            }
        }

        for (source_id, records) in &per_source {
            info!(source_id = %source_id, records, "Session records dispatched");
        }
        info!(records = total, "Input closed, draining sinks");

        let counters: Vec<(String, Arc<SinkMetrics>)> = self
            .handles
            .iter()
            .map(|h| (h.name().to_string(), Arc::clone(h.metrics())))
            .collect();

        let mut closing = JoinSet::new();
        for handle in self.handles {
            closing.spawn(handle.shutdown());
        }
        while let Some(joined) = closing.join_next().await {
            if let Err(e) = joined {
                warn!(error = %e, "Sink shutdown task failed");
            }
        }

        info!("Dispatcher shutdown complete");
        counters
            .into_iter()
            .map(|(name, metrics)| (name, metrics.snapshot()))
            .collect()
    }

    /// Run on a background task
    pub fn spawn(self) -> JoinHandle<Vec<(String, MetricsSnapshot)>> {
        tokio::spawn(self.run())
    }
}

/// Dispatcher over the given sink configs and session ROM settings
#[instrument(name = "dispatcher_create", skip_all, fields(sinks = sink_configs.len()))]
pub fn create_dispatcher(
    sink_configs: Vec<SinkConfig>,
    rom: &RomOptions,
    input_rx: mpsc::Receiver<FrameRecord>,
) -> Result<Dispatcher, DispatcherError> {
    Dispatcher::from_configs(&sink_configs, rom, input_rx)
}
