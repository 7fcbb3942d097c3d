//! IngestionPipeline - many detection sources, one bounded frame stream
//!
//! Frames of one source arrive in that source's order; frames of different
//! sources interleave freely. Each source feeds exactly one session.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_channel::{bounded, Receiver, Sender};
use contracts::{DetectionFrame, DetectionSource};
use tracing::{debug, info, instrument};

use crate::adapter::SourceAdapter;
use crate::config::{BackpressureConfig, IngestionMetrics, MetricsSnapshot, SourceCounts};
use crate::error::{IngestionError, Result};
use crate::generic_adapter::GenericSourceAdapter;

pub struct IngestionPipeline {
    adapters: BTreeMap<String, Box<dyn SourceAdapter>>,
    metrics: Arc<IngestionMetrics>,
    tx: Sender<DetectionFrame>,
    /// Handed out once by `take_receiver`
    rx: Option<Receiver<DetectionFrame>>,
    /// Applied to sources registered without their own settings
    default_config: BackpressureConfig,
}

impl IngestionPipeline {
    /// Blocking backpressure over a channel of `channel_capacity` frames
    pub fn new(channel_capacity: usize) -> Self {
        Self::with_config(BackpressureConfig {
            channel_capacity,
            ..Default::default()
        })
    }

    pub fn with_config(config: BackpressureConfig) -> Self {
        let (tx, rx) = bounded(config.channel_capacity.max(1));
        Self {
            adapters: BTreeMap::new(),
            metrics: Arc::new(IngestionMetrics::new()),
            tx,
            rx: Some(rx),
            default_config: config,
        }
    }

    /// Add a source; it starts with the next `start_all`
    ///
    /// # Errors
    /// `AlreadyRegistered` when another source uses the same id, since two
    /// sources cannot share one session
    #[instrument(
        name = "ingestion_register_source",
        skip(self, source, config),
        fields(source_id = %source.source_id())
    )]
    pub fn register_source(
        &mut self,
        source: Box<dyn DetectionSource>,
        config: Option<BackpressureConfig>,
    ) -> Result<()> {
        let source_id = source.source_id().to_string();
        if self.adapters.contains_key(&source_id) {
            return Err(IngestionError::AlreadyRegistered { source_id });
        }

        let config = config.unwrap_or_else(|| self.default_config.clone());
        debug!(policy = ?config.policy, "detection source registered");
        self.adapters
            .insert(source_id, Box::new(GenericSourceAdapter::new(source, config)));
        Ok(())
    }

    #[instrument(name = "ingestion_start_all", skip(self), fields(sources = self.adapters.len()))]
    pub fn start_all(&self) {
        let mut started = 0;
        for adapter in self.adapters.values() {
            if !adapter.is_listening() && !adapter.is_exhausted() {
                adapter.start(self.tx.clone(), Arc::clone(&self.metrics));
                started += 1;
            }
        }
        info!(started, "detection sources started");
    }

    #[instrument(name = "ingestion_stop_all", skip(self), fields(sources = self.adapters.len()))]
    pub fn stop_all(&self) {
        for adapter in self.adapters.values() {
            adapter.stop();
        }
        debug!("detection sources stopped");
    }

    /// The frame stream; `None` after the first call
    pub fn take_receiver(&mut self) -> Option<Receiver<DetectionFrame>> {
        self.rx.take()
    }

    /// Shared totals, updated live by the sources
    pub fn metrics(&self) -> Arc<IngestionMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Totals plus per-source counts
    pub fn snapshot(&self) -> MetricsSnapshot {
        let per_source: BTreeMap<String, SourceCounts> = self
            .adapters
            .iter()
            .map(|(id, adapter)| (id.clone(), adapter.counts()))
            .collect();
        MetricsSnapshot {
            frames_received: self.metrics.frames_received(),
            frames_dropped: self.metrics.frames_dropped(),
            queue_len: self.metrics.queue_len(),
            parse_errors: per_source.values().map(|c| c.skipped).sum(),
            per_source,
        }
    }

    pub fn source_count(&self) -> usize {
        self.adapters.len()
    }

    pub fn source_ids(&self) -> impl Iterator<Item = &str> {
        self.adapters.keys().map(String::as_str)
    }

    pub fn is_source_listening(&self, source_id: &str) -> bool {
        self.adapters
            .get(source_id)
            .is_some_and(|a| a.is_listening())
    }

    /// Every source has emitted all of its frames
    ///
    /// Always false without sources or when any source is unbounded.
    pub fn all_exhausted(&self) -> bool {
        !self.adapters.is_empty() && self.adapters.values().all(|a| a.is_exhausted())
    }
}

impl Drop for IngestionPipeline {
    fn drop(&mut self) {
        self.stop_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackpressurePolicy;
    use crate::mock::{MockSubjectConfig, MockSubjectSource};

    fn mock(id: &str, duration: f64) -> Box<dyn DetectionSource> {
        Box::new(
            MockSubjectSource::new(MockSubjectConfig {
                source_id: id.into(),
                fps: 20.0,
                duration: Some(duration),
                realtime: false,
                ..Default::default()
            })
            .unwrap(),
        )
    }

    #[test]
    fn test_pipeline_creation() {
        let pipeline = IngestionPipeline::new(100);
        assert_eq!(pipeline.source_count(), 0);
        assert!(!pipeline.all_exhausted());
    }

    #[test]
    fn test_take_receiver_once() {
        let mut pipeline = IngestionPipeline::new(100);
        assert!(pipeline.take_receiver().is_some());
        assert!(pipeline.take_receiver().is_none());
    }

    #[test]
    fn duplicate_source_id_is_rejected() {
        let mut pipeline = IngestionPipeline::new(10);
        pipeline.register_source(mock("a", 1.0), None).unwrap();
        let err = pipeline.register_source(mock("a", 1.0), None).unwrap_err();
        assert!(matches!(err, IngestionError::AlreadyRegistered { .. }));
    }

    #[tokio::test]
    async fn frames_from_all_sources_arrive_in_per_source_order() {
        let mut pipeline = IngestionPipeline::new(4);
        pipeline.register_source(mock("a", 1.0), None).unwrap();
        pipeline.register_source(mock("b", 0.5), None).unwrap();
        assert_eq!(pipeline.source_ids().collect::<Vec<_>>(), vec!["a", "b"]);
        let rx = pipeline.take_receiver().unwrap();
        pipeline.start_all();

        let mut last: BTreeMap<String, u64> = BTreeMap::new();
        let mut received = 0;
        while received < 30 {
            let frame = rx.recv().await.unwrap();
            if let Some(prev) = last.insert(frame.source_id.clone(), frame.frame_id) {
                assert!(frame.frame_id > prev);
            }
            received += 1;
        }

        // blocking policy: nothing is lost
        assert_eq!(last["a"], 19);
        assert_eq!(last["b"], 9);
        let snapshot = pipeline.snapshot();
        assert_eq!(snapshot.frames_received, 30);
        assert_eq!(snapshot.frames_dropped, 0);
        assert_eq!(snapshot.per_source["b"].received, 10);

        for _ in 0..100 {
            if pipeline.all_exhausted() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        assert!(pipeline.all_exhausted());
    }

    #[test]
    fn drop_newest_loses_frames_when_nobody_reads() {
        let mut pipeline =
            IngestionPipeline::with_config(BackpressureConfig::new(2, BackpressurePolicy::DropNewest));
        pipeline.register_source(mock("a", 1.0), None).unwrap();
        let rx = pipeline.take_receiver().unwrap();
        pipeline.start_all();

        for _ in 0..200 {
            if pipeline.all_exhausted() {
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(5));
        }
        assert_eq!(rx.len(), 2);
        let snapshot = pipeline.snapshot();
        assert_eq!(snapshot.frames_dropped, 18);
        assert_eq!(snapshot.per_source["a"].dropped, 18);
        assert_eq!(snapshot.parse_errors, 0);
    }
}
