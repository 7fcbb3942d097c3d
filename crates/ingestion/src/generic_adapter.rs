//! 通用数据源适配器
//!
//! 回放、模拟受试者和实时检测器都实现 `DetectionSource`，
//! 这里统一完成回调注册、背压发送和按数据源计数。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_channel::Sender;
use contracts::{DetectionCallback, DetectionFrame, DetectionSource};
use tracing::{debug, trace, warn};

use crate::adapter::SourceAdapter;
use crate::config::{BackpressureConfig, IngestionMetrics, SourceCounters, SourceCounts};
use crate::send::{send_frame, SendOutcome};

pub struct GenericSourceAdapter {
    source_id: String,
    source: Box<dyn DetectionSource>,
    config: BackpressureConfig,
    forwarding: Arc<AtomicBool>,
    counters: Arc<SourceCounters>,
}

impl GenericSourceAdapter {
    pub fn new(source: Box<dyn DetectionSource>, config: BackpressureConfig) -> Self {
        Self {
            source_id: source.source_id().to_string(),
            source,
            config,
            forwarding: Arc::new(AtomicBool::new(false)),
            counters: Arc::new(SourceCounters::default()),
        }
    }
}

impl SourceAdapter for GenericSourceAdapter {
    fn source_id(&self) -> &str {
        &self.source_id
    }

    fn start(&self, tx: Sender<DetectionFrame>, metrics: Arc<IngestionMetrics>) {
        if self.forwarding.swap(true, Ordering::SeqCst) {
            return;
        }

        let source_id = self.source_id.clone();
        let policy = self.config.policy;
        let forwarding = Arc::clone(&self.forwarding);
        let counters = Arc::clone(&self.counters);
        debug!(source_id = %source_id, policy = ?policy, "forwarding detection frames");

        let callback: DetectionCallback = Arc::new(move |frame| {
            if !forwarding.load(Ordering::Relaxed) {
                return;
            }
            counters.record_received();
            metrics.record_received();

            match send_frame(&tx, frame, policy) {
                SendOutcome::Sent => {
                    metrics.update_queue_len(tx.len());
                }
                SendOutcome::Dropped => {
                    counters.record_dropped();
                    metrics.record_dropped();
                    metrics::counter!(
                        "rom_tracker_ingestion_dropped_total",
                        "source_id" => source_id.clone()
                    )
                    .increment(1);
                }
                SendOutcome::Closed => {
                    // nobody reads any more; later frames are ignored
                    if forwarding.swap(false, Ordering::Relaxed) {
                        warn!(source_id = %source_id, "frame channel closed, forwarding stopped");
                    }
                }
            }
            trace!(source_id = %source_id, queue = tx.len(), "frame offered");
        });

        self.source.listen(callback);
    }

    fn stop(&self) {
        self.forwarding.store(false, Ordering::SeqCst);
        if self.source.is_listening() {
            debug!(source_id = %self.source_id, "stopping detection source");
            self.source.stop();
        }
    }

    fn is_listening(&self) -> bool {
        self.forwarding.load(Ordering::Relaxed) && !self.source.is_exhausted()
    }

    fn is_exhausted(&self) -> bool {
        self.source.is_exhausted()
    }

    fn counts(&self) -> SourceCounts {
        self.counters.counts(self.source.skipped_records())
    }
}
