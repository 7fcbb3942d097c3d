//! SinkHandle - one sink behind its own bounded queue and worker task
//!
//! The worker owns the sink. Records arrive through a bounded queue; when
//! the queue is full the record is lost for this sink only. An optional
//! flush interval makes sinks that buffer (the angle files) persist partial
//! sessions while frames are still arriving.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument, trace, warn};

use contracts::{DataSink, FrameRecord};

use crate::metrics::SinkMetrics;

/// Log every n-th dropped record after the first
const DROP_LOG_EVERY: u64 = 100;

/// Handle to a running sink worker
pub struct SinkHandle {
    name: String,
    tx: mpsc::Sender<FrameRecord>,
    metrics: Arc<SinkMetrics>,
    worker: JoinHandle<()>,
}

impl SinkHandle {
    /// Spawn a worker that only flushes on shutdown
    pub fn spawn<S: DataSink + Send + 'static>(sink: S, queue_capacity: usize) -> Self {
        Self::spawn_with_flush(sink, queue_capacity, None)
    }

    /// Spawn a worker that also flushes every `flush_interval`
    ///
    /// Must be called within a tokio runtime.
    pub fn spawn_with_flush<S: DataSink + Send + 'static>(
        sink: S,
        queue_capacity: usize,
        flush_interval: Option<Duration>,
    ) -> Self {
        let name = sink.name().to_string();
        let (tx, rx) = mpsc::channel(queue_capacity.max(1));
        let metrics = Arc::new(SinkMetrics::new());

        let worker = tokio::spawn(sink_worker(
            sink,
            rx,
            Arc::clone(&metrics),
            flush_interval.filter(|d| !d.is_zero()),
        ));

        Self {
            name,
            tx,
            metrics,
            worker,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metrics(&self) -> &Arc<SinkMetrics> {
        &self.metrics
    }

    /// Queue a record without waiting
    ///
    /// Returns false when the record was dropped (queue full or worker gone).
    pub fn try_send(&self, record: FrameRecord) -> bool {
        match self.tx.try_send(record) {
            Ok(()) => {
                self.metrics
                    .set_queue_len(self.tx.max_capacity() - self.tx.capacity());
                true
            }
            Err(mpsc::error::TrySendError::Full(record)) => {
                self.metrics.inc_dropped_count();
                observability::record_frame_dispatched(&self.name, false);
                let dropped = self.metrics.dropped_count();
                if dropped == 1 || dropped % DROP_LOG_EVERY == 0 {
                    warn!(
                        sink = %self.name,
                        source_id = %record.source_id,
                        frame_id = record.frame_id,
                        dropped,
                        "Sink queue full, record dropped"
                    );
                }
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                error!(sink = %self.name, "Sink worker is gone");
                false
            }
        }
    }

    /// Close the queue and wait for the worker to flush and close the sink
    #[instrument(name = "sink_handle_shutdown", skip(self), fields(sink = %self.name))]
    pub async fn shutdown(self) {
        drop(self.tx);
        if let Err(e) = self.worker.await {
            error!(sink = %self.name, error = ?e, "Sink worker panicked");
        }
        debug!(sink = %self.name, "Sink stopped");
    }
}

async fn write_one<S: DataSink>(sink: &mut S, record: &FrameRecord, metrics: &SinkMetrics) {
    match sink.write(record).await {
        Ok(()) => {
            metrics.inc_write_count();
            observability::record_frame_dispatched(sink.name(), true);
        }
        Err(e) => {
            // a failing write never stops the worker
            metrics.inc_failure_count();
            observability::record_frame_dispatched(sink.name(), false);
            error!(
                sink = %sink.name(),
                source_id = %record.source_id,
                frame_id = record.frame_id,
                error = %e,
                "Write failed"
            );
        }
    }
}

#[instrument(name = "sink_worker", skip_all, fields(sink = %sink.name()))]
async fn sink_worker<S: DataSink>(
    mut sink: S,
    mut rx: mpsc::Receiver<FrameRecord>,
    metrics: Arc<SinkMetrics>,
    flush_interval: Option<Duration>,
) {
    debug!(flush_interval = ?flush_interval, "Sink worker started");

    match flush_interval {
        None => {
            while let Some(record) = rx.recv().await {
                metrics.set_queue_len(rx.len());
                write_one(&mut sink, &record, &metrics).await;
            }
        }
        Some(period) => {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            let mut pending = false;
            loop {
                tokio::select! {
                    received = rx.recv() => {
                        let Some(record) = received else { break };
                        metrics.set_queue_len(rx.len());
                        write_one(&mut sink, &record, &metrics).await;
                        pending = true;
                    }
                    _ = ticker.tick() => {
                        if pending {
                            trace!("Periodic flush");
                            if let Err(e) = sink.flush().await {
                                error!(error = %e, "Periodic flush failed");
                            }
                            pending = false;
                        }
                    }
                }
            }
        }
    }

    if let Err(e) = sink.flush().await {
        error!(error = %e, "Flush failed on shutdown");
    }
    if let Err(e) = sink.close().await {
        error!(error = %e, "Close failed on shutdown");
    }
    metrics.set_queue_len(0);
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::ContractError;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Mutex;
    use tokio::time::sleep;

    pub(crate) fn record(i: u64) -> FrameRecord {
        FrameRecord {
            source_id: "cam".into(),
            frame_id: i,
            timestamp: i as f64 / 30.0,
            people: Vec::new(),
        }
    }

    /// Remembers written frame ids and how often it was flushed
    #[derive(Default)]
    struct Recorder {
        frames: Mutex<Vec<u64>>,
        flushes: AtomicU64,
        closed: AtomicU64,
    }

    struct RecordingSink {
        name: String,
        seen: Arc<Recorder>,
        fail_every: Option<u64>,
        delay: Duration,
    }

    impl RecordingSink {
        fn new(name: &str, seen: &Arc<Recorder>) -> Self {
            Self {
                name: name.to_string(),
                seen: Arc::clone(seen),
                fail_every: None,
                delay: Duration::ZERO,
            }
        }
    }

    impl DataSink for RecordingSink {
        fn name(&self) -> &str {
            &self.name
        }

        async fn write(&mut self, record: &FrameRecord) -> Result<(), ContractError> {
            if !self.delay.is_zero() {
                sleep(self.delay).await;
            }
            if self.fail_every.is_some_and(|n| record.frame_id % n == 0) {
                return Err(ContractError::sink_write(&self.name, "refused"));
            }
            self.seen.frames.lock().unwrap().push(record.frame_id);
            Ok(())
        }

        async fn flush(&mut self) -> Result<(), ContractError> {
            self.seen.flushes.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }

        async fn close(&mut self) -> Result<(), ContractError> {
            self.seen.closed.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_records_arrive_in_order_and_sink_is_closed() {
        let seen = Arc::new(Recorder::default());
        let handle = SinkHandle::spawn(RecordingSink::new("angles", &seen), 16);

        for i in 0..6 {
            assert!(handle.try_send(record(i)));
        }
        let metrics = Arc::clone(handle.metrics());
        handle.shutdown().await;

        assert_eq!(*seen.frames.lock().unwrap(), (0..6).collect::<Vec<_>>());
        assert_eq!(seen.flushes.load(Ordering::Relaxed), 1);
        assert_eq!(seen.closed.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.write_count(), 6);
        assert_eq!(metrics.queue_len(), 0);
    }

    #[tokio::test]
    async fn test_full_queue_drops_for_this_sink_only() {
        let seen = Arc::new(Recorder::default());
        let mut slow = RecordingSink::new("slow", &seen);
        slow.delay = Duration::from_millis(50);
        let handle = SinkHandle::spawn(slow, 2);

        let accepted = (0..10).filter(|&i| handle.try_send(record(i))).count() as u64;

        assert!(handle.metrics().dropped_count() > 0);
        assert_eq!(accepted + handle.metrics().dropped_count(), 10);
        let metrics = Arc::clone(handle.metrics());
        handle.shutdown().await;
        assert_eq!(metrics.write_count(), accepted);
    }

    #[tokio::test]
    async fn test_failed_writes_are_counted_and_skipped() {
        let seen = Arc::new(Recorder::default());
        let mut flaky = RecordingSink::new("flaky", &seen);
        flaky.fail_every = Some(2);
        let handle = SinkHandle::spawn(flaky, 10);

        for i in 0..5 {
            handle.try_send(record(i));
        }
        let metrics = Arc::clone(handle.metrics());
        handle.shutdown().await;

        assert_eq!(metrics.failure_count(), 3);
        assert_eq!(metrics.write_count(), 2);
        assert_eq!(*seen.frames.lock().unwrap(), vec![1, 3]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_periodic_flush_only_after_new_records() {
        let seen = Arc::new(Recorder::default());
        let handle = SinkHandle::spawn_with_flush(
            RecordingSink::new("angles", &seen),
            10,
            Some(Duration::from_secs(1)),
        );

        handle.try_send(record(0));
        sleep(Duration::from_millis(1500)).await;
        assert_eq!(seen.flushes.load(Ordering::Relaxed), 1);

        // nothing new: the next tick does not flush
        sleep(Duration::from_secs(1)).await;
        assert_eq!(seen.flushes.load(Ordering::Relaxed), 1);

        handle.shutdown().await;
        assert_eq!(seen.flushes.load(Ordering::Relaxed), 2);
    }
}
