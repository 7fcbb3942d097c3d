//! Main session engine implementation.

use std::time::Instant;

use contracts::{ContractError, DetectionFrame, FrameRecord, SessionConfig, TimeSeries};
use tracing::{debug, instrument, warn};

use crate::context::{FrameContext, FrameProcessor};

/// Single-session frame processor
///
/// Owns the session's [`FrameContext`] exclusively; frames must be pushed
/// in arrival order from one caller at a time.
#[derive(Debug)]
pub struct SessionEngine {
    /// Session identifier
    source_id: String,
    /// Resolved settings
    processor: FrameProcessor,
    /// Current context
    context: FrameContext,
    /// Rejected (out-of-order) frame count
    rejected: u64,
}

impl SessionEngine {
    /// Create a new engine for one session
    ///
    /// # Errors
    /// `UnknownModel` when the configured body model is not registered
    pub fn new(source_id: impl Into<String>, config: &SessionConfig) -> Result<Self, ContractError> {
        let source_id = source_id.into();
        let processor = FrameProcessor::from_config(config)?;

        for unknown in processor.calculator.unknown_angles() {
            warn!(source_id = %source_id, angle = %unknown, "unknown angle will never be computed");
        }

        debug!(
            source_id = %source_id,
            model = processor.model.name,
            angles = processor.calculator.definitions().count(),
            "session engine created"
        );

        Ok(Self {
            source_id,
            processor,
            context: FrameContext::new(),
            rejected: 0,
        })
    }

    /// Process the next frame
    ///
    /// # Errors
    /// `OutOfOrderFrame` when the timestamp does not advance; the context is
    /// left unchanged.
    #[instrument(
        level = "trace",
        name = "session_engine_push",
        skip(self, frame),
        fields(source_id = %frame.source_id, frame_id = frame.frame_id, timestamp = frame.timestamp)
    )]
    pub fn push(&mut self, frame: DetectionFrame) -> Result<FrameRecord, ContractError> {
        observability::record_frame_received(&frame.source_id);

        if let Err(err) = self.context.check_order(&frame) {
            self.rejected += 1;
            observability::record_out_of_order(&frame.source_id);
            return Err(err);
        }

        let started = Instant::now();
        let context = std::mem::take(&mut self.context);
        let transition = context.advance(&frame, &self.processor);
        self.context = transition.context;

        if let Some(stats) = &transition.association {
            observability::record_association(stats.slots, stats.unmatched, &stats.distances);
        }
        observability::record_frame_metrics(&transition.record);
        observability::record_processing_latency_ms(started.elapsed().as_secs_f64() * 1000.0);

        Ok(transition.record)
    }

    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    /// Get frame count
    pub fn frame_count(&self) -> u64 {
        self.context.frame_count()
    }

    /// Frames rejected as out of order
    pub fn rejected_count(&self) -> u64 {
        self.rejected
    }

    pub fn context(&self) -> &FrameContext {
        &self.context
    }

    /// Angle time series of one identity slot so far
    ///
    /// Valid at any frame boundary, including after an aborted session.
    pub fn time_series(&self, slot: usize) -> Result<Option<TimeSeries>, ContractError> {
        self.context
            .track(slot)
            .map(|track| track.time_series())
            .transpose()
    }

    /// End the session, handing back the final context
    pub fn finish(self) -> FrameContext {
        debug!(
            source_id = %self.source_id,
            frames = self.context.frame_count(),
            rejected = self.rejected,
            "session finished"
        );
        self.context
    }
}
