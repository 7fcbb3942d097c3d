//! DetectionSource trait - detection data source abstraction
//!
//! Defines a unified interface for anything that emits [`DetectionFrame`]s:
//! replayed recordings, the synthetic mock subject, or a live detector.

use std::sync::Arc;

use crate::DetectionFrame;

/// Detection data callback type
///
/// Uses `Arc` to allow callback sharing across multiple contexts.
pub type DetectionCallback = Arc<dyn Fn(DetectionFrame) + Send + Sync>;

/// Detection data source trait
///
/// Every source emits frames of a single session, in timestamp order.
///
/// # Example
///
/// ```ignore
/// let source: Box<dyn DetectionSource> = get_source();
/// source.listen(Arc::new(|frame| {
///     println!("frame {} from {}", frame.frame_id, frame.source_id);
/// }));
/// source.stop();
/// ```
pub trait DetectionSource: Send + Sync {
    /// Session identifier of the emitted frames
    fn source_id(&self) -> &str;

    /// Register data callback
    ///
    /// Repeated calls while listening are idempotent.
    fn listen(&self, callback: DetectionCallback);

    /// Stop emitting frames
    fn stop(&self);

    /// Check if currently listening
    fn is_listening(&self) -> bool;

    /// Whether the source has emitted everything it will ever emit
    fn is_exhausted(&self) -> bool {
        false
    }

    /// Records that could not be turned into frames and were skipped
    fn skipped_records(&self) -> u64 {
        0
    }
}
