//! Channel send with backpressure handling

use async_channel::{Sender, TrySendError};
use contracts::{BackpressurePolicy, DetectionFrame};
use tracing::trace;

/// What happened to one frame offered to the channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Sent,
    /// Channel full under `drop_newest`
    Dropped,
    /// Receiver gone; the source should stop
    Closed,
}

/// Offer a frame according to the backpressure policy
///
/// `Block` parks the calling source thread until there is room, so it must
/// never be called from an async task.
#[inline]
pub fn send_frame(
    tx: &Sender<DetectionFrame>,
    frame: DetectionFrame,
    policy: BackpressurePolicy,
) -> SendOutcome {
    match policy {
        BackpressurePolicy::Block => match tx.send_blocking(frame) {
            Ok(()) => SendOutcome::Sent,
            Err(_) => SendOutcome::Closed,
        },
        BackpressurePolicy::DropNewest => match tx.try_send(frame) {
            Ok(()) => SendOutcome::Sent,
            Err(TrySendError::Full(frame)) => {
                trace!(source_id = %frame.source_id, frame_id = frame.frame_id, "channel full, newest frame dropped");
                SendOutcome::Dropped
            }
            Err(TrySendError::Closed(_)) => SendOutcome::Closed,
        },
    }
}
