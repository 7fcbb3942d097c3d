//! Pipeline statistics and metrics.

use std::time::Duration;

use dispatcher::MetricsSnapshot;
use observability::SessionMetricsAggregator;

/// Per-session counters reported at the end of a run
#[derive(Debug, Clone, Default)]
pub struct SessionStats {
    pub source_id: String,
    pub frames: u64,
    pub rejected: u64,
    /// Frames lost on a full ingestion channel before reaching the session
    pub dropped: u64,
    /// Identity slots that produced at least one frame
    pub people: usize,
}

/// Statistics from a pipeline run
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Frames received from the ingestion channel
    pub frames_received: u64,

    /// Records produced by session engines
    pub records_produced: u64,

    /// Frames rejected because their timestamp did not advance
    pub frames_rejected: u64,

    /// Frames dropped by ingestion backpressure
    pub frames_dropped: u64,

    /// Unreadable recording lines
    pub parse_errors: u64,

    /// Total duration of the pipeline run
    pub duration: Duration,

    /// Sinks that were configured
    pub active_sinks: usize,

    /// Session-level metrics aggregator
    pub session_metrics: SessionMetricsAggregator,

    /// One entry per session, ordered by source id
    pub sessions: Vec<SessionStats>,

    /// Final sink counters
    pub sink_metrics: Vec<(String, MetricsSnapshot)>,
}

impl PipelineStats {
    /// Calculate records per second throughput
    pub fn fps(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.records_produced as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Rejected and dropped frames as a percentage of everything offered
    pub fn loss_rate(&self) -> f64 {
        let lost = self.frames_rejected + self.frames_dropped;
        let total = self.frames_received + self.frames_dropped;
        if total > 0 {
            (lost as f64 / total as f64) * 100.0
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n=== Pipeline Statistics ===\n");

        println!("Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Frames received: {}", self.frames_received);
        println!("   ├─ Records produced: {}", self.records_produced);
        println!(
            "   ├─ Rejected / dropped: {} / {} ({:.2}%)",
            self.frames_rejected,
            self.frames_dropped,
            self.loss_rate()
        );
        println!("   ├─ Unreadable lines: {}", self.parse_errors);
        println!("   ├─ FPS: {:.2}", self.fps());
        println!("   └─ Active sinks: {}", self.active_sinks);

        if !self.sessions.is_empty() {
            println!("\nSessions");
            for session in &self.sessions {
                println!(
                    "   ├─ {}: {} frames, {} rejected, {} dropped, {} people",
                    session.source_id, session.frames, session.rejected, session.dropped, session.people
                );
            }
        }

        if !self.sink_metrics.is_empty() {
            println!("\nSinks");
            for (name, snapshot) in &self.sink_metrics {
                println!("   ├─ {name}: {snapshot}");
            }
        }

        println!("\n{}", self.session_metrics.summary());
    }
}
