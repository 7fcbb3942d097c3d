//! LogSink - logs a per-frame angle summary via tracing

use contracts::{ContractError, DataSink, FrameRecord};
use tracing::{info, instrument};

/// Sink that logs one structured line per processed frame
pub struct LogSink {
    name: String,
}

impl LogSink {
    /// Create a new LogSink with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    fn log_record_summary(&self, record: &FrameRecord) {
        let first = record.people.first();
        let angles = first.map(|p| p.angles.len()).unwrap_or(0);
        let widest = first.and_then(|p| {
            p.live_rom
                .iter()
                .max_by(|a, b| a.1.rom().total_cmp(&b.1.rom()))
                .map(|(name, range)| format!("{name}={:.1}", range.rom()))
        });

        info!(
            sink = %self.name,
            source_id = %record.source_id,
            frame_id = record.frame_id,
            timestamp = record.timestamp,
            people = record.people.len(),
            angles,
            widest_rom = widest.as_deref().unwrap_or("-"),
            "FrameRecord received"
        );
    }
}

impl DataSink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "log_sink_write",
        skip(self, record),
        fields(sink = %self.name, frame_id = record.frame_id)
    )]
    async fn write(&mut self, record: &FrameRecord) -> Result<(), ContractError> {
        self.log_record_summary(record);
        Ok(())
    }

    #[instrument(name = "log_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        Ok(())
    }

    #[instrument(name = "log_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        info!(sink = %self.name, "LogSink closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{AngleRange, AngleResult, PersonFrame};
    use std::collections::BTreeMap;

    #[tokio::test]
    async fn test_log_sink_write() {
        let mut sink = LogSink::new("test_log");
        let mut live_rom = BTreeMap::new();
        let mut range = AngleRange::new(80.0);
        range.update(95.0);
        live_rom.insert("trunk".to_string(), range);

        let record = FrameRecord {
            source_id: "cam".into(),
            frame_id: 1,
            timestamp: 0.04,
            people: vec![PersonFrame {
                slot: 0,
                angles: [("trunk".to_string(), 95.0)].into_iter().collect::<AngleResult>(),
                keypoints: BTreeMap::new(),
                live_rom,
            }],
        };

        assert!(sink.write(&record).await.is_ok());
        assert!(sink.close().await.is_ok());
    }

    #[tokio::test]
    async fn test_log_sink_name() {
        let sink = LogSink::new("my_logger");
        assert_eq!(sink.name(), "my_logger");
    }
}
