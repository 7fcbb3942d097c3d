//! Layered error definitions
//!
//! Categorized by source: angle / time series / session / config / sink

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Angle Errors =====
    /// Requested angle name is not in the definition table
    #[error("unknown angle: '{name}'")]
    UnknownAngle { name: String },

    /// A required landmark is undefined or absent from the body model
    #[error("missing landmark '{landmark}' for angle '{angle}'")]
    MissingLandmark { angle: String, landmark: String },

    /// Zero-length vectors or coincident points
    #[error("degenerate geometry for angle '{angle}'")]
    DegenerateGeometry { angle: String },

    /// Body model name is not registered
    #[error("unknown body model: '{name}'")]
    UnknownModel { name: String },

    // ===== Time Series Errors =====
    /// Persisted angle file cannot be read back
    #[error("malformed time series file '{path}' at line {line}: {message}")]
    MalformedTimeSeriesFile {
        path: String,
        line: usize,
        message: String,
    },

    /// Rows violating the shared-columns / increasing-time invariants
    #[error("invalid time series: {message}")]
    InvalidTimeSeries { message: String },

    // ===== Session Errors =====
    /// Frame timestamp does not advance the session clock
    #[error("out of order frame {frame_id} for '{source_id}': t={timestamp} <= last t={last}")]
    OutOfOrderFrame {
        source_id: String,
        frame_id: u64,
        timestamp: f64,
        last: f64,
    },

    /// Detection source produced an unreadable frame
    #[error("source '{source_id}' read error: {message}")]
    SourceRead { source_id: String, message: String },

    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Sink Errors =====
    /// Sink write error
    #[error("sink '{sink_name}' write error: {message}")]
    SinkWrite { sink_name: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create unknown angle error
    pub fn unknown_angle(name: impl Into<String>) -> Self {
        Self::UnknownAngle { name: name.into() }
    }

    /// Create missing landmark error
    pub fn missing_landmark(angle: impl Into<String>, landmark: impl Into<String>) -> Self {
        Self::MissingLandmark {
            angle: angle.into(),
            landmark: landmark.into(),
        }
    }

    /// Create malformed time series file error
    pub fn malformed_file(
        path: impl Into<String>,
        line: usize,
        message: impl Into<String>,
    ) -> Self {
        Self::MalformedTimeSeriesFile {
            path: path.into(),
            line,
            message: message.into(),
        }
    }

    /// Create invalid time series error
    pub fn invalid_time_series(message: impl Into<String>) -> Self {
        Self::InvalidTimeSeries {
            message: message.into(),
        }
    }

    /// Create source read error
    pub fn source_read(source_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SourceRead {
            source_id: source_id.into(),
            message: message.into(),
        }
    }

    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create sink write error
    pub fn sink_write(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkWrite {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }

    /// Whether the error is recovered locally (angle skipped) rather than propagated
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            Self::UnknownAngle { .. } | Self::MissingLandmark { .. } | Self::DegenerateGeometry { .. }
        )
    }
}
