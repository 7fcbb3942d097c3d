//! Ingestion 错误类型

use thiserror::Error;

/// Ingestion 错误
#[derive(Debug, Error)]
pub enum IngestionError {
    /// 检测记录解析失败
    #[error("failed to parse detection record {source_id}:{line}: {message}")]
    ParseFailed {
        /// 数据源 ID
        source_id: String,
        /// 行号 (1 起)
        line: usize,
        /// 错误消息
        message: String,
    },

    /// 姿态检测器失败
    #[error("pose detector failed for {source_id}: {message}")]
    DetectorFailed {
        /// 数据源 ID
        source_id: String,
        /// 错误消息
        message: String,
    },

    /// 通道已关闭
    #[error("channel closed for source {source_id}")]
    ChannelClosed {
        /// 数据源 ID
        source_id: String,
    },

    /// 数据源已在监听
    #[error("source {source_id} is already registered")]
    AlreadyRegistered {
        /// 数据源 ID
        source_id: String,
    },

    /// 文件读写失败
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Ingestion Result 类型别名
pub type Result<T> = std::result::Result<T, IngestionError>;
