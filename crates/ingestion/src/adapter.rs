//! 数据源适配器 trait

use std::sync::Arc;

use async_channel::Sender;
use contracts::DetectionFrame;

use crate::config::{IngestionMetrics, SourceCounts};

/// 把一个数据源接到共享的帧通道上
///
/// 实现负责按背压策略发送，并维护该数据源自己的计数。
pub trait SourceAdapter: Send + Sync {
    fn source_id(&self) -> &str;

    /// 开始转发帧；重复调用无效果
    fn start(&self, tx: Sender<DetectionFrame>, metrics: Arc<IngestionMetrics>);

    fn stop(&self);

    fn is_listening(&self) -> bool;

    /// 数据源已发送完所有帧
    fn is_exhausted(&self) -> bool;

    /// 该数据源的接收/丢弃/跳过计数
    fn counts(&self) -> SourceCounts;
}
