//! AppConfig - Config Loader 输出
//!
//! 描述完整的运行配置：会话角度计算、ROM 分析、摄取背压、输出路由。
//! 配置作为显式值传入每个会话，不存在进程级可变配置。

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use validator::Validate;

/// 配置版本
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// 完整的运行配置
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct AppConfig {
    /// 配置版本
    #[serde(default)]
    pub version: ConfigVersion,

    /// 会话 (角度计算) 配置
    #[serde(default)]
    #[validate(nested)]
    pub session: SessionConfig,

    /// ROM 分析配置
    #[serde(default)]
    #[validate(nested)]
    pub rom: RomOptions,

    /// 摄取通道配置
    #[serde(default)]
    #[validate(nested)]
    pub ingestion: IngestionConfig,

    /// 输出路由配置
    #[serde(default)]
    pub sinks: Vec<SinkConfig>,
}

/// Angles requested when a config leaves `joint_angles` empty
pub const DEFAULT_JOINT_ANGLES: [&str; 8] = [
    "right knee",
    "left knee",
    "right hip",
    "left hip",
    "right shoulder",
    "left shoulder",
    "right elbow",
    "left elbow",
];

/// Angles requested when a config leaves `segment_angles` empty
pub const DEFAULT_SEGMENT_ANGLES: [&str; 3] = ["right thigh", "left thigh", "trunk"];

/// 会话配置：每帧角度计算参数
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SessionConfig {
    /// 姿态模型名称 (e.g., "body_with_feet", "COCO_17")
    #[serde(default = "default_model_type")]
    #[validate(length(min = 1))]
    pub model_type: String,

    /// 关键点置信度阈值，[0, 1]
    #[serde(default = "default_confidence_threshold")]
    #[validate(range(min = 0.0, max = 1.0))]
    pub confidence_threshold: f64,

    /// 关节角度名称 (空 = 默认列表)
    #[serde(default)]
    pub joint_angles: Vec<String>,

    /// 节段角度名称 (空 = 默认列表)
    #[serde(default)]
    pub segment_angles: Vec<String>,

    /// 受试者身高 (米)，仅透传给下游
    #[serde(default = "default_subject_height")]
    #[validate(range(exclusive_min = 0.0))]
    pub subject_height: f64,

    /// 多人处理策略
    #[serde(default)]
    pub person_selection: PersonSelection,
}

fn default_model_type() -> String {
    "body_with_feet".to_string()
}

fn default_confidence_threshold() -> f64 {
    0.3
}

fn default_subject_height() -> f64 {
    1.7
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            model_type: default_model_type(),
            confidence_threshold: default_confidence_threshold(),
            joint_angles: Vec::new(),
            segment_angles: Vec::new(),
            subject_height: default_subject_height(),
            person_selection: PersonSelection::default(),
        }
    }
}

impl SessionConfig {
    /// Requested angle names: joints first, then segments, defaults filled in
    pub fn angle_names(&self) -> Vec<String> {
        let joints = if self.joint_angles.is_empty() {
            DEFAULT_JOINT_ANGLES.iter().map(|s| s.to_string()).collect()
        } else {
            self.joint_angles.clone()
        };
        let segments = if self.segment_angles.is_empty() {
            DEFAULT_SEGMENT_ANGLES.iter().map(|s| s.to_string()).collect()
        } else {
            self.segment_angles.clone()
        };
        joints.into_iter().chain(segments).collect()
    }
}

/// 多人处理策略
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersonSelection {
    /// 仅处理身份槽 0
    #[default]
    First,
    /// 处理全部身份槽
    All,
}

/// ROM 分析配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RomOptions {
    /// 测试名称 (写入报告)
    #[serde(default = "default_test_name")]
    pub test_name: String,

    /// 平滑窗口 (秒)，必须 > 0
    #[serde(default = "default_time_window")]
    #[validate(range(exclusive_min = 0.0))]
    pub time_window: f64,

    /// 计算 running ROM 的参考角度
    #[serde(default = "default_reference_angle")]
    #[validate(length(min = 1))]
    pub reference_angle: String,
}

fn default_test_name() -> String {
    "default".to_string()
}

fn default_time_window() -> f64 {
    0.4
}

fn default_reference_angle() -> String {
    "trunk".to_string()
}

impl Default for RomOptions {
    fn default() -> Self {
        Self {
            test_name: default_test_name(),
            time_window: default_time_window(),
            reference_angle: default_reference_angle(),
        }
    }
}

/// 摄取通道配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct IngestionConfig {
    /// 通道容量
    #[serde(default = "default_channel_capacity")]
    #[validate(range(min = 1))]
    pub channel_capacity: usize,

    /// 背压策略
    #[serde(default)]
    pub backpressure: BackpressurePolicy,
}

fn default_channel_capacity() -> usize {
    256
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
            backpressure: BackpressurePolicy::default(),
        }
    }
}

/// 背压策略 (通道满时)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackpressurePolicy {
    /// 阻塞生产者直到有空位
    #[default]
    Block,
    /// 丢弃最新的帧
    DropNewest,
}

/// Sink 输出配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Sink 名称
    pub name: String,

    /// Sink 类型
    pub sink_type: SinkType,

    /// 队列容量
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// 类型特定参数
    #[serde(default)]
    pub params: HashMap<String, String>,
}

fn default_queue_capacity() -> usize {
    100
}

/// Sink 类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkType {
    /// 日志输出
    Log,
    /// 角度时间序列文件输出
    File,
}
