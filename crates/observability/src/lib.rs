//! # Observability
//!
//! 日志与指标：tracing 订阅器初始化（输出到 stderr），以及会话管道的 Prometheus 指标。
//!
//! 指标名称集中在 [`metrics::names`]，导出器安装时会为每个指标注册说明，
//! 并为角度、距离、延迟类直方图设置合适的分桶。
//!
//! ```ignore
//! observability::init_with_config(ObservabilityConfig {
//!     metrics_port: Some(9000),
//!     ..Default::default()
//! })?;
//! ```

pub mod metrics;

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use anyhow::{Context, Result};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry};

pub use crate::metrics::{
    describe_metrics, record_angle_skipped, record_association, record_frame_dispatched,
    record_frame_metrics, record_frame_received, record_out_of_order, record_processing_latency_ms,
    MetricsSummary, RunningStats, SessionMetricsAggregator, StatsSummary,
};

/// 可观测性配置
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    pub log_format: LogFormat,
    /// `RUST_LOG` 未设置时使用的过滤指令
    pub default_log_level: String,
    /// Prometheus 端口，`None` 表示不导出
    pub metrics_port: Option<u16>,
    /// Prometheus 监听地址
    pub metrics_bind: IpAddr,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Json,
            default_log_level: "info".to_string(),
            metrics_port: None,
            metrics_bind: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        }
    }
}

impl ObservabilityConfig {
    /// 导出器的监听地址（未启用时为 `None`）
    pub fn metrics_addr(&self) -> Option<SocketAddr> {
        self.metrics_port
            .map(|port| SocketAddr::new(self.metrics_bind, port))
    }
}

/// 日志输出格式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// 每行一个 JSON 对象
    #[default]
    Json,
    Pretty,
    Compact,
}

impl LogFormat {
    /// 解析 `json` / `pretty` / `compact`，不区分大小写
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "json" => Some(Self::Json),
            "pretty" => Some(Self::Pretty),
            "compact" => Some(Self::Compact),
            _ => None,
        }
    }

    fn layer(self) -> Box<dyn Layer<Registry> + Send + Sync> {
        match self {
            Self::Json => fmt::layer()
                .json()
                .with_current_span(true)
                .with_target(true)
                .with_thread_names(true)
                .with_file(true)
                .with_line_number(true)
                .with_writer(std::io::stderr)
                .boxed(),
            Self::Pretty => fmt::layer().pretty().with_writer(std::io::stderr).boxed(),
            Self::Compact => fmt::layer().compact().with_writer(std::io::stderr).boxed(),
        }
    }
}

/// JSON 日志，不导出指标
pub fn init() -> Result<()> {
    init_with_config(ObservabilityConfig::default())
}

/// 安装 tracing 订阅器，并按需启动 Prometheus 导出器
///
/// 只能成功调用一次；第二次安装订阅器会返回错误。
pub fn init_with_config(config: ObservabilityConfig) -> Result<()> {
    init_tracing(config.log_format, &config.default_log_level)?;

    if let Some(addr) = config.metrics_addr() {
        install_prometheus(addr)?;
        tracing::info!(%addr, "Prometheus exporter listening");
    }

    tracing::debug!(
        log_format = ?config.log_format,
        metrics = config.metrics_port.is_some(),
        "Observability ready"
    );
    Ok(())
}

fn init_tracing(format: LogFormat, default_level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| {
        EnvFilter::try_new(default_level)
            .with_context(|| format!("Invalid log filter '{default_level}'"))
    })?;

    // 过滤层放在最外层，格式层必须直接叠在 Registry 上
    tracing_subscriber::registry()
        .with(format.layer())
        .with(filter)
        .try_init()
        .context("Tracing subscriber already installed")
}

fn install_prometheus(addr: SocketAddr) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .set_buckets_for_metric(
            Matcher::Full(metrics::names::ASSOCIATION_DISTANCE_PX.to_string()),
            &[1.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0],
        )
        .and_then(|b| {
            b.set_buckets_for_metric(
                Matcher::Full(metrics::names::PROCESSING_LATENCY_MS.to_string()),
                &[0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 25.0],
            )
        })
        .and_then(|b| {
            b.set_buckets_for_metric(
                Matcher::Full(metrics::names::ANGLES_PER_PERSON.to_string()),
                &[1.0, 2.0, 4.0, 8.0, 12.0, 16.0, 20.0, 24.0],
            )
        })
        .context("Invalid histogram buckets")?
        .install()
        .with_context(|| format!("Failed to start Prometheus exporter on {addr}"))?;

    describe_metrics();
    Ok(())
}
