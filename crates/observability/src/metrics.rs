//! 会话管道指标
//!
//! `record_*` 函数写入全局 `metrics` 记录器（未安装导出器时为空操作）；
//! [`SessionMetricsAggregator`] 在内存中汇总同样的信息，用于运行结束时的摘要。

use std::collections::BTreeMap;
use std::fmt;

use contracts::FrameRecord;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit};

/// 指标名称
pub mod names {
    pub const DETECTION_FRAMES_RECEIVED: &str = "rom_tracker_detection_frames_received_total";
    pub const FRAMES_OUT_OF_ORDER: &str = "rom_tracker_frames_out_of_order_total";
    pub const FRAMES: &str = "rom_tracker_frames_total";
    pub const LAST_FRAME_ID: &str = "rom_tracker_last_frame_id";
    pub const PEOPLE_IN_FRAME: &str = "rom_tracker_people_in_frame";
    pub const ANGLES_PER_PERSON: &str = "rom_tracker_angles_per_person";
    pub const ANGLES_COMPUTED: &str = "rom_tracker_angles_computed_total";
    pub const ANGLES_SKIPPED: &str = "rom_tracker_angles_skipped_total";
    pub const LIVE_ROM: &str = "rom_tracker_live_rom_degrees";
    pub const IDENTITY_SLOTS: &str = "rom_tracker_identity_slots";
    pub const UNMATCHED_SLOTS: &str = "rom_tracker_unmatched_slots_total";
    pub const ASSOCIATION_DISTANCE_PX: &str = "rom_tracker_association_distance_px";
    pub const FRAMES_DISPATCHED: &str = "rom_tracker_frames_dispatched_total";
    pub const PROCESSING_LATENCY_MS: &str = "rom_tracker_processing_latency_ms";
}

/// 为所有指标注册说明和单位（导出器安装后调用）
pub fn describe_metrics() {
    describe_counter!(names::DETECTION_FRAMES_RECEIVED, "Detection frames handed to a session");
    describe_counter!(names::FRAMES_OUT_OF_ORDER, "Frames rejected for a non-increasing timestamp");
    describe_counter!(names::FRAMES, "Frame records produced by sessions");
    describe_gauge!(names::LAST_FRAME_ID, "Frame id of the latest record per session");
    describe_gauge!(names::PEOPLE_IN_FRAME, "People in the latest record per session");
    describe_histogram!(names::ANGLES_PER_PERSON, "Angles measured per person and frame");
    describe_counter!(names::ANGLES_COMPUTED, "Angle values computed");
    describe_counter!(names::ANGLES_SKIPPED, "Requested angles that could not be computed");
    describe_gauge!(names::LIVE_ROM, "Range of motion so far per session and angle, degrees");
    describe_gauge!(names::IDENTITY_SLOTS, "Identity slots tracked by the associator");
    describe_counter!(names::UNMATCHED_SLOTS, "Identity slots left without a detection");
    describe_histogram!(names::ASSOCIATION_DISTANCE_PX, "Mean keypoint distance of accepted matches, pixels");
    describe_counter!(names::FRAMES_DISPATCHED, "Frame records offered to sinks by outcome");
    describe_histogram!(names::PROCESSING_LATENCY_MS, Unit::Milliseconds, "Time to turn a detection frame into a record");
}

/// 一帧会话输出的指标
pub fn record_frame_metrics(record: &FrameRecord) {
    let source = record.source_id.clone();
    counter!(names::FRAMES, "source_id" => source.clone()).increment(1);
    gauge!(names::LAST_FRAME_ID, "source_id" => source.clone()).set(record.frame_id as f64);
    gauge!(names::PEOPLE_IN_FRAME, "source_id" => source.clone()).set(record.people.len() as f64);

    let mut computed = 0u64;
    for person in &record.people {
        computed += person.angles.len() as u64;
        histogram!(names::ANGLES_PER_PERSON).record(person.angles.len() as f64);
    }
    counter!(names::ANGLES_COMPUTED).increment(computed);

    // 只导出身份槽 0，避免标签组合随人数膨胀
    if let Some(first) = record.person(0) {
        for (angle, range) in &first.live_rom {
            gauge!(names::LIVE_ROM, "source_id" => source.clone(), "angle" => angle.clone())
                .set(range.rom());
        }
    }
}

pub fn record_frame_received(source_id: &str) {
    counter!(names::DETECTION_FRAMES_RECEIVED, "source_id" => source_id.to_string()).increment(1);
}

/// `reason`: unknown_angle / missing_landmark / degenerate_geometry
pub fn record_angle_skipped(angle: &str, reason: &'static str) {
    counter!(names::ANGLES_SKIPPED, "angle" => angle.to_string(), "reason" => reason).increment(1);
}

/// 一次跨帧身份关联的结果
pub fn record_association(slots: usize, unmatched: usize, distances: &[f64]) {
    gauge!(names::IDENTITY_SLOTS).set(slots as f64);
    if unmatched > 0 {
        counter!(names::UNMATCHED_SLOTS).increment(unmatched as u64);
    }
    let histogram = histogram!(names::ASSOCIATION_DISTANCE_PX);
    for distance in distances.iter().copied().filter(|d| d.is_finite()) {
        histogram.record(distance);
    }
}

pub fn record_out_of_order(source_id: &str) {
    counter!(names::FRAMES_OUT_OF_ORDER, "source_id" => source_id.to_string()).increment(1);
}

pub fn record_frame_dispatched(sink_name: &str, success: bool) {
    let status = if success { "written" } else { "lost" };
    counter!(names::FRAMES_DISPATCHED, "sink" => sink_name.to_string(), "status" => status)
        .increment(1);
}

pub fn record_processing_latency_ms(latency_ms: f64) {
    histogram!(names::PROCESSING_LATENCY_MS).record(latency_ms);
}

/// 运行期间在内存中累计的会话统计
#[derive(Debug, Clone, Default)]
pub struct SessionMetricsAggregator {
    pub total_frames: u64,
    pub frames_without_people: u64,
    /// 同一帧中出现的最多人数
    pub max_people: usize,
    pub people_stats: RunningStats,
    pub angles_per_person: RunningStats,
    /// 每个角度被计算出的次数
    pub angle_counts: BTreeMap<String, u64>,
    /// 每个会话身份槽 0 的当前 ROM
    pub latest_rom: BTreeMap<String, BTreeMap<String, f64>>,
}

impl SessionMetricsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, record: &FrameRecord) {
        self.total_frames += 1;
        self.people_stats.push(record.people.len() as f64);
        self.max_people = self.max_people.max(record.people.len());
        if record.people.is_empty() {
            self.frames_without_people += 1;
        }

        for person in &record.people {
            self.angles_per_person.push(person.angles.len() as f64);
            for name in person.angles.names() {
                *self.angle_counts.entry(name.to_string()).or_default() += 1;
            }
        }

        if let Some(first) = record.person(0) {
            let session = self.latest_rom.entry(record.source_id.clone()).or_default();
            for (angle, range) in &first.live_rom {
                session.insert(angle.clone(), range.rom());
            }
        }
    }

    pub fn summary(&self) -> MetricsSummary {
        let empty_rate = if self.total_frames == 0 {
            0.0
        } else {
            100.0 * self.frames_without_people as f64 / self.total_frames as f64
        };
        MetricsSummary {
            total_frames: self.total_frames,
            frames_without_people: self.frames_without_people,
            empty_rate,
            max_people: self.max_people,
            people_per_frame: StatsSummary::from(&self.people_stats),
            angles_per_person: StatsSummary::from(&self.angles_per_person),
            angle_counts: self.angle_counts.clone(),
            latest_rom: self.latest_rom.clone(),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub total_frames: u64,
    pub frames_without_people: u64,
    /// 百分比
    pub empty_rate: f64,
    pub max_people: usize,
    pub people_per_frame: StatsSummary,
    pub angles_per_person: StatsSummary,
    pub angle_counts: BTreeMap<String, u64>,
    pub latest_rom: BTreeMap<String, BTreeMap<String, f64>>,
}

impl fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Session Metrics ===")?;
        writeln!(f, "Frames: {}", self.total_frames)?;
        writeln!(
            f,
            "Frames without people: {} ({:.2}%)",
            self.frames_without_people, self.empty_rate
        )?;
        writeln!(f, "People per frame: {} (max {})", self.people_per_frame, self.max_people)?;
        writeln!(f, "Angles per person: {}", self.angles_per_person)?;

        for (source, roms) in &self.latest_rom {
            if roms.is_empty() {
                continue;
            }
            writeln!(f, "ROM so far, {source} person 0:")?;
            for (angle, rom) in roms {
                let n = self.angle_counts.get(angle).copied().unwrap_or(0);
                writeln!(f, "  {angle}: {rom:.1} deg (n={n})")?;
            }
        }
        Ok(())
    }
}

/// [`RunningStats`] 的快照
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count(),
            min: stats.min(),
            max: stats.max(),
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.count == 0 {
            return write!(f, "N/A");
        }
        write!(
            f,
            "mean={:.3} std={:.3} range=[{:.3}, {:.3}] n={}",
            self.mean, self.std_dev, self.min, self.max, self.count
        )
    }
}

/// 单遍均值/方差/极值（Welford）
///
/// 空集合的所有统计量均为 0。
#[derive(Debug, Clone, Copy, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    sum_sq: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        if self.count == 0 {
            *self = Self {
                count: 1,
                mean: value,
                sum_sq: 0.0,
                min: value,
                max: value,
            };
            return;
        }
        self.count += 1;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        let before = value - self.mean;
        self.mean += before / self.count as f64;
        self.sum_sq += before * (value - self.mean);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// 样本方差（n - 1），少于两个值时为 0
    pub fn variance(&self) -> f64 {
        match self.count {
            0 | 1 => 0.0,
            n => self.sum_sq / (n - 1) as f64,
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}

impl FromIterator<f64> for RunningStats {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        iter.into_iter().fold(Self::default(), |mut stats, v| {
            stats.push(v);
            stats
        })
    }
}
