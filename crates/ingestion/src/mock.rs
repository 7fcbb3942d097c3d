//! Mock 检测源
//!
//! 合成受试者做躯干前屈运动，用于无视频/无检测器环境的测试。

use std::f64::consts::PI;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use contracts::{
    BodyModel, ContractError, DetectionCallback, DetectionFrame, DetectionSource, Keypoint,
    PersonKeypoints, Point2, PoseDetections,
};
use tracing::{debug, trace};

/// 受试者之间的水平间距 (像素)
const SUBJECT_SPACING: f64 = 300.0;
/// 髋部中心高度 (像素)
const HIP_Y: f64 = 200.0;
const SCORE: f64 = 0.9;

/// 站立姿态 (相对髋部中心), 以及是否随躯干旋转
const SKELETON: &[(&str, f64, f64, bool)] = &[
    ("Head", 0.0, -160.0, true),
    ("Nose", 0.0, -140.0, true),
    ("LShoulder", 20.0, -100.0, true),
    ("RShoulder", -20.0, -100.0, true),
    ("LElbow", 22.0, -50.0, true),
    ("RElbow", -22.0, -50.0, true),
    ("LWrist", 22.0, 0.0, true),
    ("RWrist", -22.0, 0.0, true),
    ("LHip", 10.0, 0.0, false),
    ("RHip", -10.0, 0.0, false),
    ("LKnee", 10.0, 100.0, false),
    ("RKnee", -10.0, 100.0, false),
    ("LAnkle", 10.0, 200.0, false),
    ("RAnkle", -10.0, 200.0, false),
    ("LBigToe", 30.0, 210.0, false),
    ("RBigToe", 10.0, 210.0, false),
    ("LSmallToe", 25.0, 210.0, false),
    ("RSmallToe", 5.0, 210.0, false),
    ("LHeel", 5.0, 210.0, false),
    ("RHeel", -15.0, 210.0, false),
];

/// Mock 检测源配置
#[derive(Debug, Clone)]
pub struct MockSubjectConfig {
    /// 数据源 ID
    pub source_id: String,

    /// 输出布局所用的身体模型
    pub model_type: String,

    /// 帧率 (Hz)
    pub fps: f64,

    /// 时长 (秒)，None 表示直到 stop
    pub duration: Option<f64>,

    /// 受试者人数
    pub people: usize,

    /// 最大前屈角 (度)
    pub amplitude_deg: f64,

    /// 一次屈伸的周期 (秒)
    pub period_s: f64,

    /// 是否按帧率实时发送
    pub realtime: bool,
}

impl Default for MockSubjectConfig {
    fn default() -> Self {
        Self {
            source_id: "mock_subject".to_string(),
            model_type: "HALPE_26".to_string(),
            fps: 30.0,
            duration: Some(10.0),
            people: 1,
            amplitude_deg: 60.0,
            period_s: 4.0,
            realtime: true,
        }
    }
}

/// Mock 检测源
///
/// 时间戳确定：`frame_id / fps`。
pub struct MockSubjectSource {
    config: MockSubjectConfig,
    model: &'static BodyModel,
    listening: Arc<AtomicBool>,
    exhausted: Arc<AtomicBool>,
}

impl MockSubjectSource {
    /// 创建新的 Mock 检测源
    ///
    /// # Errors
    /// 未知的身体模型
    pub fn new(config: MockSubjectConfig) -> Result<Self, ContractError> {
        let model = BodyModel::from_name(&config.model_type)?;
        Ok(Self {
            config,
            model,
            listening: Arc::new(AtomicBool::new(false)),
            exhausted: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn config(&self) -> &MockSubjectConfig {
        &self.config
    }

    /// 总帧数 (无时长限制时为 None)
    pub fn total_frames(&self) -> Option<u64> {
        self.config
            .duration
            .map(|d| (d * self.config.fps).round().max(0.0) as u64)
    }

    /// 某时刻的躯干前屈角 (度)
    pub fn lean_at(&self, time: f64) -> f64 {
        let phase = 2.0 * PI * time / self.config.period_s;
        self.config.amplitude_deg * (1.0 - phase.cos()) / 2.0
    }

    /// 生成第 `frame_id` 帧
    pub fn frame_at(&self, frame_id: u64) -> DetectionFrame {
        let timestamp = frame_id as f64 / self.config.fps;
        let lean = self.lean_at(timestamp).to_radians();
        let people = (0..self.config.people)
            .map(|i| self.subject(100.0 + i as f64 * SUBJECT_SPACING, lean))
            .collect();
        DetectionFrame::new(
            self.config.source_id.clone(),
            frame_id,
            timestamp,
            PoseDetections::new(people),
        )
    }

    fn subject(&self, center_x: f64, lean: f64) -> PersonKeypoints {
        let (sin, cos) = lean.sin_cos();
        let place = |dx: f64, dy: f64, rotate: bool| {
            let (dx, dy) = if rotate {
                (dx * cos - dy * sin, dx * sin + dy * cos)
            } else {
                (dx, dy)
            };
            Point2::new(center_x + dx, HIP_Y + dy)
        };

        let mut raw = vec![None; self.model.detector_width()];
        let mut put = |name: &str, point: Point2| {
            if let Some(idx) = self.model.index_of(name) {
                raw[idx] = Some(Keypoint::new(point.x, point.y, SCORE));
            }
        };

        for (name, dx, dy, rotate) in SKELETON {
            put(name, place(*dx, *dy, *rotate));
        }
        // detector-provided composites
        put("Neck", place(0.0, -100.0, true));
        put("Hip", place(0.0, 0.0, false));

        PersonKeypoints::new(raw)
    }
}

impl DetectionSource for MockSubjectSource {
    fn source_id(&self) -> &str {
        &self.config.source_id
    }

    fn listen(&self, callback: DetectionCallback) {
        if self.listening.swap(true, Ordering::SeqCst) {
            return;
        }

        let generator = MockSubjectSource {
            config: self.config.clone(),
            model: self.model,
            listening: self.listening.clone(),
            exhausted: self.exhausted.clone(),
        };

        std::thread::spawn(move || {
            let total = generator.total_frames();
            let interval = Duration::from_secs_f64(1.0 / generator.config.fps);

            debug!(
                source_id = %generator.config.source_id,
                fps = generator.config.fps,
                total_frames = ?total,
                "mock subject source started"
            );

            let mut frame_id = 0u64;
            let mut finished = false;
            while generator.listening.load(Ordering::Relaxed) {
                if total.is_some_and(|t| frame_id >= t) {
                    finished = true;
                    break;
                }
                callback(generator.frame_at(frame_id));
                trace!(source_id = %generator.config.source_id, frame_id, "mock frame emitted");
                frame_id += 1;

                if generator.config.realtime {
                    std::thread::sleep(interval);
                }
            }

            generator.listening.store(false, Ordering::SeqCst);
            if finished {
                generator.exhausted.store(true, Ordering::SeqCst);
            }
            debug!(source_id = %generator.config.source_id, frames = frame_id, "mock subject source stopped");
        });
    }

    fn stop(&self) {
        self.listening.store(false, Ordering::SeqCst);
    }

    fn is_listening(&self) -> bool {
        self.listening.load(Ordering::Relaxed)
    }

    fn is_exhausted(&self) -> bool {
        self.exhausted.load(Ordering::Relaxed)
    }
}
