//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约快照测试 (录制文件格式、角度文件格式)
//! - 模拟 e2e 测试（无需视频或检测器）
//! - 多人身份关联的跨 crate 验证

#[cfg(test)]
mod contract_tests {
    use contracts::{DetectionFrame, TimeSeries};

    #[test]
    fn test_recording_line_snapshot() {
        // 录制文件的一行：检测器原始输出 + 帧元数据
        let line = r#"{"source_id":"clip","frame_id":7,"timestamp":0.28,"keypoints":[[[10.0,20.0],null]],"scores":[[0.8,null]]}"#;
        let frame: DetectionFrame = serde_json::from_str(line).unwrap();
        assert_eq!(frame.frame_id, 7);
        assert_eq!(frame.detections.people[0].defined_count(), 1);

        let back = serde_json::to_string(&frame).unwrap();
        let again: DetectionFrame = serde_json::from_str(&back).unwrap();
        assert_eq!(frame, again);
    }

    #[test]
    fn test_angle_file_header_snapshot() {
        let mut series = TimeSeries::new(vec!["left knee".into(), "trunk".into()]);
        series.push_row(0.0, vec![Some(170.0), None]).unwrap();

        let mut buf = Vec::new();
        rom_analysis::write_mot(&series, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "Coordinates");
        assert_eq!(lines[1], "version=1");
        assert_eq!(lines[2], "nRows=1");
        assert_eq!(lines[3], "nColumns=3");
        assert_eq!(lines[4], "inDegrees=yes");
        assert_eq!(lines[9], "endheader");
        assert_eq!(lines[10], "time\tleft knee\ttrunk");
        assert!(lines[11].ends_with("\tNaN"));
    }

    #[test]
    fn test_shipped_config_loads() {
        let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../../rom.toml");
        let config = config_loader::ConfigLoader::load_from_path(&path).unwrap();
        assert_eq!(config.sinks.len(), 2);
        assert_eq!(config.sinks[0].params["flush_interval_secs"], "5");
        assert!(config
            .session
            .angle_names()
            .contains(&config.rom.reference_angle));
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::collections::HashMap;
    use std::path::Path;
    use std::time::Duration;

    use contracts::{
        AppConfig, DetectionFrame, FrameRecord, PersonSelection, RomOptions, SessionConfig,
        SinkConfig, SinkType,
    };
    use dispatcher::{create_dispatcher, RomSummaryFile};
    use ingestion::{
        write_recording, IngestionPipeline, MockSubjectConfig, MockSubjectSource, ReplaySource,
    };
    use session_engine::SessionEngine;
    use tokio::sync::mpsc;

    fn file_sink(dir: &Path) -> SinkConfig {
        SinkConfig {
            name: "angles".to_string(),
            sink_type: SinkType::File,
            queue_capacity: 1024,
            params: HashMap::from([
                ("base_path".to_string(), dir.display().to_string()),
                ("reference_angle".to_string(), "trunk".to_string()),
            ]),
        }
    }

    fn log_sink(name: &str) -> SinkConfig {
        SinkConfig {
            name: name.to_string(),
            sink_type: SinkType::Log,
            queue_capacity: 50,
            params: HashMap::new(),
        }
    }

    fn mock_source(id: &str, people: usize, seconds: f64) -> MockSubjectSource {
        MockSubjectSource::new(MockSubjectConfig {
            source_id: id.to_string(),
            fps: 20.0,
            duration: Some(seconds),
            people,
            realtime: false,
            ..Default::default()
        })
        .unwrap()
    }

    /// Drain an ingestion pipeline into per-source engines
    async fn drive(
        mut ingestion: IngestionPipeline,
        session: &SessionConfig,
        tx: mpsc::Sender<FrameRecord>,
    ) -> HashMap<String, SessionEngine> {
        let rx = ingestion.take_receiver().unwrap();
        ingestion.start_all();

        let mut engines: HashMap<String, SessionEngine> = HashMap::new();
        loop {
            match tokio::time::timeout(Duration::from_millis(50), rx.recv()).await {
                Ok(Ok(frame)) => {
                    let engine = engines
                        .entry(frame.source_id.clone())
                        .or_insert_with(|| SessionEngine::new(&frame.source_id, session).unwrap());
                    if let Ok(record) = engine.push(frame) {
                        tx.send(record).await.unwrap();
                    }
                }
                Ok(Err(_)) => break,
                Err(_) => {
                    if ingestion.all_exhausted() && rx.is_empty() {
                        break;
                    }
                }
            }
        }
        engines
    }

    /// End-to-end test: MockSubjectSource -> SessionEngine -> Dispatcher -> angle files
    ///
    /// 验证完整的数据流：
    /// 1. MockSubjectSource 生成躯干前屈 (0..60°) 的关键点
    /// 2. SessionEngine 逐帧计算角度
    /// 3. AngleFileSink 写出角度文件和 ROM 摘要
    /// 4. 读回角度文件，离线汇总得到相同的 ROM
    #[tokio::test]
    async fn test_e2e_mock_pipeline() {
        let dir = tempfile::tempdir().unwrap();
        let session = SessionConfig::default();

        let mut ingestion = IngestionPipeline::new(64);
        ingestion
            .register_source(Box::new(mock_source("subject", 1, 4.0)), None)
            .unwrap();

        let (tx, rx) = mpsc::channel::<FrameRecord>(100);
        let sinks = vec![file_sink(dir.path()), log_sink("console")];
        let dispatcher = create_dispatcher(sinks, &RomOptions::default(), rx).unwrap();
        let dispatcher_handle = dispatcher.spawn();

        let engines = drive(ingestion, &session, tx).await;
        let metrics = tokio::time::timeout(Duration::from_secs(10), dispatcher_handle)
            .await
            .expect("dispatcher timed out")
            .unwrap();

        assert_eq!(engines["subject"].frame_count(), 80);
        assert!(metrics.iter().all(|(_, m)| m.write_count == 80));

        let series =
            rom_analysis::read_mot_file(dir.path().join("subject_angles_person00.mot")).unwrap();
        assert_eq!(series.len(), 80);
        assert!(series.column_index("trunk").is_some());
        assert!(series.column_index("right knee").is_some());

        let analysis = rom_analysis::summarize(&series);
        let trunk = analysis.rom_analysis["trunk"].rom.unwrap();
        assert!((trunk - 60.0).abs() < 1.0, "trunk rom {trunk}");
        assert!((analysis.summary.duration - 3.95).abs() < 1e-9);

        let text =
            std::fs::read_to_string(dir.path().join("subject_person00_rom.json")).unwrap();
        let summary: RomSummaryFile = serde_json::from_str(&text).unwrap();
        assert_eq!(summary.analysis, analysis);
        assert_eq!(summary.running_rom.len(), 80);
        let last = summary.running_rom.last().unwrap();
        assert!(last.rom > 50.0 && last.rom <= 60.0 + 1e-6, "running rom {}", last.rom);
    }

    /// 两人交换检测顺序时，身份槽保持稳定
    #[tokio::test]
    async fn test_e2e_replay_keeps_identities() {
        let dir = tempfile::tempdir().unwrap();
        let generator = mock_source("generator", 2, 1.0);

        let frames: Vec<DetectionFrame> = (0..20)
            .map(|i| {
                let mut frame = generator.frame_at(i);
                if i % 2 == 1 {
                    frame.detections.people.reverse();
                }
                frame
            })
            .collect();
        let path = dir.path().join("pair.jsonl");
        write_recording(&frames, std::fs::File::create(&path).unwrap()).unwrap();

        let session = SessionConfig {
            person_selection: PersonSelection::All,
            ..Default::default()
        };
        let mut ingestion = IngestionPipeline::new(8);
        ingestion
            .register_source(Box::new(ReplaySource::from_path(&path)), None)
            .unwrap();

        let (tx, mut rx) = mpsc::channel::<FrameRecord>(64);
        let engines = drive(ingestion, &session, tx).await;
        assert_eq!(engines["pair"].frame_count(), 20);

        let mut records = Vec::new();
        while let Some(record) = rx.recv().await {
            records.push(record);
        }
        assert_eq!(records.len(), 20);

        // 槽 0 始终是左侧受试者 (髋部 x ≈ 100)
        for record in &records {
            assert_eq!(record.people.len(), 2);
            let hip_x = record.person(0).unwrap().keypoints["Hip"].position.x;
            assert!((hip_x - 100.0).abs() < 1e-6, "frame {}: {hip_x}", record.frame_id);
        }
    }

    /// 时间戳不前进的帧被拒绝，会话继续
    #[tokio::test]
    async fn test_e2e_out_of_order_frames_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let generator = mock_source("generator", 1, 1.0);
        let mut frames: Vec<DetectionFrame> = (0..10).map(|i| generator.frame_at(i)).collect();
        frames.insert(5, generator.frame_at(2));
        let path = dir.path().join("stutter.jsonl");
        write_recording(&frames, std::fs::File::create(&path).unwrap()).unwrap();

        let mut ingestion = IngestionPipeline::new(16);
        ingestion
            .register_source(Box::new(ReplaySource::from_path(&path)), None)
            .unwrap();
        let (tx, _rx) = mpsc::channel::<FrameRecord>(64);
        let engines = drive(ingestion, &SessionConfig::default(), tx).await;

        let engine = &engines["stutter"];
        assert_eq!(engine.frame_count(), 10);
        assert_eq!(engine.rejected_count(), 1);
        assert_eq!(engine.time_series(0).unwrap().unwrap().len(), 10);
    }

    /// 配置文件 -> Dispatcher
    #[tokio::test]
    async fn test_config_drives_dispatcher() {
        let dir = tempfile::tempdir().unwrap();
        let content = format!(
            r#"
[session]
model_type = "COCO_17"
joint_angles = ["right knee"]
segment_angles = ["trunk"]

[[sinks]]
name = "angles"
sink_type = "file"
[sinks.params]
base_path = "{}"
write_summary = "false"
"#,
            dir.path().display().to_string().replace('\\', "/")
        );
        let app: AppConfig =
            config_loader::ConfigLoader::load_from_str(&content, config_loader::ConfigFormat::Toml)
                .unwrap();

        let mut ingestion = IngestionPipeline::new(16);
        ingestion
            .register_source(
                Box::new(
                    MockSubjectSource::new(MockSubjectConfig {
                        source_id: "coco".into(),
                        model_type: app.session.model_type.clone(),
                        fps: 10.0,
                        duration: Some(1.0),
                        realtime: false,
                        ..Default::default()
                    })
                    .unwrap(),
                ),
                None,
            )
            .unwrap();

        let (tx, rx) = mpsc::channel::<FrameRecord>(32);
        let handle = create_dispatcher(app.sinks.clone(), &app.rom, rx).unwrap().spawn();
        drive(ingestion, &app.session, tx).await;
        handle.await.unwrap();

        let series =
            rom_analysis::read_mot_file(dir.path().join("coco_angles_person00.mot")).unwrap();
        assert_eq!(series.angle_names(), ["right knee".to_string(), "trunk".to_string()]);
        // COCO_17 has no Neck/Hip: trunk comes from synthesized landmarks
        assert!(series.column("trunk").unwrap().iter().all(|p| p.value.is_some()));
        assert!(!dir.path().join("coco_person00_rom.json").exists());
    }

    /// [rom] 配置决定 ROM 摘要的测试名、参考角度和窗口
    #[tokio::test]
    async fn test_rom_section_reaches_file_sink() {
        let dir = tempfile::tempdir().unwrap();
        let content = format!(
            r#"
[session]
model_type = "COCO_17"
joint_angles = ["right knee"]
segment_angles = ["trunk"]

[rom]
test_name = "knee test"
time_window = 2.0
reference_angle = "right knee"

[[sinks]]
name = "angles"
sink_type = "file"
[sinks.params]
base_path = "{}"
"#,
            dir.path().display().to_string().replace('\\', "/")
        );
        let app: AppConfig =
            config_loader::ConfigLoader::load_from_str(&content, config_loader::ConfigFormat::Toml)
                .unwrap();
        assert_eq!(app.rom.time_window, 2.0);

        let mut ingestion = IngestionPipeline::new(16);
        ingestion
            .register_source(
                Box::new(
                    MockSubjectSource::new(MockSubjectConfig {
                        source_id: "coco".into(),
                        model_type: app.session.model_type.clone(),
                        fps: 10.0,
                        duration: Some(1.0),
                        realtime: false,
                        ..Default::default()
                    })
                    .unwrap(),
                ),
                None,
            )
            .unwrap();

        let (tx, rx) = mpsc::channel::<FrameRecord>(32);
        let handle = create_dispatcher(app.sinks.clone(), &app.rom, rx).unwrap().spawn();
        drive(ingestion, &app.session, tx).await;
        handle.await.unwrap();

        let series =
            rom_analysis::read_mot_file(dir.path().join("coco_angles_person00.mot")).unwrap();
        let text = std::fs::read_to_string(dir.path().join("coco_person00_rom.json")).unwrap();
        let summary: RomSummaryFile = serde_json::from_str(&text).unwrap();
        assert_eq!(summary.test, "knee test");
        assert_eq!(summary.reference_angle, "right knee");
        let expected = rom_analysis::running_rom(&series, 2.0, "right knee");
        assert_eq!(summary.running_rom.len(), expected.len());
        for (got, want) in summary.running_rom.iter().zip(&expected) {
            assert!(
                (got.rom - want.rom).abs() < 1e-9,
                "t={}: {} vs {}",
                got.time,
                got.rom,
                want.rom
            );
        }
    }

    /// Test dispatcher with multiple sink types
    #[tokio::test]
    async fn test_dispatcher_multiple_sinks() {
        let (tx, rx) = mpsc::channel::<FrameRecord>(10);
        let sinks = vec![log_sink("log1"), log_sink("log2")];
        let dispatcher = create_dispatcher(sinks, &RomOptions::default(), rx).unwrap();

        // Check metrics before running
        let metrics = dispatcher.metrics();
        assert_eq!(metrics.len(), 2);

        let handle = dispatcher.spawn();

        for i in 0..5 {
            let record = FrameRecord {
                source_id: "cam".into(),
                frame_id: i,
                timestamp: i as f64 * 0.1,
                people: Vec::new(),
            };
            tx.send(record).await.unwrap();
        }
        drop(tx);

        let metrics = tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(metrics.iter().all(|(_, m)| m.write_count == 5));
    }

    /// Session metrics aggregate across records
    #[test]
    fn test_session_metrics_from_engine() {
        let generator = mock_source("agg", 1, 1.0);
        let mut engine = SessionEngine::new("agg", &SessionConfig::default()).unwrap();
        let mut aggregator = observability::SessionMetricsAggregator::new();
        for i in 0..20 {
            let record = engine.push(generator.frame_at(i)).unwrap();
            aggregator.update(&record);
        }
        let summary = aggregator.summary();
        assert_eq!(summary.total_frames, 20);
        assert_eq!(summary.frames_without_people, 0);
        assert!(summary.latest_rom["agg"].contains_key("trunk"));
        assert_eq!(summary.max_people, 1);
    }
}
