//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约快照测试
//! - 偏斜 lane -> 对齐 -> 捕获的端到端验证
//! - 配置 -> 接收 -> 分发 -> 文件输出

#[cfg(test)]
mod contract_tests {
    use config_loader::{ConfigFormat, ConfigLoader};

    #[test]
    fn test_contracts_compile() {
        let _ = contracts::ConfigVersion::V1;
    }

    /// The shipped demo config must stay loadable
    #[test]
    fn test_demo_config_loads() {
        let content = include_str!("../../../demos/receiver.toml");
        let blueprint = ConfigLoader::load_from_str(content, ConfigFormat::Toml).unwrap();
        assert_eq!(blueprint.receiver.aligner.depth, 5);
        assert_eq!(blueprint.lane_skews(), vec![2, 0, 1, 3]);
        assert_eq!(blueprint.sinks.len(), 2);
        assert!(config_loader::collect_warnings(&blueprint).is_empty());
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::collections::HashMap;

    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{
        AlignerConfig, ImageCaptureConfig, LaneGeometry, LaneSource, PacketCaptureConfig,
        ReceiverConfig, SinkConfig, SinkType, SyntheticSourceConfig,
    };
    use csi_rx::Receiver;
    use lane_source::{payload_word, FrameGenerator, SkewedLanes, TraceSource, TraceWriter};
    use observability::ReceiverMetricsAggregator;
    use readout::{create_dispatcher, BayerPreview};
    use tokio::sync::mpsc;

    const SKEWS: [usize; 4] = [1, 0, 2, 1];

    fn receiver_config() -> ReceiverConfig {
        ReceiverConfig {
            aligner: AlignerConfig {
                lane_width: 8,
                num_lanes: 4,
                depth: 4,
            },
            packet: PacketCaptureConfig { depth: 8 },
            // 20 words / 5 = 4 columns, 27 lines / 9 = 3 rows
            image: ImageCaptureConfig {
                subsample_x: 5,
                subsample_y: 9,
                out_width: 4,
                out_height: 3,
            },
        }
    }

    fn synthetic(frames: u32) -> SyntheticSourceConfig {
        SyntheticSourceConfig {
            frames,
            lines: 27,
            line_words: 20,
            blanking_words: 2,
            idle_words: 6,
            lane_skews: SKEWS.to_vec(),
        }
    }

    fn skewed_source(frames: u32) -> SkewedLanes<FrameGenerator> {
        let generator = FrameGenerator::new(LaneGeometry::default(), synthetic(frames));
        SkewedLanes::new(generator, SKEWS.to_vec(), 2).unwrap()
    }

    fn assert_frame_holds_decimated_payload(frame: &[u16]) {
        for y in 0..3u32 {
            for x in 0..4u32 {
                let expected = payload_word(0, y * 9, x * 5) as u16;
                assert_eq!(
                    frame[(y * 4 + x) as usize],
                    expected,
                    "pixel ({x}, {y})"
                );
            }
        }
    }

    /// Skewed lanes -> WordAligner -> both captures
    ///
    /// 验证完整的数据流：
    /// 1. FrameGenerator 生成已对齐帧，SkewedLanes 施加偏斜
    /// 2. WordAligner 在第一个 frame start 上恢复对齐
    /// 3. PacketCapture 捕获每个突发的头部，ImageCapture 写入抽样像素
    #[test]
    fn test_skewed_frame_is_recovered_into_both_buffers() {
        let mut source = skewed_source(1);
        let mut receiver = Receiver::new(receiver_config()).unwrap();
        receiver.check_source(&source).unwrap();

        // Step up to the first RAW10 header, then through 8 payload words
        while receiver.stats().pixel_bursts == 0 {
            let sample = source.next_sample().unwrap();
            receiver.step(sample);
        }
        for _ in 0..8 {
            let sample = source.next_sample().unwrap();
            receiver.step(sample);
        }
        let head: Vec<u64> = (0..8).map(|w| payload_word(0, 0, w)).collect();
        assert_eq!(receiver.packet_capture().buffer(), head.as_slice());

        receiver.run(&mut source, None).unwrap();

        let stats = receiver.stats();
        assert_eq!(stats.frame_starts, 1);
        assert_eq!(stats.pixel_bursts, 27);
        assert_eq!(stats.pixels_written, 12);
        assert_frame_holds_decimated_payload(receiver.image_capture().frame());
        // The least delayed lane reads the oldest slot
        assert_eq!(&receiver.aligner().pointers()[..4], &[2, 3, 1, 2]);
    }

    /// Pointers stay committed across frames; the second frame overwrites
    /// the first in place
    #[test]
    fn test_alignment_persists_across_frames() {
        let mut source = skewed_source(3);
        let mut receiver = Receiver::new(receiver_config()).unwrap();
        receiver.run(&mut source, None).unwrap();

        let stats = receiver.stats();
        assert_eq!(stats.frame_starts, 3);
        assert_eq!(stats.pixel_bursts, 81);
        assert_eq!(stats.pixels_written, 36);
        assert_frame_holds_decimated_payload(receiver.image_capture().frame());
    }

    /// Record a skewed stream, replay it, and get the same buffers
    #[test]
    fn test_trace_replay_matches_live_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lanes.trace");

        let mut writer = TraceWriter::create(&path, LaneGeometry::default()).unwrap();
        let recorded = writer.record(&mut skewed_source(1), None).unwrap();
        writer.finish().unwrap();

        let mut live = Receiver::new(receiver_config()).unwrap();
        live.run(&mut skewed_source(1), None).unwrap();

        let mut replay_source = TraceSource::open(&path, LaneGeometry::default()).unwrap();
        assert_eq!(replay_source.len() as u64, recorded);
        let mut replay = Receiver::new(receiver_config()).unwrap();
        replay.run(&mut replay_source, None).unwrap();

        let live_snapshot = live.snapshot();
        let replay_snapshot = replay.snapshot();
        assert_eq!(live_snapshot.packet, replay_snapshot.packet);
        assert_eq!(live_snapshot.frame, replay_snapshot.frame);
        assert_eq!(live_snapshot.stats, replay_snapshot.stats);
    }

    /// Geometry mismatch between source and receiver is refused
    #[test]
    fn test_mismatched_source_is_refused() {
        let mut receiver = Receiver::new(receiver_config()).unwrap();
        let mut source = FrameGenerator::new(LaneGeometry::new(8, 2), synthetic(1));
        assert!(receiver.run(&mut source, Some(10)).is_err());
        assert_eq!(receiver.cycle(), 0);
    }

    /// Config -> source -> receiver -> dispatcher -> FileSink
    #[tokio::test]
    async fn test_config_to_file_sink() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("captures");
        let toml = format!(
            r#"
[receiver.aligner]
depth = 4

[receiver.packet]
depth = 8

[receiver.image]
subsample_x = 5
subsample_y = 9
out_width = 4
out_height = 4

[source]
kind = "synthetic"
lines = 36
line_words = 20
blanking_words = 2
idle_words = 6
lane_skews = [1, 0, 2, 1]

[[sinks]]
name = "files"
sink_type = "file"
params = {{ base_path = '{}' }}
"#,
            out.display()
        );

        let blueprint = ConfigLoader::load_from_str(&toml, ConfigFormat::Toml).unwrap();
        let mut source = lane_source::source_from_blueprint(&blueprint).unwrap();
        let mut receiver = Receiver::new(blueprint.receiver.clone()).unwrap();
        receiver.run(source.as_mut(), None).unwrap();
        let snapshot = receiver.snapshot();

        let mut aggregator = ReceiverMetricsAggregator::new();
        aggregator.update(&snapshot);
        assert_eq!(aggregator.summary().pixels_written, 16);

        let (tx, rx) = mpsc::channel(4);
        let handle = create_dispatcher(blueprint.sinks.clone(), rx)
            .unwrap()
            .spawn();
        tx.send(snapshot.clone()).await.unwrap();
        drop(tx);

        let report = tokio::time::timeout(std::time::Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(report[0].1.written, 1);

        let snapshot_dir = out.join("000000");
        let hex = std::fs::read_to_string(snapshot_dir.join("packet.hex")).unwrap();
        assert_eq!(hex.lines().count(), 8);

        let stats: serde_json::Value = serde_json::from_str(
            &std::fs::read_to_string(snapshot_dir.join("stats.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(stats["stats"]["pixels_written"], 16);

        // 4 x 4 frame buffer -> 4 x 2 preview
        let preview = BayerPreview::from_frame(&snapshot.frame);
        assert_eq!((preview.width(), preview.height()), (4, 2));
        assert!(snapshot_dir.join("preview.png").exists());
    }

    /// Two sinks of different types receive every snapshot
    #[tokio::test]
    async fn test_dispatcher_multiple_sinks() {
        let (tx, rx) = mpsc::channel(10);

        let sink_configs = vec![
            SinkConfig {
                name: "log1".to_string(),
                sink_type: SinkType::Log,
                queue_capacity: 50,
                params: HashMap::new(),
            },
            SinkConfig {
                name: "log2".to_string(),
                sink_type: SinkType::Log,
                queue_capacity: 50,
                params: HashMap::new(),
            },
        ];

        let dispatcher = create_dispatcher(sink_configs, rx).unwrap();
        assert_eq!(dispatcher.metrics().len(), 2);
        let handle = dispatcher.spawn();

        let mut receiver = Receiver::new(receiver_config()).unwrap();
        let mut source = skewed_source(1);
        while receiver.run(&mut source, Some(200)).unwrap() > 0 {
            tx.send(receiver.snapshot()).await.unwrap();
        }
        let sent = receiver.snapshot().sequence;
        drop(tx);

        let report = tokio::time::timeout(std::time::Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
        for (_, metrics) in report {
            assert_eq!(metrics.written, sent);
            assert_eq!(metrics.last_sequence, Some(sent - 1));
        }
    }
}
