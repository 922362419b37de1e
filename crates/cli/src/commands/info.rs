//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::{ReceiverBlueprint, SourceConfig};
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;
use crate::error::ensure_config_exists;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    geometry: GeometryInfo,
    aligner: AlignerInfo,
    packet_capture: PacketInfo,
    image_capture: ImageInfo,
    source: SourceInfo,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    sinks: Vec<SinkInfo>,
}

#[derive(Serialize)]
struct GeometryInfo {
    num_lanes: u32,
    lane_width: u32,
    data_width: u32,
}

#[derive(Serialize)]
struct AlignerInfo {
    depth: usize,
    max_skew: usize,
    /// Cycles from a source word to its aligned output
    latency_cycles: usize,
}

#[derive(Serialize)]
struct PacketInfo {
    depth: usize,
    buffer_bytes: usize,
}

#[derive(Serialize)]
struct ImageInfo {
    subsample_x: u32,
    subsample_y: u32,
    out_width: u32,
    out_height: u32,
    buffer_bytes: usize,
    preview_width: u32,
    preview_height: u32,
}

#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum SourceInfo {
    Synthetic {
        frames: u32,
        cycles_per_frame: u64,
        lane_skews: Vec<usize>,
    },
    Trace {
        path: String,
    },
}

#[derive(Serialize)]
struct SinkInfo {
    name: String,
    sink_type: String,
    queue_capacity: usize,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    ensure_config_exists(&args.config)?;

    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    let info = build_config_info(&blueprint);
    if args.json {
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&info);
    }

    Ok(())
}

fn build_config_info(blueprint: &ReceiverBlueprint) -> ConfigInfo {
    let rx = &blueprint.receiver;
    let geometry = rx.aligner.geometry();
    let skews = blueprint.lane_skews();
    let min_skew = skews.iter().copied().min().unwrap_or(0);

    let source = match &blueprint.source {
        SourceConfig::Synthetic(s) => SourceInfo::Synthetic {
            frames: s.frames,
            cycles_per_frame: s.cycles_per_frame(),
            lane_skews: skews,
        },
        SourceConfig::Trace(t) => SourceInfo::Trace {
            path: t.path.display().to_string(),
        },
    };

    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        geometry: GeometryInfo {
            num_lanes: geometry.num_lanes,
            lane_width: geometry.lane_width,
            data_width: geometry.data_width(),
        },
        aligner: AlignerInfo {
            depth: rx.aligner.depth,
            max_skew: rx.aligner.max_skew(),
            latency_cycles: rx.aligner.depth + min_skew,
        },
        packet_capture: PacketInfo {
            depth: rx.packet.depth,
            buffer_bytes: rx.packet.depth * (geometry.data_width() as usize).div_ceil(8),
        },
        image_capture: ImageInfo {
            subsample_x: rx.image.subsample_x,
            subsample_y: rx.image.subsample_y,
            out_width: rx.image.out_width,
            out_height: rx.image.out_height,
            buffer_bytes: rx.image.frame_len() * 2,
            preview_width: rx.image.out_width,
            preview_height: rx.image.out_height / 2,
        },
        source,
        sinks: blueprint
            .sinks
            .iter()
            .map(|s| SinkInfo {
                name: s.name.clone(),
                sink_type: format!("{:?}", s.sink_type),
                queue_capacity: s.queue_capacity,
            })
            .collect(),
    }
}

fn print_config_info(info: &ConfigInfo) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                  CSI-RX Receiver Configuration               ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    let g = &info.geometry;
    println!("🔌 Lanes");
    println!("   ├─ Version: {}", info.version);
    println!("   ├─ Lanes: {} x {} bits", g.num_lanes, g.lane_width);
    println!("   └─ Word width: {} bits", g.data_width);

    let a = &info.aligner;
    println!("\n🔀 Word Aligner");
    println!("   ├─ Depth: {}", a.depth);
    println!("   ├─ Max repairable skew: {} cycles", a.max_skew);
    println!("   └─ Latency: {} cycles", a.latency_cycles);

    let p = &info.packet_capture;
    println!("\n📦 Packet Capture");
    println!("   └─ Depth: {} words ({} bytes)", p.depth, p.buffer_bytes);

    let i = &info.image_capture;
    println!("\n🖼  Image Capture");
    println!("   ├─ Decimation: 1/{} x 1/{}", i.subsample_x, i.subsample_y);
    println!(
        "   ├─ Frame buffer: {}x{} ({} bytes)",
        i.out_width, i.out_height, i.buffer_bytes
    );
    println!("   └─ Preview: {}x{}", i.preview_width, i.preview_height);

    println!("\n📡 Source");
    match &info.source {
        SourceInfo::Synthetic {
            frames,
            cycles_per_frame,
            lane_skews,
        } => {
            println!("   ├─ Synthetic: {} frame(s)", frames);
            println!("   ├─ Cycles per frame: {}", cycles_per_frame);
            println!("   └─ Lane skews: {:?}", lane_skews);
        }
        SourceInfo::Trace { path } => println!("   └─ Trace: {}", path),
    }

    if !info.sinks.is_empty() {
        println!("\n📤 Sinks ({})", info.sinks.len());
        for (i, sink) in info.sinks.iter().enumerate() {
            let prefix = if i == info.sinks.len() - 1 {
                "└─"
            } else {
                "├─"
            };
            println!(
                "   {} {} ({}, queue {})",
                prefix, sink.name, sink.sink_type, sink.queue_capacity
            );
        }
    }

    println!();
}
