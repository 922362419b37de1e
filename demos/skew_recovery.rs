//! Skew Recovery Demo
//!
//! Feeds a skewed synthetic frame through the receiver and prints the captured
//! packet head and an ANSI preview of the decimated frame.
//!
//! Run with: cargo run -p demos --bin skew_recovery [receiver.toml]

use config_loader::ConfigLoader;
use contracts::{ReceiverBlueprint, SourceConfig, SyntheticSourceConfig};
use csi_rx::Receiver;
use readout::{hex_dump, BayerPreview};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let blueprint = if let Some(path) = std::env::args().nth(1) {
        tracing::info!(path = %path, "Loading receiver config");
        ConfigLoader::load_from_path(std::path::Path::new(&path))?
    } else {
        default_blueprint()
    };

    let mut source = lane_source::source_from_blueprint(&blueprint)?;
    let mut receiver = Receiver::new(blueprint.receiver.clone())?;
    let cycles = receiver.run(source.as_mut(), None)?;

    let stats = receiver.stats();
    tracing::info!(
        cycles,
        pointers = ?receiver.aligner().pointers(),
        realignments = stats.realignments,
        frame_starts = stats.frame_starts,
        pixels_written = stats.pixels_written,
        "Source drained"
    );

    let snapshot = receiver.snapshot();
    println!("Packet head:");
    print!("{}", hex_dump(&snapshot.packet[..snapshot.packet.len().min(8)], snapshot.data_width));

    println!("\nPreview:");
    print!("{}", BayerPreview::from_frame(&snapshot.frame).to_ansi());

    Ok(())
}

/// Four lanes, each delayed differently, depth large enough to repair them
fn default_blueprint() -> ReceiverBlueprint {
    let mut blueprint = ReceiverBlueprint {
        source: SourceConfig::Synthetic(SyntheticSourceConfig {
            lane_skews: vec![2, 0, 1, 3],
            ..Default::default()
        }),
        ..Default::default()
    };
    blueprint.receiver.aligner.depth = 5;
    blueprint
}
