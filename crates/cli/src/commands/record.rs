//! `record` command implementation.

use anyhow::{Context, Result};
use lane_source::TraceWriter;
use tracing::info;

use crate::cli::RecordArgs;
use crate::error::ensure_config_exists;

/// Execute the `record` command
///
/// Writes the configured source, skew included, as a replayable lane trace.
pub fn run_record(args: &RecordArgs) -> Result<()> {
    ensure_config_exists(&args.config)?;

    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    let mut source =
        lane_source::source_from_blueprint(&blueprint).context("Failed to build lane source")?;
    let mut writer = TraceWriter::create(&args.output, source.geometry())
        .with_context(|| format!("Failed to create {}", args.output.display()))?;

    let limit = (args.max_cycles > 0).then_some(args.max_cycles);
    let written = writer
        .record(source.as_mut(), limit)
        .context("Failed to write trace")?;
    writer.finish().context("Failed to flush trace")?;

    info!(samples = written, output = %args.output.display(), "Trace recorded");
    println!("Recorded {} samples to {}", written, args.output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::LaneGeometry;
    use lane_source::TraceSource;

    #[test]
    fn test_record_then_replay() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("receiver.toml");
        std::fs::write(
            &config,
            "[source]\nkind = \"synthetic\"\nlines = 2\nline_words = 3\nblanking_words = 1\nidle_words = 4\n",
        )
        .unwrap();
        let output = dir.path().join("lanes.trace");

        run_record(&RecordArgs {
            config,
            output: output.clone(),
            max_cycles: 0,
        })
        .unwrap();

        let trace = TraceSource::open(&output, LaneGeometry::default()).unwrap();
        assert_eq!(trace.len(), 17);
    }
}
