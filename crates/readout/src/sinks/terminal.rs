//! TerminalSink - prints the colour preview with ANSI escapes

use std::io::{self, Stdout, Write};

use contracts::{CaptureSnapshot, ContractError, SnapshotSink};
use tracing::{debug, instrument};

use crate::render::BayerPreview;

/// Sink that draws each snapshot's preview to a terminal
pub struct TerminalSink<W = Stdout> {
    name: String,
    out: W,
}

impl TerminalSink<Stdout> {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_writer(name, io::stdout())
    }
}

impl<W: Write + Send> TerminalSink<W> {
    pub fn with_writer(name: impl Into<String>, out: W) -> Self {
        Self {
            name: name.into(),
            out,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn draw(&mut self, snapshot: &CaptureSnapshot) -> io::Result<()> {
        let preview = BayerPreview::from_frame(&snapshot.frame);
        writeln!(
            self.out,
            "snapshot {} @ cycle {} ({}x{})",
            snapshot.sequence,
            snapshot.cycle,
            preview.width(),
            preview.height()
        )?;
        self.out.write_all(preview.to_ansi().as_bytes())
    }
}

impl<W: Write + Send> SnapshotSink for TerminalSink<W> {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "terminal_sink_write",
        skip(self, snapshot),
        fields(sink = %self.name, sequence = snapshot.sequence)
    )]
    async fn write(&mut self, snapshot: &CaptureSnapshot) -> Result<(), ContractError> {
        self.draw(snapshot)
            .map_err(|e| ContractError::sink_write(&self.name, e.to_string()))
    }

    async fn flush(&mut self) -> Result<(), ContractError> {
        self.out
            .flush()
            .map_err(|e| ContractError::sink_write(&self.name, e.to_string()))
    }

    async fn close(&mut self) -> Result<(), ContractError> {
        debug!(sink = %self.name, "TerminalSink closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::tests::snapshot;

    #[tokio::test]
    async fn test_terminal_sink_draws_preview() {
        let mut sink = TerminalSink::with_writer("term", Vec::new());
        sink.write(&snapshot(3)).await.unwrap();
        sink.flush().await.unwrap();

        let text = String::from_utf8(sink.into_inner()).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("snapshot 3 @ cycle 300 (2x1)"));
        // (0x1122, 0x5566) -> r 0x22, g 0x11, b 0x55
        assert_eq!(
            lines.next(),
            Some("\x1b[48;2;34;17;85m \x1b[48;2;68;51;119m \x1b[0m")
        );
    }
}
