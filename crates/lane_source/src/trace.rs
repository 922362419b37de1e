//! Lane trace replay and recording
//!
//! One cycle per line, hexadecimal columns `[header] data sync`. The optional
//! leading header column matches the receiver firmware's `data` dump
//! (`%08x %08x %01x`) and is ignored on replay. `#` starts a comment; blank
//! lines are skipped.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use contracts::{CombinedSample, ContractError, LaneGeometry, LaneSource};
use tracing::{debug, info};

/// Replays a recorded lane trace
#[derive(Debug, Clone)]
pub struct TraceSource {
    geometry: LaneGeometry,
    samples: Vec<CombinedSample>,
    position: usize,
}

impl TraceSource {
    /// Load a trace file
    pub fn open(path: impl AsRef<Path>, geometry: LaneGeometry) -> Result<Self, ContractError> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let source = Self::from_reader(BufReader::new(file), geometry)?;
        info!(
            path = %path.display(),
            cycles = source.len(),
            "lane trace loaded"
        );
        Ok(source)
    }

    /// Parse a trace from any buffered reader
    pub fn from_reader<R: BufRead>(reader: R, geometry: LaneGeometry) -> Result<Self, ContractError> {
        let mut samples = Vec::new();
        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            if let Some(sample) = parse_line(&line, index + 1, &geometry)? {
                samples.push(sample);
            }
        }
        debug!(cycles = samples.len(), "lane trace parsed");
        Ok(Self {
            geometry,
            samples,
            position: 0,
        })
    }

    /// Number of recorded cycles
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Restart replay from the first cycle
    pub fn rewind(&mut self) {
        self.position = 0;
    }
}

impl LaneSource for TraceSource {
    fn geometry(&self) -> LaneGeometry {
        self.geometry
    }

    fn next_sample(&mut self) -> Option<CombinedSample> {
        let sample = self.samples.get(self.position).copied()?;
        self.position += 1;
        Some(sample)
    }
}

fn parse_line(
    line: &str,
    line_no: usize,
    geometry: &LaneGeometry,
) -> Result<Option<CombinedSample>, ContractError> {
    let content = line.split('#').next().unwrap_or("").trim();
    if content.is_empty() {
        return Ok(None);
    }

    let columns: Vec<&str> = content.split_whitespace().collect();
    let (data, sync) = match columns.as_slice() {
        [data, sync] | [_, data, sync] => (*data, *sync),
        _ => {
            return Err(ContractError::trace_parse(
                line_no,
                format!("expected 2 or 3 columns, found {}", columns.len()),
            ))
        }
    };

    let data = parse_hex(data, line_no, "data")?;
    let sync = parse_hex(sync, line_no, "sync")?;

    if data & !geometry.data_mask() != 0 {
        return Err(ContractError::trace_parse(
            line_no,
            format!("data {data:#x} wider than {} bits", geometry.data_width()),
        ));
    }
    let sync = u32::try_from(sync)
        .ok()
        .filter(|s| s & !geometry.sync_mask() == 0)
        .ok_or_else(|| {
            ContractError::trace_parse(
                line_no,
                format!("sync {sync:#x} names more than {} lanes", geometry.num_lanes),
            )
        })?;

    Ok(Some(CombinedSample::new(data, sync)))
}

fn parse_hex(column: &str, line_no: usize, name: &str) -> Result<u64, ContractError> {
    let digits = column
        .strip_prefix("0x")
        .or_else(|| column.strip_prefix("0X"))
        .unwrap_or(column);
    u64::from_str_radix(digits, 16)
        .map_err(|e| ContractError::trace_parse(line_no, format!("bad {name} column '{column}': {e}")))
}

/// Records samples in the format [`TraceSource`] replays
pub struct TraceWriter<W: Write> {
    writer: W,
    data_digits: usize,
    sync_digits: usize,
    written: u64,
}

impl TraceWriter<BufWriter<File>> {
    /// Create (or truncate) a trace file
    pub fn create(path: impl AsRef<Path>, geometry: LaneGeometry) -> Result<Self, ContractError> {
        let file = File::create(path)?;
        Self::new(BufWriter::new(file), geometry)
    }
}

impl<W: Write> TraceWriter<W> {
    pub fn new(mut writer: W, geometry: LaneGeometry) -> Result<Self, ContractError> {
        writeln!(
            writer,
            "# lanes={} lane_width={} columns: data sync",
            geometry.num_lanes, geometry.lane_width
        )?;
        Ok(Self {
            writer,
            data_digits: geometry.data_width().div_ceil(4) as usize,
            sync_digits: geometry.num_lanes.div_ceil(4) as usize,
            written: 0,
        })
    }

    pub fn write_sample(&mut self, sample: &CombinedSample) -> Result<(), ContractError> {
        writeln!(
            self.writer,
            "{:0dw$x} {:0sw$x}",
            sample.data,
            sample.sync,
            dw = self.data_digits,
            sw = self.sync_digits
        )?;
        self.written += 1;
        Ok(())
    }

    /// Drain `source` into the trace, up to `max_cycles` samples
    pub fn record<S: LaneSource + ?Sized>(
        &mut self,
        source: &mut S,
        max_cycles: Option<u64>,
    ) -> Result<u64, ContractError> {
        let start = self.written;
        while max_cycles.is_none_or(|limit| self.written - start < limit) {
            let Some(sample) = source.next_sample() else {
                break;
            };
            self.write_sample(&sample)?;
        }
        Ok(self.written - start)
    }

    /// Samples written so far
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Flush and return the inner writer
    pub fn finish(mut self) -> Result<W, ContractError> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}
