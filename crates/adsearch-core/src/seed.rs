//! Master-data loader: gzip-compressed newline-delimited JSON records.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use flate2::read::GzDecoder;
use tracing::{debug, info};

use crate::error::Result;
use crate::types::Record;

#[derive(Debug, Clone, Default)]
pub struct SeedData {
    pub records: Vec<Record>,
    /// Lines that were not valid records and were dropped.
    pub skipped: usize,
}

pub fn load_records(path: &Path) -> Result<SeedData> {
    let file = File::open(path)?;
    let data = read_records(GzDecoder::new(file))?;
    info!(path = %path.display(), loaded = data.records.len(), skipped = data.skipped, "loaded master data");
    Ok(data)
}

/// Decode NDJSON from any (already decompressed) reader. Blank lines are
/// ignored; undecodable lines are counted and skipped.
pub fn read_records<R: Read>(reader: R) -> Result<SeedData> {
    let mut data = SeedData::default();
    for (lineno, line) in BufReader::new(reader).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Record>(&line) {
            Ok(record) => data.records.push(record),
            Err(e) => {
                debug!(line = lineno + 1, error = %e, "skipping undecodable record");
                data.skipped += 1;
            }
        }
    }
    Ok(data)
}
