use crate::error::Result;
use crate::journal::OptionOrderRecord;
use csv::{Reader, Writer};
use std::collections::HashSet;
use std::fs::{self, File};
use std::path::Path;
use tracing::debug;

pub struct CsvStorage;

impl CsvStorage {
    /// Writes journal rows, replacing the file.
    ///
    /// Rows are sorted by `order_created_at` (ascending).
    ///
    /// # Errors
    /// Returns error if file cannot be created or writing fails
    pub fn write_orders(path: &Path, records: &[OptionOrderRecord]) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut writer = Writer::from_writer(File::create(path)?);

        let mut sorted = records.to_vec();
        sorted.sort_by(|a, b| a.order_created_at.cmp(&b.order_created_at));

        for record in &sorted {
            writer.serialize(record)?;
        }

        writer.flush()?;
        debug!(path = %path.display(), rows = sorted.len(), "Wrote journal");
        Ok(())
    }

    /// Reads journal rows. A missing file is an empty journal.
    ///
    /// # Errors
    /// Returns error if the file cannot be parsed
    pub fn read_orders(path: &Path) -> Result<Vec<OptionOrderRecord>> {
        if !path.exists() {
            return Ok(Vec::new());
        }
        let mut reader = Reader::from_path(path)?;
        let records = reader
            .deserialize()
            .collect::<std::result::Result<Vec<OptionOrderRecord>, _>>()?;
        Ok(records)
    }

    /// Adds rows not already in the journal. Returns how many were added.
    ///
    /// # Errors
    /// Returns error if the existing file cannot be read or the new file
    /// cannot be written
    pub fn append_orders(path: &Path, records: &[OptionOrderRecord]) -> Result<usize> {
        let mut existing = Self::read_orders(path)?;
        let mut seen: HashSet<_> = existing.iter().map(OptionOrderRecord::key).collect();

        let before = existing.len();
        for record in records {
            if seen.insert(record.key()) {
                existing.push(record.clone());
            }
        }
        let added = existing.len() - before;

        if added > 0 {
            Self::write_orders(path, &existing)?;
        }
        Ok(added)
    }
}
