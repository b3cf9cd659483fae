//! Capcode lookup table
//!
//! A read-only mapping from 7-character zero-padded capcodes to the
//! service metadata published in the national capcode list. Loaded
//! once at startup; there is no update path while running.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Descriptive metadata for one capcode
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapcodeEntry {
    /// Service name (e.g. "Brandweer", "Ambulance")
    pub service_name: String,

    /// Province
    pub province: String,

    /// Safety region
    pub region: String,

    /// Unit name (e.g. "Tankautospuit", "Lifeliner 1")
    pub unit_name: String,
}

/// Read-only capcode table, keyed by 7-character zero-padded capcode
#[derive(Debug, Clone, Default)]
pub struct CapcodeTable {
    entries: HashMap<String, CapcodeEntry>,
}

impl CapcodeTable {
    /// Build a table from pre-keyed entries. Keys are zero-padded to 7
    /// characters.
    pub fn from_entries(entries: impl IntoIterator<Item = (String, CapcodeEntry)>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|(key, entry)| (zero_pad(&key), entry))
                .collect(),
        }
    }

    /// Load the table from a `;`-delimited CSV file.
    ///
    /// Expected columns: capcode, service, province, region, unit.
    /// Rows with fewer than five fields are skipped; a skipped row is
    /// not an error. The resulting table may legitimately be empty.
    pub fn load_csv(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b';')
            .has_headers(false)
            .flexible(true)
            .from_path(path)
            .map_err(|source| Error::Lookup {
                path: path.to_path_buf(),
                source,
            })?;

        let mut entries = HashMap::new();
        let mut skipped = 0usize;

        for row in reader.records() {
            let row = match row {
                Ok(row) => row,
                Err(e) => {
                    tracing::debug!(error = %e, "Skipping unreadable capcode row");
                    skipped += 1;
                    continue;
                }
            };

            if row.len() < 5 {
                skipped += 1;
                continue;
            }

            entries.insert(
                zero_pad(&row[0]),
                CapcodeEntry {
                    service_name: row[1].to_string(),
                    province: row[2].to_string(),
                    region: row[3].to_string(),
                    unit_name: row[4].to_string(),
                },
            );
        }

        tracing::info!(
            path = %path.display(),
            capcodes = entries.len(),
            skipped = skipped,
            "Capcode table loaded"
        );

        Ok(Self { entries })
    }

    /// Look up a canonical (7-character, zero-padded) capcode
    pub fn get(&self, capcode: &str) -> Option<&CapcodeEntry> {
        self.entries.get(capcode)
    }

    /// Number of entries in the table
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn zero_pad(capcode: &str) -> String {
    let trimmed = capcode.trim();
    if trimmed.len() >= 7 {
        trimmed.to_string()
    } else {
        format!("{:0>7}", trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_and_lookup() {
        let file = write_csv(
            "1234567;Brandweer;Noord-Holland;Zaanstreek-Waterland;Tankautospuit\n\
             0700296;Ambulance;Utrecht;Utrecht;RAV dienstauto\n",
        );

        let table = CapcodeTable::load_csv(file.path()).unwrap();
        assert_eq!(table.len(), 2);

        let entry = table.get("1234567").unwrap();
        assert_eq!(entry.service_name, "Brandweer");
        assert_eq!(entry.unit_name, "Tankautospuit");
        assert!(table.get("9999999").is_none());
    }

    #[test]
    fn test_short_key_is_zero_padded() {
        let file = write_csv("700296;Ambulance;Utrecht;Utrecht;RAV dienstauto\n");

        let table = CapcodeTable::load_csv(file.path()).unwrap();
        assert!(table.get("0700296").is_some());
    }

    #[test]
    fn test_short_rows_skipped() {
        let file = write_csv(
            "garbage row\n\
             1234567;Brandweer;NH;Zaanstreek;Tankautospuit\n\
             too;few;fields\n",
        );

        let table = CapcodeTable::load_csv(file.path()).unwrap();
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_quoted_fields() {
        let file = write_csv("1234567;\"Brandweer\";NH;\"Zaanstreek; Waterland\";TS\n");

        let table = CapcodeTable::load_csv(file.path()).unwrap();
        let entry = table.get("1234567").unwrap();
        assert_eq!(entry.region, "Zaanstreek; Waterland");
    }

    #[test]
    fn test_missing_file_is_an_error() {
        // The wiring treats this as a degraded start; the loader itself
        // reports it so the caller can log the path.
        let result = CapcodeTable::load_csv("/nonexistent/capcodes.csv");
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_table_is_valid() {
        let file = write_csv("");
        let table = CapcodeTable::load_csv(file.path()).unwrap();
        assert!(table.is_empty());
    }
}
