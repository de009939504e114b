//! The segment catalog: a CSV manifest with one row per stored slice.

use std::path::Path;

use anyhow::{Context, Result};
use csv::{ReaderBuilder, Trim, WriterBuilder};
use serde::{Deserialize, Serialize};

/// One catalog row describing an available segment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentEntry {
    pub segment_id: String,
    pub record_id: String,
    pub lead: String,
    pub fs: f64,
    pub start_s: f64,
    pub end_s: f64,
    /// Location of the segment document, relative to the manifest's
    /// own directory unless absolute.
    pub path: String,
}

pub fn read_manifest(path: &Path) -> Result<Vec<SegmentEntry>> {
    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("opening manifest {}", path.display()))?;
    let mut entries = Vec::new();
    for row in reader.deserialize::<SegmentEntry>() {
        let entry = row.with_context(|| format!("parsing manifest row in {}", path.display()))?;
        entries.push(entry);
    }
    Ok(entries)
}

pub fn write_manifest(path: &Path, entries: &[SegmentEntry]) -> Result<()> {
    let mut writer = WriterBuilder::new()
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("creating manifest {}", path.display()))?;
    for entry in entries {
        writer.serialize(entry)?;
    }
    writer.flush()?;
    Ok(())
}

/// Append one row, creating the manifest if it does not exist yet.
pub fn append_entry(path: &Path, entry: &SegmentEntry) -> Result<()> {
    let mut entries = if path.exists() {
        read_manifest(path)?
    } else {
        Vec::new()
    };
    entries.retain(|e| e.segment_id != entry.segment_id);
    entries.push(entry.clone());
    write_manifest(path, &entries)
}

pub fn find_entry<'a>(entries: &'a [SegmentEntry], segment_id: &str) -> Option<&'a SegmentEntry> {
    entries.iter().find(|e| e.segment_id == segment_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn entry(id: &str) -> SegmentEntry {
        SegmentEntry {
            segment_id: id.into(),
            record_id: "100".into(),
            lead: "MLII".into(),
            fs: 360.0,
            start_s: 0.0,
            end_s: 15.0,
            path: format!("slices/{id}.json"),
        }
    }

    #[test]
    fn round_trip_preserves_rows() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("manifest.csv");
        let rows = vec![entry("100_MLII_0_5400"), entry("100_MLII_5400_10800")];
        write_manifest(&path, &rows).unwrap();
        let loaded = read_manifest(&path).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].segment_id, "100_MLII_0_5400");
        assert_eq!(loaded[1].end_s, 15.0);
    }

    #[test]
    fn append_replaces_duplicate_ids() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("manifest.csv");
        append_entry(&path, &entry("a")).unwrap();
        append_entry(&path, &entry("b")).unwrap();
        let mut updated = entry("a");
        updated.end_s = 30.0;
        append_entry(&path, &updated).unwrap();
        let loaded = read_manifest(&path).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(find_entry(&loaded, "a").unwrap().end_s, 30.0);
    }

    #[test]
    fn missing_manifest_is_an_error() {
        let err = read_manifest(Path::new("/nonexistent/manifest.csv")).unwrap_err();
        assert!(err.to_string().contains("manifest.csv"));
    }

    #[test]
    fn lookup_by_id() {
        let rows = vec![entry("x"), entry("y")];
        assert!(find_entry(&rows, "y").is_some());
        assert!(find_entry(&rows, "z").is_none());
    }
}
