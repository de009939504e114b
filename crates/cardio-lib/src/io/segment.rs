//! Segment documents on disk: one JSON object per slice holding the
//! sample rate, the lead label, and the millivolt samples.

use std::io::{BufReader, BufWriter};
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::signal::Segment;

#[derive(Debug, Serialize, Deserialize)]
struct SegmentDoc {
    fs: f64,
    lead: String,
    samples: Vec<f64>,
}

/// Load and validate one stored segment.
pub fn load_segment(path: &Path) -> Result<Segment> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("opening segment {}", path.display()))?;
    let doc: SegmentDoc = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("parsing segment {}", path.display()))?;
    let segment = Segment::new(doc.samples, doc.fs, doc.lead)
        .with_context(|| format!("invalid segment {}", path.display()))?;
    Ok(segment)
}

pub fn write_segment(path: &Path, segment: &Segment) -> Result<()> {
    let doc = SegmentDoc {
        fs: segment.fs,
        lead: segment.lead.clone(),
        samples: segment.samples.clone(),
    };
    let file = std::fs::File::create(path)
        .with_context(|| format!("creating segment {}", path.display()))?;
    serde_json::to_writer(BufWriter::new(file), &doc)
        .with_context(|| format!("writing segment {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("seg.json");
        let segment = Segment::new(vec![0.1, -0.2, 0.3, 1.1], 360.0, "MLII").unwrap();
        write_segment(&path, &segment).unwrap();
        let loaded = load_segment(&path).unwrap();
        assert_eq!(loaded.samples, segment.samples);
        assert_eq!(loaded.fs, 360.0);
        assert_eq!(loaded.lead, "MLII");
    }

    #[test]
    fn missing_file_reports_path() {
        let err = load_segment(Path::new("/nonexistent/seg.json")).unwrap_err();
        assert!(err.to_string().contains("seg.json"));
    }

    #[test]
    fn invalid_document_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{\"fs\": 0.0, \"lead\": \"II\", \"samples\": [1.0, 2.0]}").unwrap();
        assert!(load_segment(&path).is_err());
        std::fs::write(&path, "not json").unwrap();
        assert!(load_segment(&path).is_err());
    }
}
