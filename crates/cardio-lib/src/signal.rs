use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// One fixed-duration excerpt of a recording: millivolt samples at a
/// uniform rate from a single lead. Read-only once constructed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segment {
    /// Uniform sampling frequency in Hz.
    pub fs: f64,
    /// Electrode-pair label the excerpt was recorded from.
    pub lead: String,
    /// Voltage samples in millivolts.
    pub samples: Vec<f64>,
}

impl Segment {
    pub fn new(samples: Vec<f64>, fs: f64, lead: impl Into<String>) -> Result<Self, ConfigError> {
        if samples.len() < 2 {
            return Err(ConfigError::ShortSignal {
                min: 2,
                got: samples.len(),
            });
        }
        if !(fs > 0.0 && fs.is_finite()) {
            return Err(ConfigError::NonPositiveRate(fs));
        }
        Ok(Self {
            fs,
            lead: lead.into(),
            samples,
        })
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_s(&self) -> f64 {
        self.samples.len() as f64 / self.fs
    }
}

/// Detected R-peak positions as sample indices, strictly increasing.
/// Sub-ranges are borrowed for display, never mutated in place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Peaks {
    pub indices: Vec<usize>,
}

impl Peaks {
    pub fn from_indices(indices: Vec<usize>) -> Self {
        Self { indices }
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Peaks whose absolute position falls in `[start, end)`.
    pub fn in_window(&self, start: usize, end: usize) -> &[usize] {
        let lo = self.indices.partition_point(|&i| i < start);
        let hi = self.indices.partition_point(|&i| i < end);
        &self.indices[lo..hi]
    }
}

/// RR intervals in seconds between consecutive peaks. A degenerate
/// zero-length interval contributes no element.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RRSeries {
    pub rr: Vec<f64>,
}

impl RRSeries {
    pub fn from_peaks(peaks: &Peaks, fs: f64) -> Self {
        let mut rr = Vec::new();
        for w in peaks.indices.windows(2) {
            if w[1] > w[0] {
                rr.push((w[1] - w[0]) as f64 / fs);
            }
        }
        Self { rr }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segment_rejects_short_signal() {
        assert!(matches!(
            Segment::new(vec![0.1], 250.0, "II"),
            Err(ConfigError::ShortSignal { got: 1, .. })
        ));
    }

    #[test]
    fn segment_rejects_bad_rate() {
        assert!(matches!(
            Segment::new(vec![0.0; 10], 0.0, "II"),
            Err(ConfigError::NonPositiveRate(_))
        ));
        assert!(matches!(
            Segment::new(vec![0.0; 10], f64::NAN, "II"),
            Err(ConfigError::NonPositiveRate(_))
        ));
    }

    #[test]
    fn segment_duration() {
        let seg = Segment::new(vec![0.0; 500], 250.0, "V1").unwrap();
        assert!((seg.duration_s() - 2.0).abs() < 1e-12);
        assert_eq!(seg.lead, "V1");
    }

    #[test]
    fn rr_from_evenly_spaced_peaks() {
        let peaks = Peaks::from_indices(vec![100, 600, 1100]);
        let rr = RRSeries::from_peaks(&peaks, 500.0);
        assert_eq!(rr.rr, vec![1.0, 1.0]);
    }

    #[test]
    fn rr_skips_degenerate_interval() {
        let peaks = Peaks::from_indices(vec![100, 100, 600]);
        let rr = RRSeries::from_peaks(&peaks, 500.0);
        assert_eq!(rr.rr, vec![1.0]);
    }

    #[test]
    fn window_slicing_is_half_open() {
        let peaks = Peaks::from_indices(vec![10, 950, 1050, 1099, 1100]);
        assert_eq!(peaks.in_window(1000, 1100), &[1050, 1099]);
        assert_eq!(peaks.in_window(0, 11), &[10]);
        assert!(peaks.in_window(200, 900).is_empty());
    }
}
