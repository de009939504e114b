//! R-peak detection and the heart-rate figures derived from it.
//!
//! The pipeline band-limits the signal to the QRS band, tracks the
//! slope energy through a moving-window envelope, and picks peaks with
//! an adaptive dual-envelope threshold. A kurtosis gate ahead of the
//! threshold stage rejects signals with no impulsive content (flat
//! lines, pure sinusoids) so malformed input degrades to an empty
//! result instead of fabricating beats.

use serde::{Deserialize, Serialize};

use crate::conditioning::{highpass_once, lowpass_once};
use crate::signal::{Peaks, RRSeries, Segment};

/// Tunable stages of the detection pipeline.
#[derive(Debug, Clone, Copy)]
pub struct DetectorConfig {
    /// Lower edge of the QRS pass band (Hz).
    pub band_low_hz: f64,
    /// Upper edge of the QRS pass band (Hz).
    pub band_high_hz: f64,
    /// Moving-window integration length (seconds).
    pub integration_s: f64,
    /// Minimum distance between accepted beats (seconds).
    pub refractory_s: f64,
    /// Scale between the noise and signal envelopes for the threshold.
    pub threshold_scale: f64,
    /// How far back to search for the waveform maximum after a trigger.
    pub search_back_s: f64,
    /// Minimum kurtosis of the band-limited signal; anything flatter is
    /// treated as containing no beats at all.
    pub min_kurtosis: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            band_low_hz: 5.0,
            band_high_hz: 15.0,
            integration_s: 0.150,
            refractory_s: 0.200,
            threshold_scale: 0.5,
            search_back_s: 0.150,
            min_kurtosis: 3.5,
        }
    }
}

/// Everything the display layer needs about one segment's beats.
/// Fewer than two peaks is a valid "insufficient data" outcome, not an
/// error: `rr` and `hr` are empty and `hr_avg` is `None`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Detection {
    pub r_idx: Peaks,
    /// Seconds between consecutive peaks.
    pub rr: Vec<f64>,
    /// Beats per minute over each interval in `rr`.
    pub hr: Vec<f64>,
    /// Median of `hr`, absent without at least one interval.
    pub hr_avg: Option<f64>,
}

impl Detection {
    pub fn from_peaks(r_idx: Peaks, fs: f64) -> Self {
        let rr = RRSeries::from_peaks(&r_idx, fs).rr;
        let hr: Vec<f64> = rr.iter().map(|&s| 60.0 / s).collect();
        let hr_avg = median(&hr);
        Self {
            r_idx,
            rr,
            hr,
            hr_avg,
        }
    }
}

/// Run detection with the default configuration.
pub fn detect(segment: &Segment) -> Detection {
    detect_with_config(segment, &DetectorConfig::default())
}

/// Pure function of its inputs: the same segment always yields the
/// same peaks.
pub fn detect_with_config(segment: &Segment, cfg: &DetectorConfig) -> Detection {
    let peaks = find_r_peaks(&segment.samples, segment.fs, cfg);
    Detection::from_peaks(peaks, segment.fs)
}

fn find_r_peaks(samples: &[f64], fs: f64, cfg: &DetectorConfig) -> Peaks {
    if samples.is_empty() {
        return Peaks::default();
    }

    let filtered = band_limit(samples, fs, cfg.band_low_hz, cfg.band_high_hz);
    if kurtosis(&filtered) < cfg.min_kurtosis {
        return Peaks::default();
    }

    let win = ((cfg.integration_s * fs).round() as usize).max(1);
    let envelope = moving_mean(&slope_energy(&filtered), win);

    let mut found = threshold_pass(&filtered, &envelope, fs, cfg);
    if found.len() < 2 {
        found = local_maxima(samples, fs, cfg.refractory_s);
    }
    found.sort_unstable();
    found.dedup();
    Peaks::from_indices(found)
}

fn band_limit(data: &[f64], fs: f64, low: f64, high: f64) -> Vec<f64> {
    let mut out = if low > 0.0 {
        highpass_once(data, fs, low)
    } else {
        data.to_vec()
    };
    if high > 0.0 && high < fs * 0.5 {
        out = lowpass_once(&out, fs, high);
    }
    out
}

fn slope_energy(data: &[f64]) -> Vec<f64> {
    let mut out = vec![0.0; data.len()];
    for i in 1..data.len() {
        let d = data[i] - data[i - 1];
        out[i] = d * d;
    }
    out
}

fn moving_mean(data: &[f64], win: usize) -> Vec<f64> {
    if data.is_empty() || win <= 1 {
        return data.to_vec();
    }
    let mut out = Vec::with_capacity(data.len());
    let mut acc = 0.0;
    for (i, &sample) in data.iter().enumerate() {
        acc += sample;
        if i >= win {
            acc -= data[i - win];
        }
        out.push(acc / win as f64);
    }
    out
}

fn kurtosis(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let n = data.len() as f64;
    let mean = data.iter().sum::<f64>() / n;
    let m2 = data.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
    if m2 <= f64::EPSILON {
        return 0.0;
    }
    let m4 = data.iter().map(|x| (x - mean).powi(4)).sum::<f64>() / n;
    m4 / (m2 * m2)
}

fn threshold_pass(filtered: &[f64], envelope: &[f64], fs: f64, cfg: &DetectorConfig) -> Vec<usize> {
    if filtered.is_empty() || envelope.is_empty() {
        return Vec::new();
    }

    let refractory = ((cfg.refractory_s * fs).round() as usize).max(1);
    let search = ((cfg.search_back_s * fs).round() as usize).max(1);

    // Seed both running envelopes from the first second of signal.
    let lead_in = envelope.len().min((fs as usize).max(1));
    let seed = envelope[..lead_in].iter().sum::<f64>() / lead_in as f64;
    let mut signal_level = seed;
    let mut noise_level = 0.5 * seed;

    let mut peaks = Vec::new();
    let mut last_trigger = 0usize;
    for (i, &e) in envelope.iter().enumerate() {
        let threshold =
            noise_level + cfg.threshold_scale * (signal_level - noise_level).max(0.0);
        let clear = peaks.is_empty() || i - last_trigger >= refractory;
        if e >= threshold && clear {
            peaks.push(argmax_back(filtered, i, search));
            last_trigger = i;
            signal_level = 0.125 * e + 0.875 * signal_level;
        } else {
            noise_level = 0.125 * e + 0.875 * noise_level;
        }
    }
    peaks
}

fn argmax_back(data: &[f64], at: usize, span: usize) -> usize {
    let start = at.saturating_sub(span);
    let end = at.min(data.len().saturating_sub(1));
    let mut best = start;
    for j in start..=end {
        if data[j] > data[best] {
            best = j;
        }
    }
    best
}

/// Naive fallback: strict local maxima above a moving baseline, spaced
/// at least one refractory period apart.
fn local_maxima(samples: &[f64], fs: f64, min_gap_s: f64) -> Vec<usize> {
    if samples.len() < 3 {
        return Vec::new();
    }
    let gap = ((min_gap_s * fs).round() as usize).max(1);
    let baseline = moving_mean(samples, ((0.150 * fs) as usize).max(1));
    let mut peaks = Vec::new();
    let mut last = 0usize;
    for i in 1..samples.len() - 1 {
        let y = samples[i] - baseline[i];
        if y > 0.0
            && y > samples[i - 1] - baseline[i - 1]
            && y > samples[i + 1] - baseline[i + 1]
            && (peaks.is_empty() || i - last >= gap)
        {
            peaks.push(i);
            last = i;
        }
    }
    peaks
}

fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    Some(if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth::{beat_times, synthetic_segment, SynthConfig};

    fn clean_train(fs: f64, duration_s: f64, bpm: f64) -> (Segment, usize) {
        let cfg = SynthConfig {
            fs,
            duration_s,
            heart_rate_bpm: bpm,
            noise_mv: 0.0,
            ..SynthConfig::default()
        };
        let expected = beat_times(&cfg).len();
        (synthetic_segment(&cfg).unwrap(), expected)
    }

    #[test]
    fn detects_regular_beats() {
        let (seg, expected) = clean_train(250.0, 10.0, 75.0);
        let mut cfg = DetectorConfig::default();
        cfg.refractory_s = 0.3;
        let result = detect_with_config(&seg, &cfg);
        assert_eq!(result.r_idx.len(), expected);
        assert_eq!(result.rr.len(), expected - 1);
        let hr_avg = result.hr_avg.expect("median available");
        assert!((hr_avg - 75.0).abs() < 2.0, "median {hr_avg} bpm");
    }

    #[test]
    fn detection_is_idempotent() {
        let (seg, _) = clean_train(250.0, 10.0, 80.0);
        let first = detect(&seg);
        let second = detect(&seg);
        assert_eq!(first.r_idx, second.r_idx);
    }

    #[test]
    fn flat_line_yields_no_beats() {
        let seg = Segment::new(vec![0.0; 5000], 500.0, "II").unwrap();
        let result = detect(&seg);
        assert!(result.r_idx.is_empty());
        assert!(result.rr.is_empty());
        assert!(result.hr.is_empty());
        assert_eq!(result.hr_avg, None);
    }

    #[test]
    fn sinusoid_yields_no_beats() {
        let fs = 500.0;
        let samples: Vec<f64> = (0..(15.0 * fs) as usize)
            .map(|i| (std::f64::consts::TAU * i as f64 / fs).sin())
            .collect();
        let seg = Segment::new(samples, fs, "II").unwrap();
        let result = detect(&seg);
        assert!(result.r_idx.is_empty());
        assert_eq!(result.hr_avg, None);
    }

    #[test]
    fn derived_metrics_for_even_peaks() {
        let detection = Detection::from_peaks(Peaks::from_indices(vec![100, 600, 1100]), 500.0);
        assert_eq!(detection.rr, vec![1.0, 1.0]);
        assert_eq!(detection.hr, vec![60.0, 60.0]);
        assert_eq!(detection.hr_avg, Some(60.0));
    }

    #[test]
    fn single_peak_is_insufficient_data() {
        let detection = Detection::from_peaks(Peaks::from_indices(vec![42]), 500.0);
        assert_eq!(detection.r_idx.len(), 1);
        assert!(detection.rr.is_empty());
        assert_eq!(detection.hr_avg, None);
    }

    #[test]
    fn median_of_even_and_odd_counts() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 2.0, 3.0]), Some(2.5));
        assert_eq!(median(&[]), None);
    }

    #[test]
    fn peaks_stay_in_bounds_and_increasing() {
        let (seg, _) = clean_train(360.0, 12.0, 100.0);
        let result = detect(&seg);
        let idx = &result.r_idx.indices;
        assert!(idx.windows(2).all(|w| w[0] < w[1]));
        assert!(idx.iter().all(|&i| i < seg.len()));
    }
}
