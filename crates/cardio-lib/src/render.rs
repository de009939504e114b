//! Renderable model of a waveform view: the sample trace, the clinical
//! paper ruling, and one marker per annotated beat. Backends (PNG,
//! terminal charts) consume this model; they never re-derive RR or HR
//! themselves. The static segment view and the streaming sweep build
//! their figures through the same two constructors.

use serde::{Deserialize, Serialize};

use crate::annotate::{annotate, BeatAnnotation, BeatClass};
use crate::playback::Frame;
use crate::signal::{Peaks, Segment};

/// Clinical ECG paper ruling: large squares every 0.2 s / 0.5 mV,
/// small squares every 0.04 s / 0.1 mV.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GridSpec {
    pub major_t_s: f64,
    pub minor_t_s: f64,
    pub major_mv: f64,
    pub minor_mv: f64,
}

impl Default for GridSpec {
    fn default() -> Self {
        Self {
            major_t_s: 0.2,
            minor_t_s: 0.04,
            major_mv: 0.5,
            minor_mv: 0.1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn is_transparent(&self) -> bool {
        self.a == 0
    }
}

/// Marker color per rate class. An unclassified beat is fully
/// transparent rather than merely undrawn, so hover surfaces can still
/// expose it.
pub fn class_color(class: BeatClass) -> Rgba {
    match class {
        BeatClass::Low => Rgba::new(0, 64, 255, 255),
        BeatClass::Normal => Rgba::new(0, 160, 64, 255),
        BeatClass::High => Rgba::new(224, 32, 32, 255),
        BeatClass::Unclassified => Rgba::new(0, 0, 0, 0),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BeatMarker {
    /// Seconds from the start of the rendered window.
    pub t_s: f64,
    /// Waveform value at the peak, millivolts.
    pub mv: f64,
    pub annotation: BeatAnnotation,
    pub color: Rgba,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EcgFigure {
    /// Waveform as (seconds, millivolts) pairs.
    pub points: Vec<[f64; 2]>,
    pub markers: Vec<BeatMarker>,
    pub grid: GridSpec,
    pub y_min: f64,
    pub y_max: f64,
    pub lead: Option<String>,
}

/// Static view over a whole stored segment.
pub fn figure_from_segment(segment: &Segment, peaks: &Peaks) -> EcgFigure {
    build_figure(&segment.samples, segment.fs, peaks, Some(segment.lead.clone()))
}

/// One sweep frame; peak indices are already buffer-relative.
pub fn figure_from_frame(frame: &Frame, fs: f64) -> EcgFigure {
    let peaks = Peaks::from_indices(frame.peaks.clone());
    build_figure(&frame.samples, fs, &peaks, None)
}

fn build_figure(samples: &[f64], fs: f64, peaks: &Peaks, lead: Option<String>) -> EcgFigure {
    let points: Vec<[f64; 2]> = samples
        .iter()
        .enumerate()
        .map(|(i, &v)| [i as f64 / fs, v])
        .collect();

    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    let mut peak_abs = 0.0_f64;
    for &v in samples {
        lo = lo.min(v);
        hi = hi.max(v);
        peak_abs = peak_abs.max(v.abs());
    }
    if samples.is_empty() {
        lo = 0.0;
        hi = 0.0;
    }
    let pad = 0.2 + 0.1 * peak_abs;

    let annotations = annotate(peaks, fs);
    let markers = peaks
        .indices
        .iter()
        .zip(annotations)
        .filter_map(|(&idx, annotation)| {
            samples.get(idx).map(|&mv| BeatMarker {
                t_s: idx as f64 / fs,
                mv,
                color: class_color(annotation.class),
                annotation,
            })
        })
        .collect();

    EcgFigure {
        points,
        markers,
        grid: GridSpec::default(),
        y_min: lo - pad,
        y_max: hi + pad,
        lead,
    }
}

/// Thin out a point series for constrained backends, keeping one point
/// per bucket.
pub fn decimate(points: &[[f64; 2]], max_points: usize) -> Vec<[f64; 2]> {
    if max_points == 0 || points.len() <= max_points {
        return points.to_vec();
    }
    let bucket = points.len() as f64 / max_points as f64;
    (0..max_points)
        .filter_map(|i| points.get((i as f64 * bucket).floor() as usize).copied())
        .collect()
}

/// Anything that can draw a figure: a PNG rasterizer, a terminal chart.
pub trait PlotBackend {
    fn draw(&mut self, figure: &EcgFigure) -> anyhow::Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::{Playback, PlaybackConfig};

    fn sample_segment() -> Segment {
        let samples: Vec<f64> = (0..1000).map(|i| (i as f64 * 0.02).sin() * 0.8).collect();
        Segment::new(samples, 100.0, "II").unwrap()
    }

    #[test]
    fn figure_covers_every_sample_and_peak() {
        let seg = sample_segment();
        let peaks = Peaks::from_indices(vec![100, 500, 900]);
        let fig = figure_from_segment(&seg, &peaks);
        assert_eq!(fig.points.len(), seg.len());
        assert_eq!(fig.markers.len(), 3);
        assert_eq!(fig.lead.as_deref(), Some("II"));
        assert!((fig.points[100][0] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn padding_rule_sets_y_range() {
        let seg = Segment::new(vec![-1.0, 0.0, 2.0, 0.5], 10.0, "II").unwrap();
        let fig = figure_from_segment(&seg, &Peaks::default());
        let pad = 0.2 + 0.1 * 2.0;
        assert!((fig.y_min - (-1.0 - pad)).abs() < 1e-12);
        assert!((fig.y_max - (2.0 + pad)).abs() < 1e-12);
    }

    #[test]
    fn last_marker_is_transparent() {
        let seg = sample_segment();
        let peaks = Peaks::from_indices(vec![100, 500, 900]);
        let fig = figure_from_segment(&seg, &peaks);
        assert!(!fig.markers[0].color.is_transparent());
        assert!(!fig.markers[1].color.is_transparent());
        assert!(fig.markers[2].color.is_transparent());
        assert_eq!(fig.markers[2].annotation.class, BeatClass::Unclassified);
    }

    #[test]
    fn frame_figure_matches_buffer_geometry() {
        let seg = Segment::new(vec![0.3; 400], 20.0, "II").unwrap();
        let cfg = PlaybackConfig::for_segment(&seg, 5.0, 10, 1.0).unwrap();
        let fs = seg.fs;
        let mut pb = Playback::new(seg, Peaks::from_indices(vec![3]), cfg);
        pb.play();
        let mut frame = None;
        for _ in 0..10 {
            frame = pb.step();
        }
        let frame = frame.unwrap();
        let fig = figure_from_frame(&frame, fs);
        assert_eq!(fig.points.len(), 100);
        assert_eq!(fig.markers.len(), 1);
        // Single visible peak has no successor, so it renders clear.
        assert!(fig.markers[0].color.is_transparent());
        assert!(fig.lead.is_none());
    }

    #[test]
    fn decimation_bounds_point_count() {
        let points: Vec<[f64; 2]> = (0..10_000).map(|i| [i as f64, 0.0]).collect();
        assert_eq!(decimate(&points, 256).len(), 256);
        assert_eq!(decimate(&points, 20_000).len(), 10_000);
        let exact = decimate(&points, 10_000);
        assert_eq!(exact.len(), 10_000);
    }
}
