//! Simulated real-time sweep over a stored segment.
//!
//! The scheduler advances a cursor through the segment in small hops
//! and emits one complete frame per step: the trailing window's samples
//! plus the peak indices visible in it, re-expressed in buffer
//! coordinates. Pacing is the caller's job; the scheduler only reports
//! the wall-clock budget per frame, so tests can drive `step` directly
//! with no clock at all.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::signal::{Peaks, Segment};
use crate::stream::SweepBuffer;

pub const WINDOW_MIN_S: f64 = 5.0;
pub const WINDOW_MAX_S: f64 = 15.0;
pub const FPS_MIN: u32 = 10;
pub const FPS_MAX: u32 = 40;
/// Supported sweep speed multipliers.
pub const SPEEDS: [f64; 3] = [0.5, 1.0, 2.0];

/// Validated playback parameters. Construction fails rather than
/// clamping anything.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PlaybackConfig {
    window_s: f64,
    fps: u32,
    speed: f64,
}

impl PlaybackConfig {
    /// The window must fit inside the segment: its upper bound is the
    /// smaller of 15 s and the segment duration.
    pub fn for_segment(
        segment: &Segment,
        window_s: f64,
        fps: u32,
        speed: f64,
    ) -> Result<Self, ConfigError> {
        let hi = WINDOW_MAX_S.min(segment.duration_s());
        if !(window_s >= WINDOW_MIN_S && window_s <= hi) {
            return Err(ConfigError::WindowOutOfRange {
                got: window_s,
                lo: WINDOW_MIN_S,
                hi,
            });
        }
        if !(FPS_MIN..=FPS_MAX).contains(&fps) {
            return Err(ConfigError::FpsOutOfRange {
                got: fps,
                lo: FPS_MIN,
                hi: FPS_MAX,
            });
        }
        if !SPEEDS.contains(&speed) {
            return Err(ConfigError::UnsupportedSpeed(speed));
        }
        Ok(Self {
            window_s,
            fps,
            speed,
        })
    }

    pub fn window_s(&self) -> f64 {
        self.window_s
    }

    pub fn fps(&self) -> u32 {
        self.fps
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }
}

/// One completed step of the sweep. Immutable once returned; a paused
/// or finished playback leaves the last frame as the displayed state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Trailing window contents, oldest first.
    pub samples: Vec<f64>,
    /// Peak positions inside `samples`, buffer-relative.
    pub peaks: Vec<usize>,
    /// Absolute sample range the buffer currently represents.
    pub window_start: usize,
    pub window_end: usize,
}

/// Cursor-driven sweep through one segment. Owns its buffer and state
/// exclusively; there is no shared mutation anywhere.
pub struct Playback {
    segment: Segment,
    peaks: Peaks,
    config: PlaybackConfig,
    buffer: SweepBuffer,
    cursor: usize,
    running: bool,
}

impl Playback {
    pub fn new(segment: Segment, peaks: Peaks, config: PlaybackConfig) -> Self {
        let capacity = (config.window_s() * segment.fs).floor() as usize;
        Self {
            buffer: SweepBuffer::new(capacity),
            segment,
            peaks,
            config,
            cursor: 0,
            running: false,
        }
    }

    /// Samples advanced per tick: half the nominal per-frame sample
    /// count, which keeps the visual sweep sub-frame granular.
    pub fn hop(&self) -> usize {
        let per_frame = self.segment.fs / self.config.fps() as f64;
        ((per_frame * self.config.speed() / 2.0).floor() as usize).max(1)
    }

    /// Wall-clock budget per frame for callers that pace in real time.
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.config.fps() as f64)
    }

    pub fn config(&self) -> &PlaybackConfig {
        &self.config
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Seconds of the segment consumed so far.
    pub fn elapsed_s(&self) -> f64 {
        self.cursor.min(self.segment.len()) as f64 / self.segment.fs
    }

    pub fn play(&mut self) {
        self.running = true;
    }

    pub fn pause(&mut self) {
        self.running = false;
    }

    pub fn toggle(&mut self) {
        self.running = !self.running;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_finished(&self) -> bool {
        self.cursor >= self.segment.len()
    }

    /// Advance one hop and return the completed frame. Returns `None`
    /// without touching any state when paused or exhausted, so a
    /// cancellation can only ever land between frames.
    pub fn step(&mut self) -> Option<Frame> {
        if !self.running || self.is_finished() {
            return None;
        }

        let hop = self.hop();
        let take = hop.min(self.segment.len() - self.cursor);
        for &v in &self.segment.samples[self.cursor..self.cursor + take] {
            self.buffer.push(v);
        }

        let capacity = self.buffer.capacity();
        let window_end = self.cursor + hop;
        let window_start = window_end.saturating_sub(capacity);
        // Buffer-relative position of absolute index a is
        // a - (window_end - capacity); before the buffer has wrapped
        // that offset is negative.
        let offset = window_end as i64 - capacity as i64;
        let peaks = self
            .peaks
            .in_window(window_start, window_end)
            .iter()
            .filter_map(|&abs| {
                let rel = abs as i64 - offset;
                (rel >= 0 && rel < capacity as i64).then(|| rel as usize)
            })
            .collect();

        self.cursor += hop;
        Some(Frame {
            samples: self.buffer.snapshot(),
            peaks,
            window_start,
            window_end,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(len: usize, fs: f64) -> Segment {
        Segment::new(vec![0.25; len], fs, "II").unwrap()
    }

    fn playback(len: usize, fs: f64, peaks: Vec<usize>, window_s: f64, fps: u32) -> Playback {
        let seg = segment(len, fs);
        let cfg = PlaybackConfig::for_segment(&seg, window_s, fps, 1.0).unwrap();
        Playback::new(seg, Peaks::from_indices(peaks), cfg)
    }

    #[test]
    fn hop_formula() {
        let seg = segment(10_000, 500.0);
        for (speed, expected) in [(1.0, 10), (2.0, 20), (0.5, 5)] {
            let cfg = PlaybackConfig::for_segment(&seg, 8.0, 25, speed).unwrap();
            assert_eq!(Playback::new(seg.clone(), Peaks::default(), cfg).hop(), expected);
        }
    }

    #[test]
    fn hop_never_drops_below_one() {
        let seg = segment(200, 10.0);
        let cfg = PlaybackConfig::for_segment(&seg, 5.0, 40, 0.5).unwrap();
        assert_eq!(Playback::new(seg, Peaks::default(), cfg).hop(), 1);
    }

    #[test]
    fn config_validation() {
        let seg = segment(10_000, 500.0);
        assert!(PlaybackConfig::for_segment(&seg, 3.0, 25, 1.0).is_err());
        assert!(PlaybackConfig::for_segment(&seg, 8.0, 9, 1.0).is_err());
        assert!(PlaybackConfig::for_segment(&seg, 8.0, 41, 1.0).is_err());
        assert!(PlaybackConfig::for_segment(&seg, 8.0, 25, 1.5).is_err());
        assert!(PlaybackConfig::for_segment(&seg, 8.0, 25, 1.0).is_ok());
        // A 10 s segment cannot host a 12 s window.
        let short = segment(5_000, 500.0);
        assert!(PlaybackConfig::for_segment(&short, 12.0, 25, 1.0).is_err());
        assert!(PlaybackConfig::for_segment(&short, 10.0, 25, 1.0).is_ok());
    }

    #[test]
    fn step_requires_play() {
        let mut pb = playback(2000, 20.0, vec![], 5.0, 10);
        assert!(pb.step().is_none());
        pb.play();
        assert!(pb.step().is_some());
        pb.pause();
        let cursor = pb.cursor();
        assert!(pb.step().is_none());
        assert_eq!(pb.cursor(), cursor);
    }

    #[test]
    fn window_reexpression_keeps_visible_peak_drops_stale_one() {
        // fs 20 with a 5 s window gives a 100-sample buffer and hop 1,
        // so after 1100 steps the window is [1000, 1100).
        let mut pb = playback(2000, 20.0, vec![950, 1050], 5.0, 10);
        pb.play();
        let mut frame = None;
        for _ in 0..1100 {
            frame = pb.step();
        }
        let frame = frame.unwrap();
        assert_eq!(frame.window_start, 1000);
        assert_eq!(frame.window_end, 1100);
        assert_eq!(frame.peaks, vec![50]);
    }

    #[test]
    fn warmup_window_offsets_early_peaks() {
        // After 10 steps the buffer holds 90 zeros then samples 0..10;
        // the peak at absolute 5 sits at relative 95.
        let mut pb = playback(2000, 20.0, vec![5], 5.0, 10);
        pb.play();
        let mut frame = None;
        for _ in 0..10 {
            frame = pb.step();
        }
        let frame = frame.unwrap();
        assert_eq!(frame.window_start, 0);
        assert_eq!(frame.window_end, 10);
        assert_eq!(frame.peaks, vec![95]);
    }

    #[test]
    fn frames_always_span_the_full_buffer() {
        let mut pb = playback(3000, 25.0, vec![], 5.0, 25);
        pb.play();
        while let Some(frame) = pb.step() {
            assert_eq!(frame.samples.len(), 125);
        }
        assert!(pb.is_finished());
    }

    #[test]
    fn terminates_at_segment_end() {
        let fs = 20.0;
        let mut pb = playback(120, fs, vec![], 5.0, 10);
        pb.play();
        let mut frames = 0;
        while pb.step().is_some() {
            frames += 1;
        }
        assert_eq!(frames, 120);
        assert!(pb.is_finished());
        assert!(pb.step().is_none());
    }

    #[test]
    fn frame_sequences_are_deterministic() {
        let run = || {
            let mut pb = playback(600, 25.0, vec![40, 200, 410], 5.0, 25);
            pb.play();
            let mut frames = Vec::new();
            while let Some(f) = pb.step() {
                frames.push(f);
            }
            frames
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn frame_interval_matches_fps() {
        let pb = playback(2000, 20.0, vec![], 5.0, 25);
        assert_eq!(pb.frame_interval(), Duration::from_secs_f64(0.04));
    }
}
