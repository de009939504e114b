use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use cardio_lib::{
    annotate::annotate,
    detect::{detect_with_config, DetectorConfig},
    io::{manifest as manifest_io, segment as segment_io, text as text_io},
    playback::{Playback, PlaybackConfig},
    render::{figure_from_segment, EcgFigure, PlotBackend},
    signal::{Peaks, Segment},
    synth::{synthetic_segment, SynthConfig},
};
use clap::{Parser, Subcommand};
use plotters::prelude::*;

#[derive(Parser)]
#[command(
    name = "cardio",
    version,
    about = "Cardioscope: single-lead ECG beat detection and sweep playback"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect R-peaks and derived heart rate in a waveform
    Detect {
        /// Sample rate for raw sample input (ignored with --segment)
        #[arg(long, default_value_t = 500.0)]
        fs: f64,
        /// Newline-delimited samples; stdin when omitted
        #[arg(long)]
        input: Option<PathBuf>,
        /// Segment document to analyze instead of raw samples
        #[arg(long)]
        segment: Option<PathBuf>,
        #[arg(long, default_value_t = 5.0)]
        band_low_hz: f64,
        #[arg(long, default_value_t = 15.0)]
        band_high_hz: f64,
        #[arg(long, default_value_t = 0.150)]
        integration_s: f64,
        #[arg(long, default_value_t = 0.200)]
        refractory_s: f64,
        #[arg(long, default_value_t = 0.5)]
        threshold_scale: f64,
        #[arg(long, default_value_t = 0.150)]
        search_back_s: f64,
    },
    /// Annotate peaks with RR/HR-to-next and a rate class
    Annotate {
        #[arg(long, default_value_t = 500.0)]
        fs: f64,
        #[arg(long)]
        input: Option<PathBuf>,
        #[arg(long)]
        segment: Option<PathBuf>,
        /// Pre-computed peak indices; detection is skipped when given
        #[arg(long)]
        peaks: Option<PathBuf>,
    },
    /// List catalog entries from a manifest
    Segments {
        #[arg(long, default_value = "data/manifest.csv")]
        manifest: PathBuf,
    },
    /// Replay a segment as sweep frames, one JSON object per line
    Frames {
        #[arg(long)]
        segment: PathBuf,
        #[arg(long, default_value_t = 8.0)]
        window_s: f64,
        #[arg(long, default_value_t = 25)]
        fps: u32,
        #[arg(long, default_value_t = 1.0)]
        speed: f64,
        /// Stop after this many frames
        #[arg(long)]
        limit: Option<usize>,
        /// Pace output at the frame interval instead of dumping
        #[arg(long)]
        pace: bool,
    },
    /// Render a waveform with the clinical grid to a PNG
    Render {
        #[arg(long, default_value_t = 500.0)]
        fs: f64,
        #[arg(long)]
        input: Option<PathBuf>,
        #[arg(long)]
        segment: Option<PathBuf>,
        #[arg(long)]
        out: PathBuf,
        #[arg(long, default_value_t = 1200)]
        width: u32,
        #[arg(long, default_value_t = 480)]
        height: u32,
    },
    /// Write a reproducible synthetic segment document
    Synth {
        #[arg(long)]
        out: PathBuf,
        #[arg(long, default_value_t = 500.0)]
        fs: f64,
        #[arg(long, default_value_t = 15.0)]
        duration_s: f64,
        #[arg(long, default_value_t = 75.0)]
        heart_rate_bpm: f64,
        #[arg(long, default_value_t = 0.02)]
        noise_mv: f64,
        #[arg(long, default_value_t = 7)]
        seed: u64,
        /// Append a catalog row for the new segment
        #[arg(long)]
        manifest: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    match cli.command {
        Commands::Detect {
            fs,
            input,
            segment,
            band_low_hz,
            band_high_hz,
            integration_s,
            refractory_s,
            threshold_scale,
            search_back_s,
        } => {
            let cfg = DetectorConfig {
                band_low_hz,
                band_high_hz,
                integration_s,
                refractory_s,
                threshold_scale,
                search_back_s,
                ..DetectorConfig::default()
            };
            cmd_detect(fs, input.as_deref(), segment.as_deref(), &cfg)?
        }
        Commands::Annotate {
            fs,
            input,
            segment,
            peaks,
        } => cmd_annotate(fs, input.as_deref(), segment.as_deref(), peaks.as_deref())?,
        Commands::Segments { manifest } => cmd_segments(&manifest)?,
        Commands::Frames {
            segment,
            window_s,
            fps,
            speed,
            limit,
            pace,
        } => cmd_frames(&segment, window_s, fps, speed, limit, pace)?,
        Commands::Render {
            fs,
            input,
            segment,
            out,
            width,
            height,
        } => cmd_render(fs, input.as_deref(), segment.as_deref(), &out, (width, height))?,
        Commands::Synth {
            out,
            fs,
            duration_s,
            heart_rate_bpm,
            noise_mv,
            seed,
            manifest,
        } => cmd_synth(
            &out,
            fs,
            duration_s,
            heart_rate_bpm,
            noise_mv,
            seed,
            manifest.as_deref(),
        )?,
    }
    Ok(())
}

fn read_samples(input: Option<&Path>) -> Result<Vec<f64>> {
    match input {
        Some(path) => text_io::read_samples(path),
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            text_io::parse_samples(&buf)
        }
    }
}

fn load_waveform(fs: f64, input: Option<&Path>, segment: Option<&Path>) -> Result<Segment> {
    if let Some(path) = segment {
        segment_io::load_segment(path)
    } else {
        let samples = read_samples(input)?;
        Ok(Segment::new(samples, fs, "II")?)
    }
}

fn cmd_detect(
    fs: f64,
    input: Option<&Path>,
    segment: Option<&Path>,
    cfg: &DetectorConfig,
) -> Result<()> {
    let waveform = load_waveform(fs, input, segment)?;
    let detection = detect_with_config(&waveform, cfg);
    log::info!(
        "{} samples @ {} Hz: {} beats",
        waveform.len(),
        waveform.fs,
        detection.r_idx.len()
    );
    println!("{}", serde_json::to_string(&detection)?);
    Ok(())
}

fn cmd_annotate(
    fs: f64,
    input: Option<&Path>,
    segment: Option<&Path>,
    peaks: Option<&Path>,
) -> Result<()> {
    let (peaks, fs) = if let Some(path) = peaks {
        (Peaks::from_indices(text_io::read_indices(path)?), fs)
    } else {
        let waveform = load_waveform(fs, input, segment)?;
        let detection = detect_with_config(&waveform, &DetectorConfig::default());
        (detection.r_idx, waveform.fs)
    };
    let annotations = annotate(&peaks, fs);
    println!("{}", serde_json::to_string(&annotations)?);
    Ok(())
}

fn cmd_segments(manifest: &Path) -> Result<()> {
    let entries = manifest_io::read_manifest(manifest)?;
    log::info!("{} catalog entries in {}", entries.len(), manifest.display());
    println!("{}", serde_json::to_string(&entries)?);
    Ok(())
}

fn cmd_frames(
    segment: &Path,
    window_s: f64,
    fps: u32,
    speed: f64,
    limit: Option<usize>,
    pace: bool,
) -> Result<()> {
    let waveform = segment_io::load_segment(segment)?;
    let detection = detect_with_config(&waveform, &DetectorConfig::default());
    let config = PlaybackConfig::for_segment(&waveform, window_s, fps, speed)?;
    let mut playback = Playback::new(waveform, detection.r_idx, config);
    let interval = playback.frame_interval();
    playback.play();

    let mut emitted = 0usize;
    while let Some(frame) = playback.step() {
        println!("{}", serde_json::to_string(&frame)?);
        emitted += 1;
        if limit.is_some_and(|n| emitted >= n) {
            break;
        }
        if pace {
            std::thread::sleep(interval);
        }
    }
    log::info!("emitted {emitted} frames");
    Ok(())
}

fn cmd_render(
    fs: f64,
    input: Option<&Path>,
    segment: Option<&Path>,
    out: &Path,
    size: (u32, u32),
) -> Result<()> {
    let waveform = load_waveform(fs, input, segment)?;
    let detection = detect_with_config(&waveform, &DetectorConfig::default());
    let figure = figure_from_segment(&waveform, &detection.r_idx);
    let mut backend = PngBackend {
        path: out.to_path_buf(),
        size,
    };
    backend.draw(&figure)?;
    log::info!("wrote {}", out.display());
    Ok(())
}

fn cmd_synth(
    out: &Path,
    fs: f64,
    duration_s: f64,
    heart_rate_bpm: f64,
    noise_mv: f64,
    seed: u64,
    manifest: Option<&Path>,
) -> Result<()> {
    let cfg = SynthConfig {
        fs,
        duration_s,
        heart_rate_bpm,
        noise_mv,
        seed,
        ..SynthConfig::default()
    };
    let segment = synthetic_segment(&cfg)?;
    segment_io::write_segment(out, &segment)?;
    log::info!("wrote {} ({:.1}s @ {} Hz)", out.display(), duration_s, fs);

    if let Some(manifest_path) = manifest {
        let segment_id = out
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| anyhow!("segment path has no usable file name"))?
            .to_string();
        let entry = manifest_io::SegmentEntry {
            segment_id,
            record_id: "synthetic".into(),
            lead: segment.lead.clone(),
            fs,
            start_s: 0.0,
            end_s: duration_s,
            path: out.to_string_lossy().into_owned(),
        };
        manifest_io::append_entry(manifest_path, &entry)?;
    }
    Ok(())
}

/// Rasterizes a figure to PNG. Text is deliberately avoided so the
/// renderer works on machines without a usable font configuration.
struct PngBackend {
    path: PathBuf,
    size: (u32, u32),
}

impl PlotBackend for PngBackend {
    fn draw(&mut self, figure: &EcgFigure) -> Result<()> {
        render_png(&self.path, figure, self.size)
    }
}

fn render_png(path: &Path, figure: &EcgFigure, size: (u32, u32)) -> Result<()> {
    let root = BitMapBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE)?;

    let t_max = figure.points.last().map(|p| p[0]).unwrap_or(1.0);
    let mut chart = ChartBuilder::on(&root)
        .margin(12)
        .build_cartesian_2d(0.0..t_max, figure.y_min..figure.y_max)?;

    let minor = RGBAColor(255, 0, 0, 0.3);
    let major = RGBAColor(255, 0, 0, 0.6);
    let grid = figure.grid;

    let per_major_t = (grid.major_t_s / grid.minor_t_s).round() as i64;
    let mut i = 0i64;
    loop {
        let x = i as f64 * grid.minor_t_s;
        if x > t_max {
            break;
        }
        let color = if i % per_major_t == 0 { major } else { minor };
        chart.draw_series(LineSeries::new(
            [(x, figure.y_min), (x, figure.y_max)],
            color.stroke_width(1),
        ))?;
        i += 1;
    }

    let per_major_v = (grid.major_mv / grid.minor_mv).round() as i64;
    let mut j = (figure.y_min / grid.minor_mv).floor() as i64;
    loop {
        let y = j as f64 * grid.minor_mv;
        if y > figure.y_max {
            break;
        }
        if y >= figure.y_min {
            let color = if j.rem_euclid(per_major_v) == 0 {
                major
            } else {
                minor
            };
            chart.draw_series(LineSeries::new(
                [(0.0, y), (t_max, y)],
                color.stroke_width(1),
            ))?;
        }
        j += 1;
    }

    chart.draw_series(LineSeries::new(
        figure.points.iter().map(|p| (p[0], p[1])),
        BLACK.stroke_width(1),
    ))?;

    for marker in &figure.markers {
        let color = RGBAColor(
            marker.color.r,
            marker.color.g,
            marker.color.b,
            marker.color.a as f64 / 255.0,
        );
        chart.draw_series(std::iter::once(Circle::new(
            (marker.t_s, marker.mv),
            4,
            color.filled(),
        )))?;
    }

    root.present()?;
    Ok(())
}
