use std::io::{self, Stdout};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use cardio_lib::{
    annotate::BeatClass,
    detect::{detect, Detection},
    io::{manifest as manifest_io, segment as segment_io},
    playback::{Frame as SweepFrame, Playback, PlaybackConfig, SPEEDS},
    render::{decimate, figure_from_frame, figure_from_segment, EcgFigure},
    signal::Segment,
    synth::{synthetic_segment, SynthConfig},
};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    prelude::CrosstermBackend,
    style::{Color, Modifier, Style},
    symbols,
    text::Line,
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, List, ListItem, Paragraph, Tabs, Wrap},
    Frame, Terminal,
};

const MANIFEST_PATH: &str = "data/manifest.csv";

fn main() -> Result<()> {
    let mut terminal = setup_terminal()?;
    let mut app = App::new();
    let mut last_tick = Instant::now();

    while !app.should_quit {
        terminal.draw(|f| draw(f, &app))?;
        let interval = app.tick_interval();
        let timeout = interval.saturating_sub(last_tick.elapsed());
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.on_key(key);
                }
            }
        }
        if last_tick.elapsed() >= interval {
            app.on_tick();
            last_tick = Instant::now();
        }
    }

    restore_terminal()?;
    Ok(())
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).context("initializing terminal")
}

fn restore_terminal() -> Result<()> {
    disable_raw_mode()?;
    execute!(io::stdout(), LeaveAlternateScreen)?;
    Ok(())
}

#[derive(Copy, Clone, PartialEq, Eq)]
enum Tab {
    Explorer,
    Monitor,
}

impl Tab {
    fn title(&self) -> &'static str {
        match self {
            Tab::Explorer => "Explorer",
            Tab::Monitor => "Monitor",
        }
    }

    fn all() -> [Tab; 2] {
        [Tab::Explorer, Tab::Monitor]
    }

    fn other(self) -> Self {
        match self {
            Tab::Explorer => Tab::Monitor,
            Tab::Monitor => Tab::Explorer,
        }
    }

    fn index(self) -> usize {
        match self {
            Tab::Explorer => 0,
            Tab::Monitor => 1,
        }
    }
}

enum SegmentSource {
    Disk(PathBuf),
    Synthetic(SynthConfig),
}

struct CatalogItem {
    entry: manifest_io::SegmentEntry,
    source: SegmentSource,
}

struct Loaded {
    segment_id: String,
    segment: Segment,
    detection: Detection,
}

struct App {
    tab: Tab,
    items: Vec<CatalogItem>,
    selected: usize,
    loaded: Option<Loaded>,
    playback: Option<Playback>,
    last_frame: Option<SweepFrame>,
    window_s: f64,
    fps: u32,
    speed_idx: usize,
    status: String,
    should_quit: bool,
}

impl App {
    fn new() -> Self {
        let (items, status) = load_catalog(Path::new(MANIFEST_PATH));
        Self {
            tab: Tab::Explorer,
            items,
            selected: 0,
            loaded: None,
            playback: None,
            last_frame: None,
            window_s: 8.0,
            fps: 25,
            speed_idx: 1,
            status,
            should_quit: false,
        }
    }

    fn speed(&self) -> f64 {
        SPEEDS[self.speed_idx]
    }

    fn tick_interval(&self) -> Duration {
        match &self.playback {
            Some(pb) if pb.is_running() => pb.frame_interval(),
            _ => Duration::from_millis(150),
        }
    }

    fn on_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Left | KeyCode::Right => self.tab = self.tab.other(),
            KeyCode::Char('1') => self.tab = Tab::Explorer,
            KeyCode::Char('2') => self.tab = Tab::Monitor,
            KeyCode::Up => {
                if self.selected > 0 {
                    self.selected -= 1;
                }
            }
            KeyCode::Down => {
                if self.selected + 1 < self.items.len() {
                    self.selected += 1;
                }
            }
            KeyCode::Enter => self.load_selected(),
            KeyCode::Char(' ') => self.toggle_play(),
            KeyCode::Char('r') => self.rebuild_playback(),
            KeyCode::Char('s') => {
                self.speed_idx = (self.speed_idx + 1) % SPEEDS.len();
                self.reconfigure("speed");
            }
            KeyCode::Char('[') => self.adjust_window(-1.0),
            KeyCode::Char(']') => self.adjust_window(1.0),
            KeyCode::Char('-') => self.adjust_fps(-5),
            KeyCode::Char('+') | KeyCode::Char('=') => self.adjust_fps(5),
            _ => {}
        }
    }

    fn on_tick(&mut self) {
        if self.tab != Tab::Monitor {
            return;
        }
        let Some(pb) = &mut self.playback else {
            return;
        };
        if !pb.is_running() {
            return;
        }
        match pb.step() {
            Some(frame) => self.last_frame = Some(frame),
            None => {
                if pb.is_finished() {
                    pb.pause();
                    self.status = "End of segment. Press r to restart.".into();
                }
            }
        }
    }

    fn load_selected(&mut self) {
        let Some(item) = self.items.get(self.selected) else {
            self.status = "No segment selected.".into();
            return;
        };
        let loaded = match &item.source {
            SegmentSource::Disk(path) => segment_io::load_segment(path),
            SegmentSource::Synthetic(cfg) => {
                synthetic_segment(cfg).map_err(anyhow::Error::from)
            }
        };
        match loaded {
            Ok(segment) => {
                let detection = detect(&segment);
                self.status = format!(
                    "Loaded {}: {} samples @ {:.0} Hz, {} beats",
                    item.entry.segment_id,
                    segment.len(),
                    segment.fs,
                    detection.r_idx.len()
                );
                self.loaded = Some(Loaded {
                    segment_id: item.entry.segment_id.clone(),
                    segment,
                    detection,
                });
                self.rebuild_playback();
            }
            Err(err) => self.status = format!("Error: {err:#}"),
        }
    }

    fn rebuild_playback(&mut self) {
        self.playback = None;
        self.last_frame = None;
        let Some(loaded) = &self.loaded else {
            return;
        };
        match PlaybackConfig::for_segment(&loaded.segment, self.window_s, self.fps, self.speed()) {
            Ok(config) => {
                self.playback = Some(Playback::new(
                    loaded.segment.clone(),
                    loaded.detection.r_idx.clone(),
                    config,
                ));
            }
            Err(err) => self.status = format!("Error: {err}"),
        }
    }

    fn toggle_play(&mut self) {
        match &mut self.playback {
            Some(pb) => {
                pb.toggle();
                self.status = if pb.is_running() {
                    "Playing.".into()
                } else {
                    "Paused.".into()
                };
            }
            None => self.status = "Load a segment first (Enter in Explorer).".into(),
        }
    }

    fn adjust_window(&mut self, delta: f64) {
        let previous = self.window_s;
        self.window_s += delta;
        if !self.reconfigure("window") {
            self.window_s = previous;
        }
    }

    fn adjust_fps(&mut self, delta: i64) {
        let previous = self.fps;
        self.fps = (self.fps as i64 + delta).max(0) as u32;
        if !self.reconfigure("frame rate") {
            self.fps = previous;
        }
    }

    /// Re-validate the current parameters against the loaded segment.
    /// Returns false when they were rejected so the caller can revert.
    fn reconfigure(&mut self, what: &str) -> bool {
        let Some(loaded) = &self.loaded else {
            return true;
        };
        match PlaybackConfig::for_segment(&loaded.segment, self.window_s, self.fps, self.speed()) {
            Ok(config) => {
                self.playback = Some(Playback::new(
                    loaded.segment.clone(),
                    loaded.detection.r_idx.clone(),
                    config,
                ));
                self.last_frame = None;
                self.status = format!(
                    "Set {what}: window {:.0}s, {} fps, {}x.",
                    self.window_s,
                    self.fps,
                    self.speed()
                );
                true
            }
            Err(err) => {
                self.status = format!("Error: {err}");
                false
            }
        }
    }
}

fn load_catalog(manifest: &Path) -> (Vec<CatalogItem>, String) {
    match manifest_io::read_manifest(manifest) {
        Ok(entries) if !entries.is_empty() => {
            let dir = manifest.parent().unwrap_or(Path::new(".")).to_path_buf();
            let items = entries
                .into_iter()
                .map(|entry| {
                    let raw = PathBuf::from(&entry.path);
                    let path = if raw.is_absolute() { raw } else { dir.join(raw) };
                    CatalogItem {
                        entry,
                        source: SegmentSource::Disk(path),
                    }
                })
                .collect();
            (items, "Select a segment and press Enter.".into())
        }
        _ => {
            let cfg = SynthConfig {
                noise_mv: 0.02,
                ..SynthConfig::default()
            };
            let entry = manifest_io::SegmentEntry {
                segment_id: "synthetic_01".into(),
                record_id: "synthetic".into(),
                lead: cfg.lead.clone(),
                fs: cfg.fs,
                start_s: 0.0,
                end_s: cfg.duration_s,
                path: String::new(),
            };
            let items = vec![CatalogItem {
                entry,
                source: SegmentSource::Synthetic(cfg),
            }];
            (
                items,
                format!("No manifest at {MANIFEST_PATH}; offering a synthetic segment."),
            )
        }
    }
}

fn draw(f: &mut Frame, app: &App) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(3),
        ])
        .split(f.size());
    draw_tabs(f, layout[0], app);
    match app.tab {
        Tab::Explorer => draw_explorer(f, layout[1], app),
        Tab::Monitor => draw_monitor(f, layout[1], app),
    }
    draw_status(f, layout[2], app);
}

fn draw_tabs(f: &mut Frame, area: Rect, app: &App) {
    let titles: Vec<Line> = Tab::all().iter().map(|t| Line::from(t.title())).collect();
    let tabs = Tabs::new(titles)
        .select(app.tab.index())
        .highlight_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .block(Block::default().borders(Borders::ALL).title("cardioscope"));
    f.render_widget(tabs, area);
}

fn draw_status(f: &mut Frame, area: Rect, app: &App) {
    let mut text = app.status.clone();
    if app.tab == Tab::Monitor {
        if let Some(pb) = &app.playback {
            text = format!(
                "{}  [{:.1}s elapsed | window {:.0}s | {} fps | {}x]",
                text,
                pb.elapsed_s(),
                pb.config().window_s(),
                pb.config().fps(),
                pb.config().speed()
            );
        }
    }
    let status = Paragraph::new(text)
        .block(Block::default().borders(Borders::ALL).title("Status"))
        .wrap(Wrap { trim: true });
    f.render_widget(status, area);
}

fn draw_explorer(f: &mut Frame, area: Rect, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(44), Constraint::Min(0)])
        .split(area);

    let items: Vec<ListItem> = app
        .items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let e = &item.entry;
            let label = format!(
                "{} | {} | {:.0}-{:.0}s",
                e.record_id, e.lead, e.start_s, e.end_s
            );
            let style = if i == app.selected {
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            ListItem::new(label).style(style)
        })
        .collect();
    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .title("Segments (Enter to load)"),
    );
    f.render_widget(list, chunks[0]);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(4)])
        .split(chunks[1]);

    match &app.loaded {
        Some(loaded) => {
            let figure = figure_from_segment(&loaded.segment, &loaded.detection.r_idx);
            draw_waveform(f, right[0], &figure, loaded.segment.duration_s(), "Waveform");
            draw_metrics(f, right[1], loaded);
        }
        None => {
            let hint = Paragraph::new("Pick a segment on the left and press Enter.")
                .block(Block::default().borders(Borders::ALL).title("Waveform"))
                .wrap(Wrap { trim: true });
            f.render_widget(hint, right[0]);
            let empty = Paragraph::new("")
                .block(Block::default().borders(Borders::ALL).title("Metrics"));
            f.render_widget(empty, right[1]);
        }
    }
}

fn draw_metrics(f: &mut Frame, area: Rect, loaded: &Loaded) {
    let hr_line = match loaded.detection.hr_avg {
        Some(hr) => format!("Median HR: {hr:.1} bpm"),
        None => "Median HR: no data".into(),
    };
    let lines = vec![
        Line::from(format!(
            "{} | lead {} | {:.1}s @ {:.0} Hz",
            loaded.segment_id,
            loaded.segment.lead,
            loaded.segment.duration_s(),
            loaded.segment.fs
        )),
        Line::from(format!(
            "{} beats, {} intervals | {}",
            loaded.detection.r_idx.len(),
            loaded.detection.rr.len(),
            hr_line
        )),
    ];
    let metrics = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Metrics"))
        .wrap(Wrap { trim: true });
    f.render_widget(metrics, area);
}

fn draw_monitor(f: &mut Frame, area: Rect, app: &App) {
    let (Some(loaded), Some(frame)) = (&app.loaded, &app.last_frame) else {
        let hint = Paragraph::new(vec![
            Line::from("Load a segment in the Explorer tab, then press space."),
            Line::from("space play/pause | s speed | [ ] window | - + fps | r restart"),
        ])
        .block(Block::default().borders(Borders::ALL).title("Sweep"))
        .wrap(Wrap { trim: true });
        f.render_widget(hint, area);
        return;
    };

    let figure = figure_from_frame(frame, loaded.segment.fs);
    let window_s = app
        .playback
        .as_ref()
        .map(|pb| pb.config().window_s())
        .unwrap_or(app.window_s);
    draw_waveform(f, area, &figure, window_s, "Sweep");
}

fn draw_waveform(f: &mut Frame, area: Rect, figure: &EcgFigure, t_max: f64, title: &str) {
    let max_points = (area.width as usize).saturating_mul(2).max(64);
    let trace: Vec<(f64, f64)> = decimate(&figure.points, max_points)
        .into_iter()
        .map(|p| (p[0], p[1]))
        .collect();

    let mut low = Vec::new();
    let mut normal = Vec::new();
    let mut high = Vec::new();
    for marker in &figure.markers {
        match marker.annotation.class {
            BeatClass::Low => low.push((marker.t_s, marker.mv)),
            BeatClass::Normal => normal.push((marker.t_s, marker.mv)),
            BeatClass::High => high.push((marker.t_s, marker.mv)),
            // Transparent: present in the model, not drawn.
            BeatClass::Unclassified => {}
        }
    }

    let mut datasets = vec![Dataset::default()
        .name("mV")
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(Color::White))
        .data(&trace)];
    for (points, color) in [
        (&low, Color::Blue),
        (&normal, Color::Green),
        (&high, Color::Red),
    ] {
        if !points.is_empty() {
            datasets.push(
                Dataset::default()
                    .marker(symbols::Marker::Dot)
                    .graph_type(GraphType::Scatter)
                    .style(Style::default().fg(color))
                    .data(points),
            );
        }
    }

    let chart = Chart::new(datasets)
        .block(Block::default().borders(Borders::ALL).title(title.to_string()))
        .x_axis(
            Axis::default()
                .bounds([0.0, t_max])
                .labels(vec!["0".into(), format!("{t_max:.1}s").into()]),
        )
        .y_axis(
            Axis::default()
                .bounds([figure.y_min, figure.y_max])
                .labels(vec![
                    format!("{:.1}", figure.y_min).into(),
                    format!("{:.1} mV", figure.y_max).into(),
                ]),
        );
    f.render_widget(chart, area);
}
