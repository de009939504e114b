pub mod annotate;
pub mod conditioning;
pub mod detect;
pub mod error;
pub mod io;
pub mod playback;
pub mod render;
pub mod signal;
pub mod stream;
pub mod synth;

pub use annotate::{annotate, BeatAnnotation, BeatClass};
pub use detect::{detect, detect_with_config, Detection, DetectorConfig};
pub use error::ConfigError;
pub use playback::{Frame, Playback, PlaybackConfig};
pub use signal::{Peaks, RRSeries, Segment};
pub use stream::SweepBuffer;
