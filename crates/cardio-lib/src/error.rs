use thiserror::Error;

/// Rejected caller-supplied values. Raised at the boundary where the
/// value arrives; nothing in the core silently clamps a bad input.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("signal must contain at least {min} samples, got {got}")]
    ShortSignal { min: usize, got: usize },
    #[error("sample rate must be a positive finite value, got {0}")]
    NonPositiveRate(f64),
    #[error("window length {got:.2}s outside permitted range {lo:.2}-{hi:.2}s")]
    WindowOutOfRange { got: f64, lo: f64, hi: f64 },
    #[error("frame rate {got} outside permitted range {lo}-{hi}")]
    FpsOutOfRange { got: u32, lo: u32, hi: u32 },
    #[error("unsupported playback speed {0}; expected 0.5, 1.0 or 2.0")]
    UnsupportedSpeed(f64),
    #[error("invalid filter configuration: {0}")]
    BadFilterBand(String),
}
