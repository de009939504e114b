//! Whole-signal filtering utilities. Both public entry points are
//! zero-phase: the single-pole cascade runs forward and then again over
//! the reversed output, so the result stays aligned with the input.
//! Suitable for pre-processing stored segments, not for a causal live
//! feed.

use crate::error::ConfigError;

const MIN_CUTOFF_HZ: f64 = 0.01;

pub(crate) fn lowpass_once(data: &[f64], fs: f64, cutoff: f64) -> Vec<f64> {
    if data.is_empty() {
        return Vec::new();
    }
    let dt = 1.0 / fs;
    let rc = 1.0 / (std::f64::consts::TAU * cutoff.max(MIN_CUTOFF_HZ));
    let alpha = dt / (rc + dt);
    let mut state = data[0];
    data.iter()
        .map(|&x| {
            state += alpha * (x - state);
            state
        })
        .collect()
}

pub(crate) fn highpass_once(data: &[f64], fs: f64, cutoff: f64) -> Vec<f64> {
    if data.is_empty() {
        return Vec::new();
    }
    let dt = 1.0 / fs;
    let rc = 1.0 / (std::f64::consts::TAU * cutoff.max(MIN_CUTOFF_HZ));
    let alpha = rc / (rc + dt);
    let mut out = Vec::with_capacity(data.len());
    let mut prev_x = data[0];
    let mut prev_y = data[0];
    for &x in data {
        let y = alpha * (prev_y + x - prev_x);
        out.push(y);
        prev_y = y;
        prev_x = x;
    }
    out
}

fn check_rate(fs: f64) -> Result<(), ConfigError> {
    if !(fs > 0.0 && fs.is_finite()) {
        return Err(ConfigError::NonPositiveRate(fs));
    }
    Ok(())
}

fn check_order(order: usize) -> Result<(), ConfigError> {
    if order == 0 {
        return Err(ConfigError::BadFilterBand("order must be at least 1".into()));
    }
    Ok(())
}

/// Zero-phase band-pass. Output has the same length as the input;
/// cutoffs must satisfy `0 < low < high < fs / 2`.
pub fn bandpass(
    samples: &[f64],
    fs: f64,
    low: f64,
    high: f64,
    order: usize,
) -> Result<Vec<f64>, ConfigError> {
    check_rate(fs)?;
    check_order(order)?;
    if !(low > 0.0 && high > low && high < fs * 0.5) {
        return Err(ConfigError::BadFilterBand(format!(
            "band {low}-{high} Hz does not fit below the Nyquist rate {} Hz",
            fs * 0.5
        )));
    }
    Ok(zero_phase(samples, |data| {
        let mut y = data.to_vec();
        for _ in 0..order {
            y = highpass_once(&y, fs, low);
            y = lowpass_once(&y, fs, high);
        }
        y
    }))
}

/// Zero-phase baseline removal: a high-pass cascade at `cutoff` Hz.
pub fn detrend(
    samples: &[f64],
    fs: f64,
    cutoff: f64,
    order: usize,
) -> Result<Vec<f64>, ConfigError> {
    check_rate(fs)?;
    check_order(order)?;
    if !(cutoff > 0.0 && cutoff < fs * 0.5) {
        return Err(ConfigError::BadFilterBand(format!(
            "cutoff {cutoff} Hz must sit below the Nyquist rate {} Hz",
            fs * 0.5
        )));
    }
    Ok(zero_phase(samples, |data| {
        let mut y = data.to_vec();
        for _ in 0..order {
            y = highpass_once(&y, fs, cutoff);
        }
        y
    }))
}

fn zero_phase<F>(samples: &[f64], pass: F) -> Vec<f64>
where
    F: Fn(&[f64]) -> Vec<f64>,
{
    let forward = pass(samples);
    let mut reversed: Vec<f64> = forward.into_iter().rev().collect();
    reversed = pass(&reversed);
    reversed.reverse();
    reversed
}
