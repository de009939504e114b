//! Newline-delimited numeric input for CLI pipelines. Blank lines and
//! `#` comments are skipped.

use std::path::Path;

use anyhow::{bail, Context, Result};

fn parse_lines<T>(text: &str, what: &str) -> Result<Vec<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let mut out = Vec::new();
    for (lineno, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let value = trimmed
            .parse::<T>()
            .with_context(|| format!("line {}: not a valid {what}: {trimmed:?}", lineno + 1))?;
        out.push(value);
    }
    if out.is_empty() {
        bail!("no {what} values found");
    }
    Ok(out)
}

/// Millivolt samples, one per line.
pub fn parse_samples(text: &str) -> Result<Vec<f64>> {
    parse_lines(text, "sample")
}

pub fn read_samples(path: &Path) -> Result<Vec<f64>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading samples from {}", path.display()))?;
    parse_samples(&text)
}

/// Peak positions as sample indices, one per line.
pub fn parse_indices(text: &str) -> Result<Vec<usize>> {
    parse_lines(text, "index")
}

pub fn read_indices(path: &Path) -> Result<Vec<usize>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading indices from {}", path.display()))?;
    parse_indices(&text)
}
