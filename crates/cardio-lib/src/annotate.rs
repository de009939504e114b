//! Per-beat annotations for display: the interval and rate to the next
//! beat, and a three-way rate classification. Both the static view and
//! the streaming sweep consume this module, so the numbers shown in
//! either path always agree.

use serde::{Deserialize, Serialize};

use crate::signal::Peaks;

/// Bradycardia threshold in beats per minute (exclusive).
pub const LOW_BPM: f64 = 60.0;
/// Tachycardia threshold in beats per minute (exclusive).
pub const HIGH_BPM: f64 = 100.0;

/// Rate class of a beat, judged by the rate to the following beat.
/// The last beat in any window has no following beat and stays
/// `Unclassified`; renderers draw it fully transparent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BeatClass {
    Low,
    Normal,
    High,
    Unclassified,
}

impl BeatClass {
    /// Boundary values 60 and 100 bpm both count as `Normal`.
    pub fn from_hr(hr_to_next: Option<f64>) -> Self {
        match hr_to_next {
            None => BeatClass::Unclassified,
            Some(hr) if hr < LOW_BPM => BeatClass::Low,
            Some(hr) if hr <= HIGH_BPM => BeatClass::Normal,
            Some(_) => BeatClass::High,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BeatAnnotation {
    /// Seconds to the next peak, absent for the final peak.
    pub rr_to_next: Option<f64>,
    /// Beats per minute over that interval, absent for the final peak.
    pub hr_to_next: Option<f64>,
    pub class: BeatClass,
}

/// One annotation per peak, in peak order. Never fails: an empty peak
/// set annotates to an empty list, a singleton to one unclassified
/// entry.
pub fn annotate(peaks: &Peaks, fs: f64) -> Vec<BeatAnnotation> {
    let idx = &peaks.indices;
    let mut out = Vec::with_capacity(idx.len());
    for k in 0..idx.len() {
        let rr_to_next = idx
            .get(k + 1)
            .and_then(|&next| (next > idx[k]).then(|| (next - idx[k]) as f64 / fs));
        let hr_to_next = rr_to_next.and_then(|rr| (rr > 0.0).then(|| 60.0 / rr));
        out.push(BeatAnnotation {
            rr_to_next,
            hr_to_next,
            class: BeatClass::from_hr(hr_to_next),
        });
    }
    out
}
