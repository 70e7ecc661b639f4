//! Bookmark timing.
//!
//! Marker offsets are measured in the cleaned text that was sent to TTS, while
//! boundary offsets are measured in whatever text the STT backend returned.
//! The two rarely have the same length (whitespace, punctuation, casing), so
//! offsets are first scaled by the ratio of the two lengths and then looked up
//! on a piecewise-linear offset -> time curve built from the boundaries.
//!
//! The scaling is an approximation. Heavy normalization near a marker (for
//! example a run of dropped punctuation) shifts that marker's time.

use crate::{
    bookmark::MarkerOffsets,
    types::{BookmarkMap, Transcript},
};

/// Offset -> time curve over a transcript.
#[derive(Debug, Clone, PartialEq)]
pub enum Interpolator {
    /// Fewer than two boundaries: there is no slope to follow.
    Constant(f64),
    /// Knots sorted by offset, at least two of them.
    Linear(Vec<(f64, f64)>),
}

impl Interpolator {
    pub fn from_transcript(transcript: &Transcript) -> Self {
        let boundaries = &transcript.boundaries;
        match boundaries.as_slice() {
            [] => Interpolator::Constant(0.0),
            [only] => Interpolator::Constant(only.start),
            [.., last] => {
                let mut knots: Vec<(f64, f64)> = boundaries
                    .iter()
                    .map(|b| (b.text_start as f64, b.start))
                    .collect();
                knots.push((transcript.text.chars().count() as f64, last.end));
                knots.sort_by(|a, b| a.0.total_cmp(&b.0));
                Interpolator::Linear(knots)
            }
        }
    }

    /// Evaluate at `offset`. Outside the knot range the nearest segment is
    /// extended rather than clamped.
    pub fn eval(&self, offset: f64) -> f64 {
        let knots = match self {
            Interpolator::Constant(t) => return *t,
            Interpolator::Linear(knots) => knots,
        };

        let last_segment = knots.len() - 2;
        let i = knots
            .partition_point(|(x, _)| *x <= offset)
            .saturating_sub(1)
            .min(last_segment);
        let (x0, y0) = knots[i];
        let (x1, y1) = knots[i + 1];

        if x1 == x0 {
            return y0;
        }
        y0 + (offset - x0) * (y1 - y0) / (x1 - x0)
    }
}

/// Estimate a playback time for every marker.
///
/// `cleaned_len` is the character length of the text that was synthesized.
pub fn bookmark_times(
    markers: &MarkerOffsets,
    transcript: &Transcript,
    cleaned_len: usize,
) -> BookmarkMap {
    if cleaned_len == 0 {
        return markers.iter().map(|(name, _)| (name.to_string(), 0.0)).collect();
    }

    let interpolator = Interpolator::from_transcript(transcript);
    let ratio = transcript.text.trim().chars().count() as f64 / cleaned_len as f64;

    markers
        .iter()
        .map(|(name, offset)| (name.to_string(), interpolator.eval(offset as f64 * ratio)))
        .collect()
}
