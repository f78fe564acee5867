use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::mpd::{ByteRange, MpdSummary};

/// The JSON manifest consumed by WebKit's media-source layout tests.
///
/// Field order is the serialization order and must stay as is, the
/// checked-in fixtures depend on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub url: String,
    #[serde(rename = "type")]
    pub content_type: String,
    pub init: ByteSpan,
    pub duration: f64,
    pub media: Vec<MediaSegment>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ByteSpan {
    pub offset: u64,
    pub size: u64,
}

impl From<ByteRange> for ByteSpan {
    fn from(range: ByteRange) -> Self {
        Self {
            offset: range.start,
            size: range.size(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MediaSegment {
    pub offset: u64,
    pub size: u64,
    pub timestamp: f64,
    /// End of this segment on the presentation timeline, capped at the total
    /// duration. Not the length of the segment.
    pub duration: f64,
}

/// Maps an extracted MPD onto the manifest, computing segment timing from
/// the segment index.
///
/// Timestamps are exact tick products divided once by the timescale, which
/// is correctly rounded as long as both stay within
/// [`MAX_EXACT_TICKS`](crate::mpd::MAX_EXACT_TICKS), as `extract` ensures.
#[must_use]
#[instrument(skip(summary))]
#[allow(clippy::cast_precision_loss)]
pub fn build_manifest(summary: &MpdSummary, content_url: &str) -> Manifest {
    let timescale = summary.timescale.get() as f64;
    let seconds_at = |index: u64| {
        (u128::from(index) * u128::from(summary.segment_duration)) as f64 / timescale
    };

    let media = summary
        .segment_ranges
        .iter()
        .zip(0u64..)
        .map(|(range, i)| MediaSegment {
            offset: range.start,
            size: range.size(),
            timestamp: seconds_at(i),
            duration: summary.total_duration.min(seconds_at(i + 1)),
        })
        .collect::<Vec<_>>();
    debug!("Built manifest with {} media segments", media.len());

    Manifest {
        url: content_url.to_string(),
        content_type: format!("{}; codecs=\"{}\"", summary.mime_type, summary.codecs),
        init: summary.init_range.into(),
        duration: summary.total_duration,
        media,
    }
}
