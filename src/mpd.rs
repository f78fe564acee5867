use std::{num::NonZeroU64, str::FromStr, sync::LazyLock};

use regex::Regex;
use tracing::{debug, instrument};

use crate::error::{Error, Result};

pub mod path;
pub mod xml;

use path::{Namespaces, select_all, select_single};
use xml::Document;

/// Prefixes used by every MPD lookup
pub const MPD_NAMESPACES: Namespaces<'static> = &[("m", "urn:mpeg:dash:schema:mpd:2011")];

/// Largest tick count an `f64` holds exactly. Segment timing divides tick
/// counts by the timescale, so both stay at or below this.
pub const MAX_EXACT_TICKS: u64 = 1 << 53;

// Fractional seconds are mandatory, this is what MP4Box always writes
pub static PERIOD_DURATION_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^PT([0-9]+)H([0-9]+)M([0-9]+\.[0-9]+)S").unwrap());

/// Inclusive byte range as written in `range` / `mediaRange` attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    /// Number of bytes covered, both ends included.
    ///
    /// Ranges from [`parse_inclusive_range`] always fit, anything else
    /// saturates at the `u64` bounds.
    #[must_use]
    pub const fn size(&self) -> u64 {
        self.end.saturating_sub(self.start).saturating_add(1)
    }
}

impl FromStr for ByteRange {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        parse_inclusive_range(s)
    }
}

/// Everything the manifest needs out of an MP4Box MPD
#[derive(Debug, Clone, PartialEq)]
pub struct MpdSummary {
    pub mime_type: String,
    pub codecs: String,
    /// Period duration in seconds
    pub total_duration: f64,
    pub timescale: NonZeroU64,
    /// Length of every segment, in `timescale` units
    pub segment_duration: u64,
    pub init_range: ByteRange,
    /// One per `SegmentURL`, in document order
    pub segment_ranges: Vec<ByteRange>,
}

/// Parses a period duration of the form `PT<H>H<M>M<S.sss>S` into seconds
///
/// # Errors
/// Errors when the text does not start with that pattern
#[allow(clippy::cast_precision_loss)]
pub fn parse_period_duration(text: &str) -> Result<f64> {
    let invalid = || Error::format("period duration", text);
    let caps = PERIOD_DURATION_REGEX.captures(text).ok_or_else(invalid)?;

    let hours = caps[1].parse::<u64>().map_err(|_| invalid())?;
    let minutes = caps[2].parse::<u64>().map_err(|_| invalid())?;
    let seconds = caps[3].parse::<f64>().map_err(|_| invalid())?;

    Ok(seconds + 60.0 * minutes as f64 + 3600.0 * hours as f64)
}

/// Parses `<start>-<end>`
///
/// # Errors
/// Errors on a missing separator, non-integer bounds, `start > end` or a
/// size that does not fit in a `u64`
pub fn parse_inclusive_range(text: &str) -> Result<ByteRange> {
    let invalid = || Error::format("byte range", text);
    let (start, end) = text.split_once('-').ok_or_else(invalid)?;
    let range = ByteRange {
        start: start.parse().map_err(|_| invalid())?,
        end: end.parse().map_err(|_| invalid())?,
    };

    range
        .end
        .checked_sub(range.start)
        .and_then(|len| len.checked_add(1))
        .ok_or_else(invalid)?;
    Ok(range)
}

fn parse_integer(what: &'static str, text: &str) -> Result<u64> {
    text.parse().map_err(|_| Error::format(what, text))
}

fn single_value(doc: &Document, expr: &str) -> Result<String> {
    Ok(select_single(doc, expr, MPD_NAMESPACES)?.value.clone())
}

/// Pulls the fields needed for the manifest out of an MPD.
///
/// Assumes what MP4Box emits for a single file: one Period, one
/// Representation and one `SegmentList` addressing byte ranges.
///
/// # Errors
/// Errors when any of the expected nodes is missing or duplicated, when its
/// value cannot be parsed, or when the timescale or the end of the last
/// segment exceeds [`MAX_EXACT_TICKS`]
#[instrument(skip_all)]
pub fn extract(doc: &Document) -> Result<MpdSummary> {
    let mime_type = single_value(doc, "//m:Representation/@mimeType")?;
    let codecs = single_value(doc, "//m:Representation/@codecs")?;
    let total_duration = parse_period_duration(&single_value(doc, "/m:MPD/m:Period/@duration")?)?;

    let timescale = parse_integer("timescale", &single_value(doc, "//m:SegmentList/@timescale")?)?;
    let timescale = NonZeroU64::new(timescale)
        .filter(|ts| ts.get() <= MAX_EXACT_TICKS)
        .ok_or_else(|| Error::format("timescale", timescale.to_string()))?;
    let segment_duration = parse_integer(
        "segment duration",
        &single_value(doc, "//m:SegmentList/@duration")?,
    )?;

    let init_range = parse_inclusive_range(&single_value(doc, "//m:Initialization/@range")?)?;
    let segment_ranges = select_all(doc, "//m:SegmentURL/@mediaRange", MPD_NAMESPACES)?
        .iter()
        .map(|attribute| parse_inclusive_range(&attribute.value))
        .collect::<Result<Vec<_>>>()?;

    let timeline_end = u64::try_from(segment_ranges.len())
        .ok()
        .and_then(|count| count.checked_mul(segment_duration));
    if timeline_end.is_none_or(|ticks| ticks > MAX_EXACT_TICKS) {
        return Err(Error::format(
            "segment duration",
            format!("{segment_duration} over {} segments", segment_ranges.len()),
        ));
    }

    debug!(
        mime_type = %mime_type,
        codecs = %codecs,
        total_duration,
        timescale = timescale.get(),
        segment_duration,
        segments = segment_ranges.len(),
        "Extracted MPD"
    );

    Ok(MpdSummary {
        mime_type,
        codecs,
        total_duration,
        timescale,
        segment_duration,
        init_range,
        segment_ranges,
    })
}
