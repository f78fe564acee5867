#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(clippy::cargo)]
#![warn(clippy::perf)]
#![warn(clippy::complexity)]
#![warn(clippy::style)]
#![allow(clippy::multiple_crate_versions)]

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use compact_json::{DEFAULT_INDENT, to_manifest_string};
use indoc::indoc;
use manifest::build_manifest;
use mpd::{extract, xml::Document};
use tracing::info;
use util::{STDOUT_MARKER, write_output};

pub mod compact_json;
pub mod error;
pub mod manifest;
pub mod mpd;
pub mod util;

const LONG_ABOUT: &str = indoc! {"
    Given an MPD file generated by MP4Box, generate a WebKit manifest like the
    ones in LayoutTests/media/media-source/content/*.json.

    This does in no way attempt to comply with the entire MPD specification.
    It handles just enough to produce test vectors for Media Source Extensions:
    one Period, one Representation and one SegmentList of byte ranges.
"};

/// Converts an MP4Box DASH MPD into a WebKit media-source test manifest
#[derive(Parser, Debug)]
#[command(version, about, long_about = LONG_ABOUT)]
struct Args {
    /// An .mpd file produced by MP4Box describing several media segments in the same file
    mpd_file: PathBuf,

    /// What to put in the "url" field of the manifest
    #[arg(short, long, env = "MANIFEST_URL")]
    url: String,

    /// Where to write the manifest to (`--` for standard output)
    #[arg(short, long, default_value = STDOUT_MARKER, allow_hyphen_values = true)]
    output: String,
}

fn main() -> Result<()> {
    // stdout may be the manifest destination, keep logs out of it
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();
    dotenvy::dotenv().ok();

    let args = Args::parse();

    info!("Reading MPD: {}", args.mpd_file.display());
    let xml = std::fs::read_to_string(&args.mpd_file)
        .with_context(|| format!("Reading MPD file {}", args.mpd_file.display()))?;
    let doc = Document::parse(&xml).context("Parsing MPD file")?;

    let summary = extract(&doc).context("Extracting segments from MPD")?;
    info!(
        "Found {} segments of {} ({})",
        summary.segment_ranges.len(),
        summary.mime_type,
        summary.codecs
    );

    let manifest = build_manifest(&summary, &args.url);
    let text = to_manifest_string(&manifest, DEFAULT_INDENT).context("Serializing manifest")?;

    // Only touch the destination once everything above succeeded
    write_output(&args.output, &text)
        .with_context(|| format!("Writing manifest to {}", args.output))?;
    info!("Manifest written to {}", args.output);

    Ok(())
}
