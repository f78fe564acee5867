//! End-to-end runs of the `mpd-webkit-manifest` binary

use std::{
    fs,
    path::{Path, PathBuf},
    process::{Command, Output},
};

const FIXTURE_MPD: &str = include_str!("fixtures/test-video.mpd");
const FIXTURE_MANIFEST: &str = include_str!("fixtures/test-video.json");

fn fixture_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/test-video.mpd")
}

fn run(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_mpd-webkit-manifest"))
        .args(args)
        .env_remove("MANIFEST_URL")
        .output()
        .expect("failed to spawn mpd-webkit-manifest")
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn writes_manifest_to_stdout_by_default() {
    let mpd = fixture_path();
    let output = run(&[mpd.to_str().unwrap(), "--url", "content/test-video.mp4"]);

    assert!(output.status.success(), "{}", stderr(&output));
    assert_eq!(String::from_utf8(output.stdout).unwrap(), FIXTURE_MANIFEST);
}

#[test]
fn writes_manifest_to_output_file() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("test-video.json");
    let mpd = fixture_path();

    let output = run(&[
        mpd.to_str().unwrap(),
        "-u",
        "content/test-video.mp4",
        "-o",
        out.to_str().unwrap(),
    ]);

    assert!(output.status.success(), "{}", stderr(&output));
    assert!(output.stdout.is_empty());
    assert_eq!(fs::read_to_string(out).unwrap(), FIXTURE_MANIFEST);
}

#[test]
fn url_can_come_from_the_environment() {
    let mpd = fixture_path();
    let output = Command::new(env!("CARGO_BIN_EXE_mpd-webkit-manifest"))
        .arg(&mpd)
        .env("MANIFEST_URL", "content/from-env.mp4")
        .output()
        .unwrap();

    assert!(output.status.success(), "{}", stderr(&output));
    let manifest: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(manifest["url"], "content/from-env.mp4");
}

#[test]
fn url_is_required() {
    let mpd = fixture_path();
    let output = run(&[mpd.to_str().unwrap()]);
    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
}

#[test]
fn span_objects_are_single_lines() {
    let mpd = fixture_path();
    let output = run(&[mpd.to_str().unwrap(), "-u", "x.mp4"]);
    let text = String::from_utf8(output.stdout).unwrap();

    let manifest: serde_json::Value = serde_json::from_str(&text).unwrap();
    let media = manifest["media"].as_array().unwrap();
    assert_eq!(media.len(), 5);

    for segment in media.iter().chain([&manifest["init"]]) {
        let offset = segment["offset"].as_u64().unwrap();
        let size = segment["size"].as_u64().unwrap();
        let prefix = format!("{{ \"offset\": {offset}, \"size\": {size}");
        assert!(
            text.lines().any(|l| l.trim_start().starts_with(&prefix) && l.trim_end_matches(',').ends_with(" }")),
            "no single line for {prefix}"
        );
    }
}

/// Runs the binary on a modified copy of the fixture, with an output file that must never appear
fn run_broken(mpd: &str) -> (Output, bool) {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("broken.mpd");
    let out = dir.path().join("manifest.json");
    fs::write(&input, mpd).unwrap();

    let output = run(&[
        input.to_str().unwrap(),
        "-u",
        "x.mp4",
        "-o",
        out.to_str().unwrap(),
    ]);
    (output, out.exists())
}

#[test]
fn duplicate_representation_fails_without_output() {
    let start = FIXTURE_MPD.find("   <Representation").unwrap();
    let end = FIXTURE_MPD.find("  </AdaptationSet>").unwrap();
    let mut mpd = FIXTURE_MPD.to_string();
    mpd.insert_str(end, &FIXTURE_MPD[start..end]);

    let (output, created) = run_broken(&mpd);
    assert!(!output.status.success());
    assert!(!created);
    assert!(stderr(&output).contains("should have returned 1 result, got 2"));
}

#[test]
fn period_duration_without_fraction_fails() {
    let mpd = FIXTURE_MPD.replace(r#"<Period duration="PT0H0M9.510S">"#, r#"<Period duration="PT0H0M9S">"#);

    let (output, created) = run_broken(&mpd);
    assert!(!output.status.success());
    assert!(!created);
    assert!(stderr(&output).contains("period duration"));
}

#[test]
fn malformed_byte_range_fails() {
    let mpd = FIXTURE_MPD.replace("75512-150023", "75512:150023");

    let (output, created) = run_broken(&mpd);
    assert!(!output.status.success());
    assert!(!created);
    assert!(stderr(&output).contains("75512:150023"));
}

#[test]
fn byte_range_larger_than_u64_fails() {
    let mpd = FIXTURE_MPD.replace(r#"range="0-857""#, r#"range="0-18446744073709551615""#);

    let (output, created) = run_broken(&mpd);
    assert!(!output.status.success());
    assert!(!created);
    assert!(stderr(&output).contains("0-18446744073709551615"));
}

#[test]
fn segment_timeline_beyond_exact_floats_fails() {
    let mpd = FIXTURE_MPD.replace(r#"duration="60060""#, r#"duration="10000000000000000000""#);

    let (output, created) = run_broken(&mpd);
    assert!(!output.status.success());
    assert!(!created);
    assert!(stderr(&output).contains("segment duration"));
}

#[test]
fn truncated_xml_fails() {
    let (output, created) = run_broken(&FIXTURE_MPD[..FIXTURE_MPD.len() / 2]);
    assert!(!output.status.success());
    assert!(!created);
}

#[test]
fn missing_input_file_fails() {
    let output = run(&["does/not/exist.mpd", "-u", "x.mp4"]);
    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    assert!(stderr(&output).contains("Reading MPD file"));
}
