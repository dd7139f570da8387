use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const SNAPSHOT: &str = r#"{
    "format": {
        "filename": "clip.mkv",
        "format_name": "matroska,webm",
        "duration": 2500000,
        "probe_score": 100
    },
    "streams": [
        {
            "index": 0,
            "codec_name": "vp9",
            "codec_type": "video",
            "time_base": {"num": 1, "den": 1000},
            "tags": {"language": "und"}
        }
    ]
}"#;

fn probe_report() -> Command {
    let mut cmd = Command::cargo_bin("probe-report").unwrap();
    cmd.env_remove("PROBE_REPORT_CONFIG").env_remove("RUST_LOG");
    cmd
}

fn write_snapshot(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("snapshot.json");
    fs::write(&path, SNAPSHOT).unwrap();
    path
}

#[test]
fn test_formats_command() {
    probe_report()
        .arg("formats")
        .assert()
        .success()
        .stdout("default\ncompact\ncsv\nflat\nini\njson\nxml\n");
}

#[test]
fn test_sections_command() {
    probe_report()
        .arg("sections")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("Sections:\n"))
        .stdout(predicate::str::contains("packets_and_frames"))
        .stdout(predicate::str::contains("tags/stream_tags"));
}

#[test]
fn test_render_flat_to_stdout() {
    let dir = TempDir::new().unwrap();
    let input = write_snapshot(dir.path());

    probe_report()
        .args(["render", "--of", "flat", "--show-entries", "format=duration,format_name"])
        .arg("--input")
        .arg(&input)
        .assert()
        .success()
        .stdout("format.format_name=\"matroska,webm\"\nformat.duration=\"2.500000\"\n");
}

#[test]
fn test_render_json_to_file() {
    let dir = TempDir::new().unwrap();
    let input = write_snapshot(dir.path());
    let output = dir.path().join("report.json");

    probe_report()
        .args(["render", "--of", "json", "--show-streams", "--show-format"])
        .arg("--input")
        .arg(&input)
        .arg("--output")
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    let report: serde_json::Value = serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(report["streams"][0]["codec_name"], "vp9");
    assert_eq!(report["streams"][0]["time_base"], "1/1000");
    assert_eq!(report["streams"][0]["tags"]["language"], "und");
    assert_eq!(report["format"]["duration"], "2.500000");
}

#[test]
fn test_render_uses_config_file() {
    let dir = TempDir::new().unwrap();
    let input = write_snapshot(dir.path());
    let config = dir.path().join("report.toml");
    fs::write(
        &config,
        "[report]\noutput_format = \"csv=p=0\"\nshow_entries = \"stream=index,codec_name\"\n",
    )
    .unwrap();

    probe_report()
        .arg("render")
        .arg("--input")
        .arg(&input)
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout("0,vp9\n");
}

#[test]
fn test_command_line_overrides_config_file() {
    let dir = TempDir::new().unwrap();
    let input = write_snapshot(dir.path());
    let config = dir.path().join("report.toml");
    fs::write(
        &config,
        "[report]\noutput_format = \"json\"\nshow_entries = \"stream=codec_name\"\n",
    )
    .unwrap();

    probe_report()
        .args(["render", "--of", "default=nw=1"])
        .arg("--input")
        .arg(&input)
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout("codec_name=vp9\n");
}

#[test]
fn test_unknown_writer_fails_without_output() {
    let dir = TempDir::new().unwrap();
    let input = write_snapshot(dir.path());

    probe_report()
        .args(["render", "--of", "yaml", "--show-format"])
        .arg("--input")
        .arg(&input)
        .assert()
        .failure()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("Unknown output format with name 'yaml'"));
}

#[test]
fn test_bitexact_conflicts_with_versions() {
    let dir = TempDir::new().unwrap();
    let input = write_snapshot(dir.path());

    probe_report()
        .args(["render", "--bitexact", "--show-versions"])
        .arg("--input")
        .arg(&input)
        .assert()
        .failure()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("incompatible"));
}

#[test]
fn test_missing_snapshot_fails() {
    let dir = TempDir::new().unwrap();

    probe_report()
        .args(["render", "--show-format"])
        .arg("--input")
        .arg(dir.path().join("missing.json"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load snapshot"));
}

#[test]
fn test_render_packet_data_hash() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("packets.json");
    fs::write(
        &input,
        r#"{"streams": [{"index": 0, "codec_type": "audio"}],
            "packets": [{"stream_index": 0, "pts": 0, "size": 3, "data": [97, 98, 99]}]}"#,
    )
    .unwrap();

    probe_report()
        .args(["render", "--of", "csv=p=0", "--show-entries", "packet=size,data_hash"])
        .args(["--show-data-hash", "MD5"])
        .arg("--input")
        .arg(&input)
        .assert()
        .success()
        .stdout("3,MD5:900150983cd24fb0d6963f7d28e17f72\n");
}
