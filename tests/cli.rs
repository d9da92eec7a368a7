use assert_cmd::Command;
use predicates::prelude::*;

mod common;

#[test]
fn runs() {
    let mut cmd = Command::cargo_bin("slideset").unwrap();
    cmd.assert().success();
}

#[test]
fn outputs_tool_name() {
    let mut cmd = Command::cargo_bin("slideset").unwrap();
    cmd.arg("-V");
    cmd.assert().success().stdout("slideset 0.1.0\n");
}

// Commands subcommand tests

#[test]
fn commands_lists_every_builtin() {
    let mut cmd = Command::cargo_bin("slideset").unwrap();
    cmd.arg("commands");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("RegionStats:"))
        .stdout(predicate::str::contains("ThresholdSegmentation:"))
        .stdout(predicate::str::contains("in  image (Image)"))
        .stdout(predicate::str::contains("out size (Integer, per region)"));
}

#[test]
fn commands_json_output_format() {
    let mut cmd = Command::cargo_bin("slideset").unwrap();
    cmd.args(["commands", "--report", "json"]);
    let output = cmd.assert().success().get_output().stdout.clone();
    let listing: serde_json::Value = serde_json::from_slice(&output).unwrap();
    let commands = listing.as_array().unwrap();
    assert_eq!(commands.len(), 12);
    assert_eq!(commands[0]["name"], "RegionStats");
    assert_eq!(commands[0]["inputs"][0]["type"], "Image");
}

// Svg subcommand tests

#[test]
fn svg_prints_regions() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cells.svg");
    common::write_text(
        &path,
        r#"<svg xmlns="http://www.w3.org/2000/svg">
             <rect x="1" y="2" width="3" height="4"/>
             <circle cx="5" cy="5" r="2"/>
           </svg>"#,
    );

    let mut cmd = Command::cargo_bin("slideset").unwrap();
    cmd.arg("svg").arg(&path);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("2 region(s)"))
        .stdout(predicate::str::contains("[0] rectangle"))
        .stdout(predicate::str::contains("[1] ellipse"));
}

#[test]
fn svg_strict_fails_on_skipped_nodes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.svg");
    common::write_text(
        &path,
        r#"<svg><rect width="1"/><line x2="3"/></svg>"#,
    );

    let mut cmd = Command::cargo_bin("slideset").unwrap();
    cmd.arg("svg").arg(&path).args(["--report", "json", "--strict"]);
    cmd.assert()
        .failure()
        .stdout(predicate::str::contains("\"warning_count\": 1"))
        .stderr(predicate::str::contains("strict mode"));
}

#[test]
fn report_format_reads_from_environment() {
    let mut cmd = Command::cargo_bin("slideset").unwrap();
    cmd.arg("commands").env("SLIDESET_REPORT", "json");
    let output = cmd.assert().success().get_output().stdout.clone();
    let listing: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(listing.as_array().unwrap().len(), 12);
}

#[test]
fn svg_missing_file_fails() {
    let mut cmd = Command::cargo_bin("slideset").unwrap();
    cmd.args(["svg", "nonexistent_file.svg"]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Data not available"));
}

// Run subcommand tests

#[test]
fn run_writes_result_table_and_warns_for_missing_rows() {
    let dir = tempfile::tempdir().unwrap();
    common::write_cells_fixture(dir.path());
    let skeleton = dir.path().join("stats.yaml");
    common::write_text(&skeleton, common::REGION_STATS_YAML);

    let mut cmd = Command::cargo_bin("slideset").unwrap();
    cmd.arg("run")
        .arg(dir.path().join("cells.csv"))
        .arg(&skeleton);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("RegionStats: wrote 2 row(s)"))
        .stdout(predicate::str::contains("DataUnavailable"));

    let written = std::fs::read_to_string(dir.path().join("cells-RegionStats.csv")).unwrap();
    let mut lines = written.lines();
    assert_eq!(
        lines.next(),
        Some("image:file:image/png,rois:file:application/x-slideset-roiset,size:int,red_sum:double")
    );
    assert_eq!(lines.next(), Some("a.png,a.roiset,121,605"));
    assert_eq!(lines.next(), Some("a.png,a.roiset,4,20"));
    assert_eq!(lines.next(), None);
}

#[test]
fn run_strict_fails_when_rows_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    common::write_cells_fixture(dir.path());
    let skeleton = dir.path().join("stats.yaml");
    common::write_text(&skeleton, common::REGION_STATS_YAML);
    let output = dir.path().join("out").join("result.csv");

    let mut cmd = Command::cargo_bin("slideset").unwrap();
    cmd.arg("run")
        .arg(dir.path().join("cells.csv"))
        .arg(&skeleton)
        .arg("-o")
        .arg(&output)
        .args(["--report", "json", "--strict"]);
    cmd.assert()
        .failure()
        .stdout(predicate::str::contains("\"rows\": 2"))
        .stdout(predicate::str::contains("\"warning_count\": 1"));
    assert!(output.exists());
}

#[test]
fn run_unknown_command_fails() {
    let dir = tempfile::tempdir().unwrap();
    common::write_cells_fixture(dir.path());
    let skeleton = dir.path().join("bad.json");
    common::write_text(&skeleton, r#"{"command": "Deconvolve"}"#);

    let mut cmd = Command::cargo_bin("slideset").unwrap();
    cmd.arg("run")
        .arg(dir.path().join("cells.csv"))
        .arg(&skeleton);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Unknown command: 'Deconvolve'"));
}

#[test]
fn run_unbound_required_input_fails() {
    let dir = tempfile::tempdir().unwrap();
    common::write_cells_fixture(dir.path());
    let skeleton = dir.path().join("lengths.json");
    common::write_text(&skeleton, r#"{"command": "RoiLengths"}"#);

    let mut cmd = Command::cargo_bin("slideset").unwrap();
    cmd.arg("run")
        .arg(dir.path().join("cells.csv"))
        .arg(&skeleton);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("No compatible reader"));
}
