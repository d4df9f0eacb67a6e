use std::fs;

use assert_cmd::Command;
use predicates::str::contains;

mod common;
use common::{SEX_AGE_CSV, TestWorkspace};

const EXPECTED_OUTPUT: &str = "Year,Sex,Age,Value\n\
2015,m,16-to-24,1.5\n\
2015,f,all,2.5\n\
2016,t,25-to-34,\n\
2016,t,all,4\n";

fn filler() -> Command {
    Command::cargo_bin("sdg-data-filler").expect("binary exists")
}

#[test]
fn apply_writes_overridden_csv() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("input.csv", SEX_AGE_CSV);
    let config = workspace.write_overrides(&["indicator_1-1-1"]);
    let output = workspace.path().join("nested").join("output.csv");

    filler()
        .args([
            "apply",
            "-i",
            input.to_str().unwrap(),
            "-c",
            config.to_str().unwrap(),
            "-k",
            "indicator_1-1-1",
            "-o",
            output.to_str().unwrap(),
        ])
        .assert()
        .success();

    assert_eq!(fs::read_to_string(&output).unwrap(), EXPECTED_OUTPUT);
}

#[test]
fn apply_streams_to_stdout_by_default() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("input.csv", SEX_AGE_CSV);
    let config = workspace.write_overrides(&["key"]);

    filler()
        .args([
            "apply",
            "-i",
            input.to_str().unwrap(),
            "-c",
            config.to_str().unwrap(),
            "-k",
            "key",
        ])
        .assert()
        .success()
        .stdout(EXPECTED_OUTPUT);
}

#[test]
fn apply_refuses_sentinel_values() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("input.csv", "Year,Sex,Age,Value\n2015,FILL_NA,All,1\n");
    let config = workspace.write_overrides(&["key"]);
    let output = workspace.path().join("output.csv");

    filler()
        .args([
            "apply",
            "-i",
            input.to_str().unwrap(),
            "-c",
            config.to_str().unwrap(),
            "-k",
            "key",
            "-o",
            output.to_str().unwrap(),
        ])
        .assert()
        .failure()
        .stderr(contains("Value 'FILL_NA' has been found in the dataset"));

    assert!(!output.exists());
}

#[test]
fn apply_rejects_unknown_identifier() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("input.csv", SEX_AGE_CSV);
    let config = workspace.write_overrides(&["key"]);

    filler()
        .args([
            "apply",
            "-i",
            input.to_str().unwrap(),
            "-c",
            config.to_str().unwrap(),
            "-k",
            "other",
        ])
        .assert()
        .failure()
        .stderr(contains("No override specification for 'other'"));
}

#[test]
fn run_processes_every_configured_dataset() {
    let workspace = TestWorkspace::new();
    let first = workspace.write("indicator_1-1-1.csv", SEX_AGE_CSV);
    let second = workspace.write(
        "indicator_2-1-1.csv",
        "<p>There is no data for this indicator yet</p>",
    );
    let first_id = first.display().to_string();
    let second_id = second.display().to_string();
    let config = workspace.write_overrides(&[first_id.as_str(), second_id.as_str()]);
    let out_dir = workspace.path().join("out");

    filler()
        .args([
            "run",
            "-c",
            config.to_str().unwrap(),
            "-o",
            out_dir.to_str().unwrap(),
            "--table",
        ])
        .assert()
        .success()
        .stdout(contains("indicator_1-1-1.csv  true"))
        .stdout(contains("indicator_2-1-1.csv  false"))
        .stdout(contains("no data available"));

    assert_eq!(
        fs::read_to_string(out_dir.join("indicator_1-1-1.csv")).unwrap(),
        EXPECTED_OUTPUT
    );
    assert!(!out_dir.join("indicator_2-1-1.csv").exists());
}

#[test]
fn run_fails_on_integrity_errors_after_writing_the_rest() {
    let workspace = TestWorkspace::new();
    let good = workspace.write("indicator_1-1-1.csv", SEX_AGE_CSV);
    let bad = workspace.write("indicator_3-1-1.csv", "Year,Sex,Age,Value\n2015,to,All,1\n");
    let good_id = good.display().to_string();
    let bad_id = bad.display().to_string();
    let config = workspace.write_overrides(&[good_id.as_str(), bad_id.as_str()]);
    let out_dir = workspace.path().join("out");

    filler()
        .args([
            "run",
            "-c",
            config.to_str().unwrap(),
            "-o",
            out_dir.to_str().unwrap(),
            "--url",
            &bad_id,
            "--url",
            &good_id,
        ])
        .assert()
        .failure()
        .stderr(contains("1 dataset(s) failed integrity checks"))
        .stderr(contains("indicator_3-1-1.csv"));

    assert!(out_dir.join("indicator_1-1-1.csv").exists());
    assert!(!out_dir.join("indicator_3-1-1.csv").exists());
}

#[test]
fn run_reports_missing_config_file() {
    let workspace = TestWorkspace::new();
    let missing = workspace.path().join("absent.yaml");

    filler()
        .args(["run", "-c", missing.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(contains("Loading overrides"));
}

#[test]
fn codelists_builds_rooted_notations() {
    let workspace = TestWorkspace::new();
    let values = workspace.write(
        "sex-values.csv",
        "Value,Translation\nFemale,Female\nMale,Male\nNot stated*,Not stated\n",
    );
    let out_dir = workspace.path().join("codelists");
    let source = format!("sex.csv={}", values.display());

    filler()
        .args([
            "codelists",
            "-o",
            out_dir.to_str().unwrap(),
            "--source",
            &source,
        ])
        .assert()
        .success();

    assert_eq!(
        fs::read_to_string(out_dir.join("sex.csv")).unwrap(),
        "Label,Notation,Parent Notation,Sort Priority\n\
         All,all,,0\n\
         Female,female,all,1\n\
         Male,male,all,2\n"
    );
}
