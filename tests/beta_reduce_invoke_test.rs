// SPDX-License-Identifier: Apache-2.0

//! Tests that invoke the `beta-reduce` binary.

use std::io::Write;
use std::process::Command;

use pretty_assertions::assert_eq;

const CURRIED: &str = "%1 = param x : bv8
%2 = param y : bv8
%3 = add %1 %2
%4 = lambda %2 %3
%5 = lambda %1 %4
%6 = var a : bv8
%7 = apply %5 %6
%8 = var b : bv8
%9 = apply %7 %8
";

fn write_input(text: &str) -> tempfile::TempPath {
    let mut temp_file = tempfile::Builder::new().suffix(".beta").tempfile().unwrap();
    write!(temp_file, "{}", text).unwrap();
    temp_file.into_temp_path()
}

fn run(args: &[&str]) -> (String, String, bool) {
    let output = Command::new(env!("CARGO_BIN_EXE_beta-reduce"))
        .args(args)
        .output()
        .unwrap();
    (
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
        output.status.success(),
    )
}

#[test]
fn test_invoke_chains_mode() {
    let _ = env_logger::builder().is_test(true).try_init();
    let temp_path = write_input(CURRIED);
    let (stdout, stderr, ok) = run(&["--mode=chains", temp_path.to_str().unwrap()]);
    assert!(ok, "stdout: {}\nstderr: {}", stdout, stderr);
    let text: String = stdout
        .lines()
        .filter(|l| !l.starts_with("//"))
        .map(|l| format!("{}\n", l))
        .collect();
    assert_eq!(
        text,
        "%1 = var a : bv8\n%2 = var b : bv8\n%3 = add %1 %2\n"
    );
    assert!(stdout.contains("// contractions: 1"), "{}", stdout);
    assert!(stdout.contains("// normal form: true"), "{}", stdout);
}

#[test]
fn test_invoke_stats_json() {
    let temp_path = write_input(CURRIED);
    let (stdout, stderr, ok) = run(&[
        "--mode=bounded",
        "--bound=1",
        "--fold=false",
        "--stats-json",
        temp_path.to_str().unwrap(),
    ]);
    assert!(ok, "stdout: {}\nstderr: {}", stdout, stderr);
    let json_start = stdout.find('{').unwrap();
    let stats: serde_json::Value = serde_json::from_str(&stdout[json_start..]).unwrap();
    assert_eq!(stats["max_depth"], 1);
}

#[test]
fn test_invoke_reports_parse_error() {
    let temp_path = write_input("%1 = var a : bv8\n%2 = add %1 %9\n");
    let (stdout, stderr, ok) = run(&[temp_path.to_str().unwrap()]);
    assert!(!ok, "stdout: {}", stdout);
    assert!(stderr.contains("undefined node %9"), "stderr: {}", stderr);
    assert!(stderr.contains("line 2"), "stderr: {}", stderr);
}

#[test]
fn test_invoke_version() {
    let (stdout, _, ok) = run(&["--version"]);
    assert!(ok);
    assert_eq!(stdout, format!("beta-reduce {}\n", env!("CARGO_PKG_VERSION")));
    assert_eq!(env!("CARGO_PKG_VERSION"), "0.1.0");
}
