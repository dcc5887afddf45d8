//! Integration tests for the `gogen` command-line interface.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

/// A package with two source files and a test file.
fn setup_package() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("shapes.go"),
        r#"package shapes

import "fmt"

type Point struct {
	X, Y int
}

func (p Point) String() string {
	return fmt.Sprintf("(%d, %d)", p.X, p.Y)
}
"#,
    )
    .unwrap();
    fs::write(
        dir.path().join("consts.go"),
        r#"package shapes

const (
	Small = iota
	Large
)

var Origin = Point{}

func Dist(a, b Point) int {
	return abs(a.X-b.X) + abs(a.Y-b.Y)
}

func abs(x int) int {
	if x < 0 {
		return -x
	}
	return x
}
"#,
    )
    .unwrap();
    fs::write(
        dir.path().join("shapes_test.go"),
        "package shapes\n\nvar broken = undefined\n",
    )
    .unwrap();
    dir
}

fn gogen(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_gogen"))
        .args(args)
        .current_dir(dir)
        .env("NO_COLOR", "1")
        .output()
        .unwrap()
}

#[test]
fn help_lists_subcommands() {
    let dir = TempDir::new().unwrap();
    let output = gogen(dir.path(), &["--help"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("decls"));
    assert!(stdout.contains("check"));
    assert!(stdout.contains("find"));
}

#[test]
fn decls_lists_current_directory() {
    let dir = setup_package();
    let output = gogen(dir.path(), &["decls"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    // consts.go sorts before shapes.go
    assert!(lines[0].starts_with("consts.go:4:2:"), "{stdout}");
    assert!(stdout.contains("Small"));
    assert!(stdout.contains("Point.String"));
    assert!(stdout.contains("shapes.go:5:6: type  Point"));
}

#[test]
fn decls_json_filters_by_kind() {
    let dir = setup_package();
    let output = gogen(
        dir.path(),
        &["decls", "--kind", "func", "--json", dir.path().to_str().unwrap()],
    );
    assert!(output.status.success());

    let rows: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let names: Vec<&str> = rows
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Dist", "abs", "Point.String"]);
    assert_eq!(rows[0]["kind"], "func");
}

#[test]
fn check_reports_ok() {
    let dir = setup_package();
    let output = gogen(dir.path(), &["check"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("ok package shapes: 2 files"), "{stdout}");
}

#[test]
fn check_reports_diagnostics() {
    let dir = setup_package();
    fs::write(
        dir.path().join("bad.go"),
        "package shapes\n\nfunc bad() int {\n\tx := 1\n}\n",
    )
    .unwrap();

    let output = gogen(dir.path(), &["check"]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("bad.go:4:2: declared and not used: x"), "{stderr}");
    assert!(stderr.contains("missing return"));
}

#[test]
fn find_prints_matches_with_captures() {
    let dir = setup_package();
    let output = gogen(dir.path(), &["find", "abs($X)"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("consts.go:11:9: abs(a.X-b.X)"), "{stdout}");
    assert!(stdout.contains("$X = a.Y-b.Y"));
}

#[test]
fn config_file_selects_build_tags() {
    let dir = setup_package();
    fs::write(
        dir.path().join("extra.go"),
        "//go:build extra\n\npackage shapes\n\nfunc Extra() {}\n",
    )
    .unwrap();

    let output = gogen(dir.path(), &["decls", "--kind", "func"]);
    assert!(!String::from_utf8_lossy(&output.stdout).contains("Extra"));

    fs::write(dir.path().join("gogen.toml"), "[build]\ntags = [\"extra\"]\n").unwrap();
    let output = gogen(dir.path(), &["decls", "--kind", "func"]);
    assert!(String::from_utf8_lossy(&output.stdout).contains("Extra"));
}

#[test]
fn missing_input_fails() {
    let dir = TempDir::new().unwrap();
    let output = gogen(dir.path(), &["check", "nope.go"]);
    assert!(!output.status.success());
    let output = gogen(dir.path(), &["decls"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("no buildable Go source files"));
}
