//! Integration tests for `gogen.toml` and its effect on loading.

use gogen::config::{load_from_path, load_from_str, Config, ConfigError};
use gogen::{ErrorKind, FileSet, Loader};
use std::fs;
use tempfile::TempDir;

fn write(dir: &TempDir, name: &str, text: &str) {
    fs::write(dir.path().join(name), text).unwrap();
}

fn file_names(fs: &FileSet) -> Vec<String> {
    fs.files()
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect()
}

fn platform_package() -> TempDir {
    let dir = TempDir::new().unwrap();
    write(&dir, "common.go", "package sys\n\nconst Name = name\n");
    write(&dir, "name_linux.go", "package sys\n\nconst name = \"linux\"\n");
    write(&dir, "name_windows.go", "package sys\n\nconst name = \"windows\"\n");
    write(
        &dir,
        "name_other.go",
        "//go:build !linux && !windows\n\npackage sys\n\nconst name = \"other\"\n",
    );
    write(
        &dir,
        "modern.go",
        "//go:build go1.21 && (amd64 || arm64)\n\npackage sys\n\nconst Modern = true\n",
    );
    dir
}

fn load(dir: &TempDir, toml: &str) -> FileSet {
    let config = load_from_str(toml).unwrap();
    Loader::new(config).load_dir(dir.path()).unwrap()
}

#[test]
fn goos_selects_platform_files() {
    let dir = platform_package();

    let linux = load(&dir, "[build]\ngoos = \"linux\"\ngoarch = \"amd64\"\n");
    assert_eq!(file_names(&linux), vec!["common.go", "modern.go", "name_linux.go"]);

    let windows = load(&dir, "[build]\ngoos = \"windows\"\ngoarch = \"386\"\n");
    assert_eq!(file_names(&windows), vec!["common.go", "name_windows.go"]);

    let plan9 = load(
        &dir,
        "[build]\ngoos = \"plan9\"\ngoarch = \"arm64\"\ngo_version = \"1.20\"\n",
    );
    assert_eq!(file_names(&plan9), vec!["common.go", "name_other.go"]);
}

#[test]
fn android_satisfies_linux() {
    let dir = platform_package();
    let android = load(&dir, "[build]\ngoos = \"android\"\ngoarch = \"arm64\"\n");
    assert_eq!(file_names(&android), vec!["common.go", "modern.go", "name_linux.go"]);
}

#[test]
fn malformed_build_line_fails_loading() {
    let dir = TempDir::new().unwrap();
    write(&dir, "a.go", "//go:build linux &&\n\npackage p\n");
    let err = FileSet::from_dir(dir.path()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Parse);
    assert!(err.to_string().contains("a.go:1:1: parsing //go:build line"));
}

#[test]
fn unused_reporting_can_be_disabled() {
    let src = "package p\n\nimport \"strings\"\n\nfunc f() {\n\tx := 1\n}\n";
    let err = FileSet::from_texts([src]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Resolve);

    let config = load_from_str("[check]\nreport_unused = false\n").unwrap();
    assert!(Loader::new(config).load_texts([src]).is_ok());
}

#[test]
fn stubs_name_packages() {
    let config = load_from_str(
        r#"
[packages."gopkg.in/yaml.v3"]
name = "yaml"
funcs = ["Marshal", "Unmarshal"]
types = ["Node"]
"#,
    )
    .unwrap();
    let fs = Loader::new(config)
        .load_texts([
            "package p\n\nimport \"gopkg.in/yaml.v3\"\n\nvar n yaml.Node\n\nfunc f() { yaml.Marshal(n) }\n",
        ])
        .unwrap();
    let import = &fs.package().imports[0];
    assert_eq!(import.name, "yaml");
    assert!(!import.is_opaque());
}

#[test]
fn config_file_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("gogen.toml");
    fs::write(&path, "[check]\nstrict_imports = true\n").unwrap();

    let config = load_from_path(&path).unwrap();
    assert!(config.check.strict_imports);
    assert_eq!(config.build, Config::default().build);

    fs::write(&path, "[check\n").unwrap();
    match load_from_path(&path) {
        Err(ConfigError::Toml { path: Some(p), .. }) => assert_eq!(p, path),
        other => panic!("unexpected result: {other:?}"),
    }
}
