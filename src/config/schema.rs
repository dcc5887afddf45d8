use crate::config::version::GoVersion;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;

/// Contents of `gogen.toml`.
#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub build: BuildConfig,
    #[serde(default)]
    pub check: CheckConfig,
    /// Import path to declared members.
    #[serde(default)]
    pub packages: BTreeMap<String, PackageStub>,
}

impl Config {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if self.build.goos.trim().is_empty() {
            issues.push(ValidationIssue::EmptyField { field: "build.goos" });
        }
        if self.build.goarch.trim().is_empty() {
            issues.push(ValidationIssue::EmptyField {
                field: "build.goarch",
            });
        }
        if let Err(message) = GoVersion::parse(&self.build.go_version) {
            issues.push(ValidationIssue::InvalidValue {
                field: "build.go_version",
                message,
            });
        }
        for tag in &self.build.tags {
            if !is_valid_tag(tag) {
                issues.push(ValidationIssue::InvalidValue {
                    field: "build.tags",
                    message: format!("{tag:?} is not a valid build tag"),
                });
            }
        }

        for (path, stub) in &self.packages {
            if path.trim().is_empty() {
                issues.push(ValidationIssue::InvalidPackage {
                    path: path.clone(),
                    message: "import path is empty".to_string(),
                });
            }
            if let Some(name) = &stub.name {
                if !is_identifier(name) {
                    issues.push(ValidationIssue::InvalidPackage {
                        path: path.clone(),
                        message: format!("package name {name:?} is not an identifier"),
                    });
                }
            }
            let mut seen = std::collections::HashSet::new();
            for member in stub.members() {
                if !is_identifier(member) {
                    issues.push(ValidationIssue::InvalidPackage {
                        path: path.clone(),
                        message: format!("member {member:?} is not an identifier"),
                    });
                } else if !seen.insert(member) {
                    issues.push(ValidationIssue::InvalidPackage {
                        path: path.clone(),
                        message: format!("member {member} declared more than once"),
                    });
                }
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }
}

/// Build context used for directory discovery.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    pub goos: String,
    pub goarch: String,
    /// Newest Go release whose `goN.M` tag is satisfied, as `"1.N"`.
    pub go_version: String,
    pub cgo: bool,
    pub tags: Vec<String>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            goos: host_goos().to_string(),
            goarch: host_goarch().to_string(),
            go_version: "1.22".to_string(),
            cgo: false,
            tags: Vec::new(),
        }
    }
}

/// Resolver switches.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct CheckConfig {
    /// Resolve declarations only; function bodies are not checked.
    pub ignore_func_bodies: bool,
    /// Report unused imports, variables and labels.
    pub report_unused: bool,
    /// Fail on import paths that are not declared under `[packages]`.
    pub strict_imports: bool,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            ignore_func_bodies: false,
            report_unused: true,
            strict_imports: false,
        }
    }
}

/// Declared members of an imported package.
#[derive(Debug, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct PackageStub {
    pub name: Option<String>,
    pub types: Vec<String>,
    pub funcs: Vec<String>,
    pub vars: Vec<String>,
    pub consts: Vec<String>,
}

impl PackageStub {
    pub fn members(&self) -> impl Iterator<Item = &str> {
        self.types
            .iter()
            .chain(&self.funcs)
            .chain(&self.vars)
            .chain(&self.consts)
            .map(String::as_str)
    }
}

/// GOOS value of the running system.
pub fn host_goos() -> &'static str {
    match std::env::consts::OS {
        "macos" => "darwin",
        other => other,
    }
}

/// GOARCH value of the running system.
pub fn host_goarch() -> &'static str {
    match std::env::consts::ARCH {
        "x86_64" => "amd64",
        "x86" => "386",
        "aarch64" => "arm64",
        "powerpc64" => "ppc64",
        "loongarch64" => "loong64",
        other => other,
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_')
}

fn is_valid_tag(tag: &str) -> bool {
    !tag.is_empty()
        && tag
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '.')
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    EmptyField {
        field: &'static str,
    },
    InvalidValue {
        field: &'static str,
        message: String,
    },
    InvalidPackage {
        path: String,
        message: String,
    },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::EmptyField { field } => write!(f, "field '{field}' must not be empty"),
            ValidationIssue::InvalidValue { field, message } => {
                write!(f, "field '{field}' is invalid: {message}")
            }
            ValidationIssue::InvalidPackage { path, message } => {
                write!(f, "package '{path}' has invalid configuration: {message}")
            }
        }
    }
}
