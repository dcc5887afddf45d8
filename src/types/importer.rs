//! Import resolution.
//!
//! The resolver never reads other packages from disk. An [`Importer`] maps an
//! import path to an [`ImportedPackage`]: either a stub whose member names
//! are declared up front (usually from `gogen.toml`), or an opaque package
//! whose exported members resolve permissively.

use crate::config::Config;
use std::collections::{BTreeSet, HashMap};
use thiserror::Error;

/// Category of a declared stub member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    Type,
    Func,
    Var,
    Const,
}

/// Member names of a stub package.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Members {
    pub types: BTreeSet<String>,
    pub funcs: BTreeSet<String>,
    pub vars: BTreeSet<String>,
    pub consts: BTreeSet<String>,
}

impl Members {
    pub fn kind_of(&self, name: &str) -> Option<MemberKind> {
        if self.types.contains(name) {
            Some(MemberKind::Type)
        } else if self.funcs.contains(name) {
            Some(MemberKind::Func)
        } else if self.vars.contains(name) {
            Some(MemberKind::Var)
        } else if self.consts.contains(name) {
            Some(MemberKind::Const)
        } else {
            None
        }
    }

    /// Every member name with its category, sorted by name.
    pub fn all(&self) -> Vec<(&str, MemberKind)> {
        let mut all: Vec<_> = self
            .types
            .iter()
            .map(|n| (n.as_str(), MemberKind::Type))
            .chain(self.funcs.iter().map(|n| (n.as_str(), MemberKind::Func)))
            .chain(self.vars.iter().map(|n| (n.as_str(), MemberKind::Var)))
            .chain(self.consts.iter().map(|n| (n.as_str(), MemberKind::Const)))
            .collect();
        all.sort_by(|a, b| a.0.cmp(b.0));
        all
    }
}

/// An imported package as seen by the resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedPackage {
    pub path: String,
    pub name: String,
    /// `None` for an opaque package.
    pub members: Option<Members>,
}

impl ImportedPackage {
    pub fn opaque(path: &str) -> Self {
        Self {
            path: path.to_string(),
            name: default_name(path),
            members: None,
        }
    }

    pub fn is_opaque(&self) -> bool {
        self.members.is_none()
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ImportError {
    #[error("could not import {path} (package is not declared in the configuration)")]
    Unknown { path: String },

    #[error("invalid import path: {path:?}")]
    InvalidPath { path: String },
}

/// Resolves import paths for the resolver.
pub trait Importer {
    fn import(&self, path: &str) -> Result<ImportedPackage, ImportError>;
}

/// Importer backed by declared stubs, falling back to opaque packages
/// unless strict.
#[derive(Debug, Clone, Default)]
pub struct StubImporter {
    stubs: HashMap<String, ImportedPackage>,
    strict: bool,
}

impl StubImporter {
    pub fn new(strict: bool) -> Self {
        Self {
            stubs: HashMap::new(),
            strict,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let mut importer = Self::new(config.check.strict_imports);
        for (path, stub) in &config.packages {
            let members = Members {
                types: stub.types.iter().cloned().collect(),
                funcs: stub.funcs.iter().cloned().collect(),
                vars: stub.vars.iter().cloned().collect(),
                consts: stub.consts.iter().cloned().collect(),
            };
            importer.stubs.insert(
                path.clone(),
                ImportedPackage {
                    path: path.clone(),
                    name: stub.name.clone().unwrap_or_else(|| default_name(path)),
                    members: Some(members),
                },
            );
        }
        importer
    }

    pub fn with_package(mut self, package: ImportedPackage) -> Self {
        self.stubs.insert(package.path.clone(), package);
        self
    }
}

impl Importer for StubImporter {
    fn import(&self, path: &str) -> Result<ImportedPackage, ImportError> {
        if path.is_empty() || path.contains(['\\', ' ', '!', '"']) {
            return Err(ImportError::InvalidPath {
                path: path.to_string(),
            });
        }
        if let Some(stub) = self.stubs.get(path) {
            return Ok(stub.clone());
        }
        if self.strict && path != "C" && path != "unsafe" {
            return Err(ImportError::Unknown {
                path: path.to_string(),
            });
        }
        Ok(ImportedPackage::opaque(path))
    }
}

/// The package name conventionally used for an import path: the last
/// element, skipping a major-version suffix and dropping `go-` prefixes and
/// `.vN` suffixes.
pub fn default_name(path: &str) -> String {
    let mut elems: Vec<&str> = path.split('/').filter(|e| !e.is_empty()).collect();
    if elems.len() > 1 {
        if let Some(last) = elems.last() {
            if is_major_version(last) {
                elems.pop();
            }
        }
    }
    let last = elems.last().copied().unwrap_or(path);
    let last = last.strip_prefix("go-").unwrap_or(last);
    let last = last.split('.').next().unwrap_or(last);
    last.chars()
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

fn is_major_version(elem: &str) -> bool {
    elem.strip_prefix('v')
        .is_some_and(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_names() {
        assert_eq!(default_name("fmt"), "fmt");
        assert_eq!(default_name("net/http"), "http");
        assert_eq!(default_name("github.com/go-yaml/yaml/v3"), "yaml");
        assert_eq!(default_name("gopkg.in/yaml.v2"), "yaml");
        assert_eq!(default_name("github.com/mattn/go-sqlite3"), "sqlite3");
    }

    #[test]
    fn opaque_fallback_and_strict_mode() {
        let lenient = StubImporter::new(false);
        assert!(lenient.import("fmt").unwrap().is_opaque());

        let strict = StubImporter::new(true);
        assert_eq!(
            strict.import("fmt"),
            Err(ImportError::Unknown { path: "fmt".into() })
        );
        assert!(strict.import("unsafe").is_ok());
    }

    #[test]
    fn stubs_take_precedence() {
        let members = Members {
            funcs: ["Println".to_string()].into_iter().collect(),
            ..Members::default()
        };
        let importer = StubImporter::new(true).with_package(ImportedPackage {
            path: "fmt".into(),
            name: "fmt".into(),
            members: Some(members),
        });
        let pkg = importer.import("fmt").unwrap();
        assert_eq!(
            pkg.members.unwrap().kind_of("Println"),
            Some(MemberKind::Func)
        );
    }

    #[test]
    fn invalid_paths() {
        let importer = StubImporter::new(false);
        assert!(matches!(
            importer.import(""),
            Err(ImportError::InvalidPath { .. })
        ));
    }
}
