use crate::config::schema::{Config, ValidationError};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Name looked up by [`discover`] in the working directory.
pub const CONFIG_FILE: &str = "gogen.toml";

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Toml {
        path: Option<PathBuf>,
        source: toml_edit::de::Error,
    },
    Validation {
        path: Option<PathBuf>,
        source: ValidationError,
    },
}

impl ConfigError {
    fn with_path(self, path: &Path) -> Self {
        let path = path.to_path_buf();
        match self {
            ConfigError::Io { .. } => self,
            ConfigError::Toml { path: None, source } => ConfigError::Toml {
                path: Some(path),
                source,
            },
            ConfigError::Validation { path: None, source } => ConfigError::Validation {
                path: Some(path),
                source,
            },
            other => other,
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(f, "failed to read config from {}: {}", path.display(), source)
            }
            ConfigError::Toml { path, source } => match path {
                Some(path) => write!(
                    f,
                    "failed to parse config TOML ({}): {}",
                    path.display(),
                    source
                ),
                None => write!(f, "failed to parse config TOML: {}", source),
            },
            ConfigError::Validation { path, source } => match path {
                Some(path) => write!(f, "invalid config ({}): {}", path.display(), source),
                None => write!(f, "invalid config: {}", source),
            },
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Toml { source, .. } => Some(source),
            ConfigError::Validation { source, .. } => Some(source),
        }
    }
}

pub fn load_from_str(input: &str) -> Result<Config, ConfigError> {
    let config: Config = toml_edit::de::from_str(input)
        .map_err(|source| ConfigError::Toml { path: None, source })?;
    config
        .validate()
        .map_err(|source| ConfigError::Validation { path: None, source })?;
    Ok(config)
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load_from_str(&contents).map_err(|error| error.with_path(path))
}

/// Load `gogen.toml` from `dir` if present, defaults otherwise.
pub fn discover(dir: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let path = dir.as_ref().join(CONFIG_FILE);
    if path.is_file() {
        debug!(path = %path.display(), "loading config");
        load_from_path(&path)
    } else {
        Ok(Config::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::ValidationIssue;

    #[test]
    fn empty_input_is_default() {
        let config = load_from_str("").unwrap();
        assert_eq!(config, Config::default());
        assert!(config.check.report_unused);
        assert!(!config.check.strict_imports);
    }

    #[test]
    fn full_config() {
        let config = load_from_str(
            r#"
[build]
goos = "linux"
goarch = "arm64"
go_version = "1.21"
cgo = true
tags = ["integration"]

[check]
ignore_func_bodies = true
strict_imports = true

[packages."github.com/acme/widgets/v2"]
types = ["Widget"]
funcs = ["New"]
"#,
        )
        .unwrap();
        assert_eq!(config.build.goarch, "arm64");
        assert!(config.build.cgo);
        assert!(config.check.ignore_func_bodies);
        assert!(config.check.report_unused);
        let stub = &config.packages["github.com/acme/widgets/v2"];
        assert_eq!(stub.name, None);
        assert_eq!(stub.funcs, vec!["New"]);
    }

    #[test]
    fn rejects_bad_version() {
        let err = load_from_str("[build]\ngo_version = \"2\"\n").unwrap_err();
        match err {
            ConfigError::Validation { source, .. } => {
                assert!(matches!(
                    source.issues[0],
                    ValidationIssue::InvalidValue {
                        field: "build.go_version",
                        ..
                    }
                ));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn rejects_duplicate_members() {
        let err = load_from_str("[packages.fmt]\nfuncs = [\"Println\"]\nvars = [\"Println\"]\n")
            .unwrap_err();
        assert!(err.to_string().contains("declared more than once"));
    }

    #[test]
    fn rejects_unknown_keys() {
        assert!(matches!(
            load_from_str("[check]\nfast = true\n"),
            Err(ConfigError::Toml { .. })
        ));
    }

    #[test]
    fn path_is_attached() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "[build]\ngo_version = \"x\"\n").unwrap();

        let err = load_from_path(&path).unwrap_err();
        assert!(err.to_string().contains(CONFIG_FILE));
        assert!(discover(dir.path()).is_err());
        assert_eq!(discover(dir.path().join("missing")).unwrap(), Config::default());
    }
}
