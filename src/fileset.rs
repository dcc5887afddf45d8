//! Construction of a resolved unit.
//!
//! A [`FileSet`] is built in three steps: the input is classified
//! ([`InputKind`]), every file is parsed in order (the first syntax error
//! aborts), and the whole unit is resolved once. A value only exists after
//! all three succeeded, so its semantic model is always present.

use crate::config::{Config, ConfigError};
use crate::discover::{discover, BuildContext};
use crate::error::Error;
use crate::pool::with_parser;
use crate::pos::{Pos, PositionTable, Position};
use crate::syntax::{AstFile, AstNode};
use crate::types::{self, Package, StubImporter, TypeInfo};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// How the names handed to [`FileSet::new`] are interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputKind {
    /// No names: the buildable files of the working directory.
    CurrentDir,
    /// A single directory: its buildable files.
    Directory(PathBuf),
    /// Explicit files, parsed in the given order.
    Files(Vec<PathBuf>),
}

impl InputKind {
    /// Classify `names`. A single name must exist.
    pub fn classify(names: &[PathBuf]) -> Result<Self, Error> {
        match names {
            [] => Ok(InputKind::CurrentDir),
            [only] => {
                let metadata = fs::metadata(only).map_err(|source| Error::Io {
                    path: only.clone(),
                    source,
                })?;
                if metadata.is_dir() {
                    Ok(InputKind::Directory(only.clone()))
                } else {
                    Ok(InputKind::Files(vec![only.clone()]))
                }
            }
            many => Ok(InputKind::Files(many.to_vec())),
        }
    }
}

/// One resolved unit: its files, their trees and the semantic model.
pub struct FileSet {
    dir: PathBuf,
    files: Vec<PathBuf>,
    positions: PositionTable,
    ast_files: Vec<AstFile>,
    info: TypeInfo,
    package: Package,
}

impl FileSet {
    /// Build from paths with the default configuration.
    ///
    /// No names selects the current directory; a single directory is
    /// discovered; otherwise the names are files.
    pub fn new<I, P>(names: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        Loader::default().load(names)
    }

    /// Build from the buildable files of `dir`.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self, Error> {
        Loader::default().load_dir(dir)
    }

    /// Build from in-memory sources named `0.go`, `1.go`, ...
    pub fn from_texts<I, S>(texts: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Loader::default().load_texts(texts)
    }

    /// The package directory, `"."` for the working directory and raw texts.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File identifiers in traversal order.
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn positions(&self) -> &PositionTable {
        &self.positions
    }

    /// Parsed trees, parallel to [`files`](Self::files).
    pub fn ast_files(&self) -> &[AstFile] {
        &self.ast_files
    }

    pub fn info(&self) -> &TypeInfo {
        &self.info
    }

    pub fn package(&self) -> &Package {
        &self.package
    }

    pub fn position(&self, pos: Pos) -> Option<Position> {
        self.positions.position(pos)
    }

    /// Location of the first byte of `node`.
    pub fn position_of(&self, node: AstNode<'_>) -> Option<Position> {
        self.position(node.pos())
    }
}

impl fmt::Debug for FileSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileSet")
            .field("dir", &self.dir)
            .field("files", &self.files)
            .field("package", &self.package.name)
            .finish_non_exhaustive()
    }
}

/// Builds [`FileSet`]s under a [`Config`].
#[derive(Debug, Clone, Default)]
pub struct Loader {
    config: Config,
}

impl Loader {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Build from paths; see [`FileSet::new`].
    pub fn load<I, P>(&self, names: I) -> Result<FileSet, Error>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let names: Vec<PathBuf> = names.into_iter().map(|n| n.as_ref().to_path_buf()).collect();
        let kind = InputKind::classify(&names)?;
        debug!(?kind, "constructing file set");

        match kind {
            InputKind::CurrentDir => self.load_dir("."),
            InputKind::Directory(dir) => self.load_dir(dir),
            InputKind::Files(files) => {
                let dir = files
                    .first()
                    .and_then(|f| f.parent())
                    .filter(|p| !p.as_os_str().is_empty())
                    .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
                let sources = files
                    .into_iter()
                    .map(|path| {
                        let text = fs::read_to_string(&path).map_err(|source| Error::Io {
                            path: path.clone(),
                            source,
                        })?;
                        Ok((path, text))
                    })
                    .collect::<Result<Vec<_>, Error>>()?;
                self.build(dir, sources)
            }
        }
    }

    /// Build from the buildable files of `dir`.
    pub fn load_dir(&self, dir: impl AsRef<Path>) -> Result<FileSet, Error> {
        let dir = dir.as_ref();
        let ctx = BuildContext::new(&self.config.build)?;
        let names = discover(dir, &ctx)?;

        let mut sources = Vec::with_capacity(names.len());
        for name in names {
            let path = if dir == Path::new(".") {
                PathBuf::from(&name)
            } else {
                dir.join(&name)
            };
            let text = fs::read_to_string(&path).map_err(|source| Error::Io {
                path: path.clone(),
                source,
            })?;
            sources.push((path, text));
        }
        self.build(dir.to_path_buf(), sources)
    }

    /// Build from in-memory sources named `0.go`, `1.go`, ...
    pub fn load_texts<I, S>(&self, texts: I) -> Result<FileSet, Error>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let sources = texts
            .into_iter()
            .enumerate()
            .map(|(i, text)| (PathBuf::from(format!("{i}.go")), text.into()))
            .collect();
        self.build(PathBuf::from("."), sources)
    }

    fn build(&self, dir: PathBuf, sources: Vec<(PathBuf, String)>) -> Result<FileSet, Error> {
        self.config
            .validate()
            .map_err(|source| ConfigError::Validation { path: None, source })?;

        let mut positions = PositionTable::new();
        let mut files = Vec::with_capacity(sources.len());
        let ast_files = with_parser(|parser| {
            sources
                .into_iter()
                .map(|(path, text)| {
                    let name = path.to_string_lossy().into_owned();
                    let file = parser.parse_file(&mut positions, &name, text)?;
                    files.push(path);
                    Ok(file)
                })
                .collect::<Result<Vec<_>, Error>>()
        })??;
        debug!(dir = %dir.display(), files = ast_files.len(), "parsed files");

        let importer = StubImporter::from_config(&self.config);
        let unit = dir.to_string_lossy();
        let (package, info) =
            types::check(&unit, &ast_files, &positions, &self.config.check, &importer)?;

        Ok(FileSet {
            dir,
            files,
            positions,
            ast_files,
            info,
            package,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn texts_get_synthesized_names() {
        let fs = FileSet::from_texts(["package p\n", "package p\n\nvar X int\n"]).unwrap();
        assert_eq!(fs.dir(), Path::new("."));
        assert_eq!(fs.files(), &[PathBuf::from("0.go"), PathBuf::from("1.go")]);
        assert_eq!(fs.ast_files().len(), 2);
        assert_eq!(fs.package().name, "p");
        assert_eq!(fs.ast_files()[1].name(), "1.go");
    }

    #[test]
    fn parse_error_aborts() {
        let err = FileSet::from_texts(["package p\n", "package p\n\nfunc (\n"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
        match err {
            Error::Parse(e) => assert_eq!(e.position.filename, "1.go"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_name_is_input_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = FileSet::new([dir.path().join("nope.go")]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Input);
    }

    #[test]
    fn classifies_inputs() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.go");
        fs::write(&file, "package p\n").unwrap();

        assert_eq!(InputKind::classify(&[]).unwrap(), InputKind::CurrentDir);
        assert_eq!(
            InputKind::classify(&[dir.path().to_path_buf()]).unwrap(),
            InputKind::Directory(dir.path().to_path_buf())
        );
        assert_eq!(
            InputKind::classify(&[file.clone()]).unwrap(),
            InputKind::Files(vec![file.clone()])
        );
        let missing = dir.path().join("b.go");
        assert_eq!(
            InputKind::classify(&[file.clone(), missing.clone()]).unwrap(),
            InputKind::Files(vec![file, missing])
        );
    }

    #[test]
    fn directory_files_are_joined_and_sorted() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.go"), "package p\n\nvar B = A\n").unwrap();
        fs::write(dir.path().join("a.go"), "package p\n\nconst A = 1\n").unwrap();
        fs::write(dir.path().join("a_test.go"), "package p\n\nvar T = missing\n").unwrap();

        let fs = FileSet::new([dir.path()]).unwrap();
        assert_eq!(fs.dir(), dir.path());
        assert_eq!(
            fs.files(),
            &[dir.path().join("a.go"), dir.path().join("b.go")]
        );
        assert_eq!(fs.package().path, dir.path().to_string_lossy());
    }

    #[test]
    fn explicit_files_keep_order_and_parent_dir() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.go");
        let b = dir.path().join("b.go");
        fs::write(&a, "package p\n\nvar A = 1\n").unwrap();
        fs::write(&b, "package p\n\nvar B = A\n").unwrap();

        let fs = FileSet::new([&b, &a]).unwrap();
        assert_eq!(fs.files(), &[b, a]);
        assert_eq!(fs.dir(), dir.path());
    }

    #[test]
    fn positions_report_file_line_column() {
        let fs = FileSet::from_texts(["package p\n", "package p\n\nvar Answer = 42\n"]).unwrap();
        let spec = fs.vars()[0];
        let name = spec.name_nodes()[0];
        let position = fs.position_of(name).unwrap();
        assert_eq!(position.filename, "1.go");
        assert_eq!((position.line, position.column), (3, 5));
        assert_eq!(position.to_string(), "1.go:3:5");
    }

    #[test]
    fn invalid_config_fails_construction() {
        let mut config = Config::default();
        config.build.go_version = "one".into();
        let err = Loader::new(config).load_texts(["package p\n"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn stub_packages_resolve_members() {
        let config = crate::config::load_from_str(
            "[check]\nstrict_imports = true\n\n[packages.\"example.com/lib/v2\"]\nfuncs = [\"Do\"]\n",
        )
        .unwrap();
        let loader = Loader::new(config);
        assert!(loader
            .load_texts(["package p\n\nimport \"example.com/lib/v2\"\n\nvar _ = lib.Do\n"])
            .is_ok());

        let err = loader
            .load_texts(["package p\n\nimport \"example.com/lib/v2\"\n\nvar _ = lib.Undo\n"])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Resolve);

        let err = loader
            .load_texts(["package p\n\nimport \"fmt\"\n\nvar _ = fmt.Sprint\n"])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Resolve);
    }
}
