//! Directory discovery: which `.go` files of a directory belong to the
//! package under a given build context.
//!
//! Rules follow the go tool: test files, files starting with `_` or `.`,
//! files whose `_GOOS`/`_GOARCH` name suffix does not match, and files whose
//! `//go:build` line evaluates to false are left out.

use crate::config::{BuildConfig, ConfigError, GoVersion, ValidationError, ValidationIssue};
use crate::error::{Error, ParseError};
use crate::pos::Position;
use std::fs;
use std::path::Path;
use tracing::{debug, trace};
use walkdir::WalkDir;

const KNOWN_OS: &[&str] = &[
    "aix", "android", "darwin", "dragonfly", "freebsd", "hurd", "illumos", "ios", "js", "linux",
    "nacl", "netbsd", "openbsd", "plan9", "solaris", "wasip1", "windows", "zos",
];

const UNIX_OS: &[&str] = &[
    "aix", "android", "darwin", "dragonfly", "freebsd", "hurd", "illumos", "ios", "linux",
    "netbsd", "openbsd", "solaris",
];

const KNOWN_ARCH: &[&str] = &[
    "386", "amd64", "amd64p32", "arm", "armbe", "arm64", "arm64be", "loong64", "mips", "mipsle",
    "mips64", "mips64le", "mips64p32", "mips64p32le", "ppc", "ppc64", "ppc64le", "riscv",
    "riscv64", "s390", "s390x", "sparc", "sparc64", "wasm",
];

/// Target platform and tag set that build constraints are evaluated against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildContext {
    pub goos: String,
    pub goarch: String,
    pub cgo: bool,
    pub version: GoVersion,
    pub tags: Vec<String>,
}

impl BuildContext {
    pub fn new(config: &BuildConfig) -> Result<Self, ConfigError> {
        let version = GoVersion::parse(&config.go_version).map_err(|message| {
            ConfigError::Validation {
                path: None,
                source: ValidationError {
                    issues: vec![ValidationIssue::InvalidValue {
                        field: "build.go_version",
                        message,
                    }],
                },
            }
        })?;
        Ok(Self {
            goos: config.goos.clone(),
            goarch: config.goarch.clone(),
            cgo: config.cgo,
            version,
            tags: config.tags.clone(),
        })
    }

    /// Whether a single build tag is satisfied.
    pub fn matches_tag(&self, tag: &str) -> bool {
        if tag == self.goarch || self.tags.iter().any(|t| t == tag) {
            return true;
        }
        match tag {
            "gc" => true,
            "cgo" => self.cgo,
            "unix" => UNIX_OS.contains(&self.goos.as_str()),
            _ if tag.starts_with("go1.") => self.version.satisfies(tag),
            _ => self.matches_os(tag),
        }
    }

    fn matches_os(&self, os: &str) -> bool {
        self.goos == os
            || (os == "linux" && self.goos == "android")
            || (os == "solaris" && self.goos == "illumos")
            || (os == "darwin" && self.goos == "ios")
    }

    /// Whether the `_GOOS`/`_GOARCH` suffixes of a file name match.
    pub fn matches_file_name(&self, name: &str) -> bool {
        let stem = name.strip_suffix(".go").unwrap_or(name);
        let Some(idx) = stem.find('_') else {
            return true;
        };
        let parts: Vec<&str> = stem[idx..].split('_').collect();
        let n = parts.len();

        if n >= 2 && KNOWN_OS.contains(&parts[n - 2]) && KNOWN_ARCH.contains(&parts[n - 1]) {
            return self.matches_os(parts[n - 2]) && self.goarch == parts[n - 1];
        }
        let last = parts[n - 1];
        if KNOWN_OS.contains(&last) {
            return self.matches_os(last);
        }
        if KNOWN_ARCH.contains(&last) {
            return self.goarch == last;
        }
        true
    }
}

/// A parsed `//go:build` expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraint {
    Tag(String),
    Not(Box<Constraint>),
    And(Box<Constraint>, Box<Constraint>),
    Or(Box<Constraint>, Box<Constraint>),
}

impl Constraint {
    /// Parse the text after `//go:build`.
    pub fn parse(text: &str) -> Result<Self, String> {
        let tokens = tokenize(text)?;
        let mut parser = ConstraintParser { tokens, at: 0 };
        let expr = parser.or()?;
        match parser.tokens.get(parser.at) {
            None => Ok(expr),
            Some(tok) => Err(format!("unexpected {tok}")),
        }
    }

    pub fn eval(&self, tag: &mut impl FnMut(&str) -> bool) -> bool {
        match self {
            Constraint::Tag(name) => tag(name),
            Constraint::Not(x) => !x.eval(tag),
            Constraint::And(x, y) => {
                let x = x.eval(tag);
                let y = y.eval(tag);
                x && y
            }
            Constraint::Or(x, y) => {
                let x = x.eval(tag);
                let y = y.eval(tag);
                x || y
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Tag(String),
    Not,
    And,
    Or,
    Open,
    Close,
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Tag(name) => write!(f, "tag {name}"),
            Token::Not => write!(f, "!"),
            Token::And => write!(f, "&&"),
            Token::Or => write!(f, "||"),
            Token::Open => write!(f, "("),
            Token::Close => write!(f, ")"),
        }
    }
}

fn tokenize(text: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = text.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        match c {
            ' ' | '\t' => {}
            '!' => tokens.push(Token::Not),
            '(' => tokens.push(Token::Open),
            ')' => tokens.push(Token::Close),
            '&' | '|' => {
                if chars.next_if(|&(_, next)| next == c).is_none() {
                    return Err(format!("invalid syntax at {c}"));
                }
                tokens.push(if c == '&' { Token::And } else { Token::Or });
            }
            c if c.is_alphanumeric() || c == '_' || c == '.' => {
                let mut end = i + c.len_utf8();
                while let Some(&(j, next)) = chars.peek() {
                    if !(next.is_alphanumeric() || next == '_' || next == '.') {
                        break;
                    }
                    end = j + next.len_utf8();
                    chars.next();
                }
                tokens.push(Token::Tag(text[i..end].to_string()));
            }
            other => return Err(format!("invalid syntax at {other}")),
        }
    }
    if tokens.is_empty() {
        return Err("unexpected end of expression".to_string());
    }
    Ok(tokens)
}

struct ConstraintParser {
    tokens: Vec<Token>,
    at: usize,
}

impl ConstraintParser {
    fn eat(&mut self, token: &Token) -> bool {
        if self.tokens.get(self.at) == Some(token) {
            self.at += 1;
            true
        } else {
            false
        }
    }

    fn or(&mut self) -> Result<Constraint, String> {
        let mut x = self.and()?;
        while self.eat(&Token::Or) {
            let y = self.and()?;
            x = Constraint::Or(Box::new(x), Box::new(y));
        }
        Ok(x)
    }

    fn and(&mut self) -> Result<Constraint, String> {
        let mut x = self.not()?;
        while self.eat(&Token::And) {
            let y = self.not()?;
            x = Constraint::And(Box::new(x), Box::new(y));
        }
        Ok(x)
    }

    fn not(&mut self) -> Result<Constraint, String> {
        if self.eat(&Token::Not) {
            return Ok(Constraint::Not(Box::new(self.not()?)));
        }
        self.atom()
    }

    fn atom(&mut self) -> Result<Constraint, String> {
        if self.eat(&Token::Open) {
            let x = self.or()?;
            if !self.eat(&Token::Close) {
                return Err("missing )".to_string());
            }
            return Ok(x);
        }
        match self.tokens.get(self.at).cloned() {
            Some(Token::Tag(name)) => {
                self.at += 1;
                Ok(Constraint::Tag(name))
            }
            Some(tok) => Err(format!("unexpected {tok}")),
            None => Err("unexpected end of expression".to_string()),
        }
    }
}

/// Find the `//go:build` line of a file header, with its byte offset.
///
/// Only comments and blank lines before the package clause are examined.
pub fn build_line(source: &str) -> Option<(usize, &str)> {
    let mut offset = 0;
    let mut in_block = false;
    for line in source.split_inclusive('\n') {
        let start = offset;
        offset += line.len();
        let trimmed = line.trim();

        if in_block {
            if trimmed.contains("*/") {
                in_block = false;
            }
            continue;
        }
        if trimmed.is_empty() {
            continue;
        }
        if let Some(rest) = trimmed.strip_prefix("//") {
            if let Some(expr) = rest.strip_prefix("go:build") {
                if expr.is_empty() || expr.starts_with([' ', '\t']) {
                    return Some((start, expr.trim()));
                }
            }
            continue;
        }
        if trimmed.starts_with("/*") {
            in_block = !trimmed[2..].contains("*/");
            continue;
        }
        break;
    }
    None
}

/// Whether a file's contents satisfy its build constraint, if any.
pub fn matches_constraint(
    ctx: &BuildContext,
    name: &str,
    source: &str,
) -> Result<bool, ParseError> {
    let Some((offset, expr)) = build_line(source) else {
        return Ok(true);
    };
    let constraint = Constraint::parse(expr).map_err(|message| ParseError {
        position: Position {
            filename: name.to_string(),
            offset,
            line: source[..offset].matches('\n').count() + 1,
            column: 1,
        },
        message: format!("parsing //go:build line: {message}"),
    })?;
    let result = constraint.eval(&mut |tag| ctx.matches_tag(tag));
    trace!(file = name, constraint = expr, result, "build constraint");
    Ok(result)
}

fn is_candidate(name: &str) -> bool {
    name.ends_with(".go")
        && !name.ends_with("_test.go")
        && !name.starts_with('_')
        && !name.starts_with('.')
}

/// Buildable Go file names of `dir`, sorted.
pub fn discover(dir: &Path, ctx: &BuildContext) -> Result<Vec<String>, Error> {
    let metadata = fs::metadata(dir).map_err(|source| Error::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    if !metadata.is_dir() {
        return Err(Error::Io {
            path: dir.to_path_buf(),
            source: std::io::Error::other("not a directory"),
        });
    }

    let mut names = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).follow_links(true) {
        let entry = entry.map_err(|err| Error::Io {
            path: err.path().unwrap_or(dir).to_path_buf(),
            source: err.into(),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str() else {
            continue;
        };
        if !is_candidate(name) {
            trace!(file = name, "skipped: not a package source file");
            continue;
        }
        if !ctx.matches_file_name(name) {
            trace!(file = name, goos = %ctx.goos, goarch = %ctx.goarch, "skipped: platform suffix");
            continue;
        }
        let source = fs::read_to_string(entry.path()).map_err(|source| Error::Io {
            path: entry.path().to_path_buf(),
            source,
        })?;
        if !matches_constraint(ctx, name, &source)? {
            trace!(file = name, "skipped: build constraint");
            continue;
        }
        names.push(name.to_string());
    }

    names.sort();
    if names.is_empty() {
        return Err(Error::NoGoFiles {
            dir: dir.to_path_buf(),
        });
    }
    debug!(dir = %dir.display(), files = names.len(), "discovered package files");
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ctx() -> BuildContext {
        BuildContext {
            goos: "linux".into(),
            goarch: "amd64".into(),
            cgo: false,
            version: GoVersion { minor: 21 },
            tags: vec!["integration".into()],
        }
    }

    fn eval(expr: &str) -> bool {
        let ctx = ctx();
        Constraint::parse(expr)
            .unwrap()
            .eval(&mut |tag| ctx.matches_tag(tag))
    }

    #[test]
    fn evaluates_constraints() {
        assert!(eval("linux"));
        assert!(eval("linux && amd64"));
        assert!(!eval("windows || darwin"));
        assert!(eval("!windows"));
        assert!(eval("unix && !cgo"));
        assert!(eval("(darwin || linux) && go1.21"));
        assert!(!eval("go1.22"));
        assert!(eval("integration"));
        assert!(eval("gc && !(ignore)"));
    }

    #[test]
    fn rejects_malformed_constraints() {
        assert!(Constraint::parse("").is_err());
        assert!(Constraint::parse("linux &&").is_err());
        assert!(Constraint::parse("(linux").is_err());
        assert!(Constraint::parse("linux & amd64").is_err());
        assert!(Constraint::parse("linux amd64").is_err());
    }

    #[test]
    fn file_name_suffixes() {
        let ctx = ctx();
        assert!(ctx.matches_file_name("main.go"));
        assert!(ctx.matches_file_name("linux.go"));
        assert!(ctx.matches_file_name("poll_linux.go"));
        assert!(ctx.matches_file_name("poll_linux_amd64.go"));
        assert!(!ctx.matches_file_name("poll_windows.go"));
        assert!(!ctx.matches_file_name("poll_arm64.go"));
        assert!(!ctx.matches_file_name("poll_linux_arm64.go"));
        assert!(ctx.matches_file_name("my_helper.go"));
    }

    #[test]
    fn finds_build_line_in_header_only() {
        let src = "// Copyright\n\n//go:build linux\n\npackage p\n";
        assert_eq!(build_line(src), Some((14, "linux")));
        assert_eq!(build_line("/* a\nb */\n//go:build x\npackage p\n").map(|b| b.1), Some("x"));
        assert_eq!(build_line("package p\n\n//go:build linux\n"), None);
        assert_eq!(build_line("//go:buildx\npackage p\n"), None);
    }

    #[test]
    fn malformed_build_line_is_positioned() {
        let err = matches_constraint(&ctx(), "a.go", "\n//go:build (linux\npackage p\n").unwrap_err();
        assert_eq!(err.position.line, 2);
        assert!(err.message.starts_with("parsing //go:build line"));
    }

    #[test]
    fn discovers_buildable_files() {
        let dir = tempfile::tempdir().unwrap();
        let write = |name: &str, text: &str| fs::write(dir.path().join(name), text).unwrap();
        write("b.go", "package p\n");
        write("a.go", "package p\n");
        write("a_test.go", "package p\n");
        write("_skip.go", "package p\n");
        write(".hidden.go", "package p\n");
        write("x_windows.go", "package p\n");
        write("tagged.go", "//go:build ignore\n\npackage p\n");
        write("notes.txt", "package p\n");
        fs::create_dir(dir.path().join("sub.go")).unwrap();

        let names = discover(dir.path(), &ctx()).unwrap();
        assert_eq!(names, vec!["a.go", "b.go"]);
    }

    #[test]
    fn empty_directory_has_no_files() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            discover(dir.path(), &ctx()),
            Err(Error::NoGoFiles { .. })
        ));
        assert!(matches!(
            discover(&dir.path().join("missing"), &ctx()),
            Err(Error::Io { .. })
        ));
    }

    fn constraint() -> impl Strategy<Value = Constraint> {
        let leaf = prop::sample::select(vec!["linux", "amd64", "cgo", "foo", "go1.5"])
            .prop_map(|t| Constraint::Tag(t.to_string()));
        leaf.prop_recursive(4, 16, 2, |inner| {
            prop_oneof![
                inner.clone().prop_map(|x| Constraint::Not(Box::new(x))),
                (inner.clone(), inner.clone())
                    .prop_map(|(x, y)| Constraint::And(Box::new(x), Box::new(y))),
                (inner.clone(), inner).prop_map(|(x, y)| Constraint::Or(Box::new(x), Box::new(y))),
            ]
        })
    }

    fn render(c: &Constraint) -> String {
        match c {
            Constraint::Tag(t) => t.clone(),
            Constraint::Not(x) => format!("!({})", render(x)),
            Constraint::And(x, y) => format!("({}) && ({})", render(x), render(y)),
            Constraint::Or(x, y) => format!("({}) || ({})", render(x), render(y)),
        }
    }

    proptest! {
        #[test]
        fn parsed_constraint_agrees_with_tree(c in constraint(), set in prop::collection::hash_set(
            prop::sample::select(vec!["linux", "amd64", "cgo", "foo", "go1.5"]), 0..5)) {
            let mut lookup = |tag: &str| set.contains(tag);
            let parsed = Constraint::parse(&render(&c)).unwrap();
            prop_assert_eq!(parsed.eval(&mut lookup), c.eval(&mut lookup));
        }
    }
}
