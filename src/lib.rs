//! gogen: a structural query layer over Go packages for code generators.
//!
//! A [`FileSet`] is one Go package: every buildable file of a directory (or
//! an explicit list of files, or in-memory sources), parsed with tree-sitter
//! and resolved as a whole. Resolution records the type of every expression
//! and the object every identifier denotes in a [`TypeInfo`](types::TypeInfo).
//!
//! # Architecture
//!
//! Construction is all-or-nothing: the first syntax error, or any semantic
//! inconsistency anywhere in the package, fails it. A constructed FileSet is
//! immutable. On top of it sit:
//!
//! - traversal ([`FileSet::walk`], [`FileSet::inspect`], [`FileSet::visit`]);
//! - declaration queries ([`FileSet::each_type`], [`FileSet::each_const`],
//!   [`FileSet::each_var`], [`FileSet::each_func`]);
//! - ast-grep pattern search ([`FileSet::find_pattern`]);
//! - hand-off of a located type to a [`Renderer`] ([`template_type`]).
//!
//! # Example
//!
//! ```
//! use gogen::FileSet;
//!
//! let fs = FileSet::from_texts([
//!     "package shapes\n\ntype Point struct{ X, Y int }\n",
//!     "package shapes\n\nconst (\n\tA = iota\n\tB\n)\n",
//! ])?;
//!
//! let mut names = Vec::new();
//! fs.each_const(|spec| {
//!     names.push(spec.name());
//!     true
//! });
//! assert_eq!(names, ["A", "B"]);
//! assert_eq!(fs.types()[0].name(), "Point");
//! # Ok::<(), gogen::Error>(())
//! ```

mod cache;
pub mod config;
pub mod discover;
pub mod error;
pub mod fileset;
pub mod pattern;
pub mod pool;
pub mod pos;
pub mod query;
pub mod syntax;
pub mod template;
pub mod types;
pub mod walk;

// Re-exports
pub use config::{load_from_path, load_from_str, Config, ConfigError};
pub use error::{Diagnostic, Error, ErrorKind, ParseError, ResolveError};
pub use fileset::{FileSet, InputKind, Loader};
pub use pattern::{PatternError, PatternMatch};
pub use pos::{Pos, Position};
pub use query::{Decl, DeclKind};
pub use syntax::{AstFile, AstNode, FuncDecl, TypeSpec, ValueSpec};
pub use template::{template_type, RenderError, Renderer};
pub use walk::{Flow, Visitor};
