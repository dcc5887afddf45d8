//! End-to-end: load a package from disk, query it, search it and hand a
//! type to a renderer.

use gogen::types::{ObjectKind, Type};
use gogen::{template_type, Decl, DeclKind, FileSet, Flow, RenderError, Renderer};
use std::fs;
use tempfile::TempDir;

const MODEL: &str = r#"package model

import (
	"errors"
	"strings"
)

// Color is an enumeration.
type Color int

const (
	Red Color = iota
	Green
	Blue
)

var names = [...]string{"red", "green", "blue"}

func (c Color) String() string {
	if c < Red || c > Blue {
		return "unknown"
	}
	return names[c]
}

var ErrUnknown = errors.New("unknown color")

func Parse(s string) (Color, error) {
	for i, n := range names {
		if strings.EqualFold(n, s) {
			return Color(i), nil
		}
	}
	return 0, ErrUnknown
}
"#;

const PALETTE: &str = r#"package model

type Palette struct {
	Name   string
	Colors []Color
}

func (p *Palette) Add(c Color) {
	p.Colors = append(p.Colors, c)
}

func NewPalette(name string) *Palette {
	p := &Palette{Name: name}
	for c := Red; c <= Blue; c++ {
		p.Add(c)
	}
	return p
}
"#;

fn setup() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("model.go"), MODEL).unwrap();
    fs::write(dir.path().join("palette.go"), PALETTE).unwrap();
    dir
}

/// Emits a `String` method body switching over the constants of the type.
struct Stringer;

impl Renderer for Stringer {
    fn render(&self, decl: &Decl<'_>, fs: &FileSet) -> Result<String, RenderError> {
        let name = decl.names()[0];
        let info = fs.info();
        let mut cases = Vec::new();
        fs.each_const(|spec| {
            for ident in spec.name_nodes() {
                let Some(obj) = info.object_of(ident) else {
                    continue;
                };
                if info.type_string(info.object(obj).ty) == name {
                    cases.push(format!("\tcase {}:\n\t\treturn {:?}", ident.text(), ident.text()));
                }
            }
            true
        });
        Ok(format!(
            "func (x {name}) String() string {{\n\tswitch x {{\n{}\n\t}}\n\treturn \"\"\n}}",
            cases.join("\n")
        ))
    }
}

#[test]
fn loads_and_queries_directory() {
    let dir = setup();
    let fs = FileSet::from_dir(dir.path()).unwrap();

    assert_eq!(fs.package().name, "model");
    assert_eq!(fs.files().len(), 2);

    let types: Vec<_> = fs.types().iter().map(|t| t.name()).collect();
    assert_eq!(types, vec!["Color", "Palette"]);
    let funcs: Vec<_> = fs.funcs().iter().map(|f| f.name()).collect();
    assert_eq!(funcs, vec!["String", "Parse", "Add", "NewPalette"]);
    assert_eq!(fs.methods_of("Palette").len(), 1);
    assert!(fs.lookup(DeclKind::Var, "ErrUnknown").is_some());
}

#[test]
fn constants_are_typed_and_folded() {
    let dir = setup();
    let fs = FileSet::from_dir(dir.path()).unwrap();
    let info = fs.info();

    let blue = fs.package().lookup(info, "Blue").unwrap();
    let object = info.object(blue);
    assert_eq!(info.type_string(object.ty), "Color");
    match &object.kind {
        ObjectKind::Const { value } => assert_eq!(value.as_int(), Some(2)),
        other => panic!("Blue is {other:?}"),
    }

    let names = fs.package().lookup(info, "names").unwrap();
    assert!(matches!(
        info.ty(info.object(names).ty),
        Type::Array { len: Some(3), .. }
    ));
}

#[test]
fn traversal_finds_method_calls() {
    let dir = setup();
    let fs = FileSet::from_dir(dir.path()).unwrap();
    let info = fs.info();

    let mut called = Vec::new();
    fs.visit(|node| {
        if node.kind() == "selector_expression" {
            if let Some(selection) = info.selections.get(&node.key()) {
                called.push(info.object(selection.obj).name.clone());
            }
        }
        Flow::Descend
    });
    assert!(called.contains(&"Colors".to_string()));
    assert!(called.contains(&"Add".to_string()));
}

#[test]
fn pattern_search_and_render() {
    let dir = setup();
    let fs = FileSet::from_dir(dir.path()).unwrap();

    let appends = fs.find_pattern("append($S, $$$REST)").unwrap();
    assert_eq!(appends.len(), 1);
    assert_eq!(appends[0].captures["S"], "p.Colors");

    let out = template_type(&fs, "Color", &Stringer).unwrap();
    assert!(out.starts_with("func (x Color) String() string {"));
    assert!(out.contains("case Green:\n\t\treturn \"Green\""));
    assert!(!out.contains("case names"));

    assert!(matches!(
        template_type(&fs, "Shade", &Stringer),
        Err(RenderError::NotFound { .. })
    ));
}
