use crate::config::Config;
use crate::error::Error;
use crate::fileset::{FileSet, Loader};
use crate::syntax::AstNode;
use crate::types::constant::Value;
use crate::types::object::ObjectKind;
use crate::types::selection::SelectionKind;
use crate::types::ty::Type;
use crate::walk::Flow;

fn load(texts: &[&str]) -> FileSet {
    match FileSet::from_texts(texts.iter().copied()) {
        Ok(fs) => fs,
        Err(err) => panic!("unexpected failure: {err}"),
    }
}

fn errors(texts: &[&str]) -> Vec<String> {
    match FileSet::from_texts(texts.iter().copied()) {
        Ok(_) => panic!("expected a resolve error"),
        Err(Error::Resolve(err)) => err.messages().map(str::to_string).collect(),
        Err(err) => panic!("expected a resolve error, got {err}"),
    }
}

fn has_error(texts: &[&str], needle: &str) {
    let errs = errors(texts);
    assert!(
        errs.iter().any(|e| e.contains(needle)),
        "no error containing {needle:?} in {errs:?}"
    );
}

/// The `nth` identifier-like node spelled `name`, in traversal order.
fn ident<'a>(fs: &'a FileSet, name: &str, nth: usize) -> AstNode<'a> {
    let mut found = Vec::new();
    fs.visit(|node| {
        if node.text() == name
            && matches!(
                node.kind(),
                "identifier" | "type_identifier" | "field_identifier" | "package_identifier"
            )
        {
            found.push(node);
        }
        Flow::Descend
    });
    found[nth]
}

#[test]
fn resolves_references_across_files() {
    let fs = load(&[
        "package p\n\nfunc f() int { return g() }\n",
        "package p\n\nfunc g() int { return 1 }\n",
    ]);
    let info = fs.info();
    let used = info.uses[&ident(&fs, "g", 0).key()];
    let defined = info.defs[&ident(&fs, "g", 1).key()];
    assert_eq!(Some(used), defined);
    assert_eq!(info.object(used).kind, ObjectKind::Func);
}

#[test]
fn undefined_identifier_is_positioned() {
    let err = match FileSet::from_texts(["package p\n\nvar x = y\n"]) {
        Err(Error::Resolve(err)) => err,
        other => panic!("expected a resolve error, got {:?}", other.err()),
    };
    let first = err.first().unwrap();
    assert_eq!(first.message, "undefined: y");
    assert_eq!(first.position.filename, "0.go");
    assert_eq!((first.position.line, first.position.column), (3, 9));
}

#[test]
fn package_names_must_agree() {
    has_error(&["package p\n", "package q\n"], "package q; expected package p");
}

#[test]
fn iota_counts_specs() {
    let fs = load(&["package p\n\nconst (\n\tX = iota\n\tY\n\tZ\n)\n"]);
    let values: Vec<Value> = ["X", "Y", "Z"]
        .iter()
        .map(|name| {
            let obj = fs.package().lookup(fs.info(), name).unwrap();
            match &fs.info().object(obj).kind {
                ObjectKind::Const { value } => value.clone(),
                other => panic!("{name} is {other:?}"),
            }
        })
        .collect();
    assert_eq!(values, vec![Value::Int(0), Value::Int(1), Value::Int(2)]);
}

#[test]
fn folds_constant_expressions() {
    let fs = load(&["package p\n\nconst (\n\tK = 1 << 10\n\tS = \"a\" + \"b\"\n\tB = K > 1000\n)\n"]);
    let value = |name: &str| {
        let obj = fs.package().lookup(fs.info(), name).unwrap();
        match &fs.info().object(obj).kind {
            ObjectKind::Const { value } => value.clone(),
            _ => Value::Unknown,
        }
    };
    assert_eq!(value("K"), Value::Int(1024));
    assert_eq!(value("S"), Value::String("ab".into()));
    assert_eq!(value("B"), Value::Bool(true));
}

#[test]
fn unused_locals_and_imports() {
    has_error(&["package p\n\nfunc f() { x := 1 }\n"], "declared and not used: x");
    has_error(&["package p\n\nimport \"fmt\"\n"], "\"fmt\" imported and not used");
    has_error(
        &["package p\n\nimport f \"fmt\"\n"],
        "\"fmt\" imported as f and not used",
    );
}

#[test]
fn opaque_imports_resolve_permissively() {
    let fs = load(&["package p\n\nimport \"fmt\"\n\nfunc f() { fmt.Println(\"x\", 1).Whatever() }\n"]);
    assert_eq!(fs.package().imports.len(), 1);
    assert_eq!(fs.package().imports[0].name, "fmt");
}

#[test]
fn ignoring_bodies_skips_body_errors() {
    let src = "package p\n\nfunc f() { undefined() }\n";
    assert!(FileSet::from_texts([src]).is_err());

    let mut config = Config::default();
    config.check.ignore_func_bodies = true;
    assert!(Loader::new(config).load_texts([src]).is_ok());
}

#[test]
fn recursive_types() {
    load(&["package p\n\ntype List struct {\n\tnext *List\n\tval  int\n}\n"]);
    has_error(
        &["package p\n\ntype U struct {\n\tu U\n}\n"],
        "invalid recursive type U",
    );
    has_error(&["package p\n\nvar a = b\nvar b = a\n"], "initialization cycle");
}

#[test]
fn methods_attach_to_receiver_types() {
    let fs = load(&[
        "package p\n\ntype T struct{ n int }\n\nfunc (t *T) Inc() { t.n++ }\n\nfunc g() {\n\tvar t T\n\tt.Inc()\n}\n",
    ]);
    let info = fs.info();
    let named = fs.package().lookup(info, "T").map(|o| info.object(o).ty).unwrap();
    match info.ty(named) {
        Type::Named(n) => assert_eq!(n.methods.len(), 1),
        other => panic!("T is {other:?}"),
    }
    let selection = info
        .selections
        .values()
        .find(|s| s.kind == SelectionKind::MethodVal)
        .unwrap();
    assert_eq!(info.object(selection.obj).name, "Inc");
    has_error(
        &["package p\n\ntype T int\n\nfunc (T) M() {}\nfunc (T) M() {}\n"],
        "method T.M already declared",
    );
}

#[test]
fn termination_analysis() {
    has_error(&["package p\n\nfunc f() int {\n}\n"], "missing return");
    load(&[
        "package p\n\nfunc a(x int) int {\n\tif x > 0 {\n\t\treturn 1\n\t} else {\n\t\treturn 2\n\t}\n}\n\nfunc b() int {\n\tfor {\n\t}\n}\n\nfunc c() int {\n\tpanic(\"no\")\n}\n",
    ]);
    has_error(
        &["package p\n\nfunc f() int {\n\tfor {\n\t\tbreak\n\t}\n}\n"],
        "missing return",
    );
}

#[test]
fn assignment_checks() {
    has_error(
        &["package p\n\nfunc f() (int, int) { return 1, 2 }\n\nvar a, b, c = f()\n"],
        "assignment mismatch: 3 variables but f() returns 2 values",
    );
    has_error(
        &["package p\n\nvar s string = 1\n"],
        "cannot use 1 (untyped int constant) as string value in variable declaration",
    );
    has_error(&["package p\n\nvar b byte = 300\n"], "(overflows)");
    has_error(
        &["package p\n\nfunc f(a int, b string) { _ = a + b }\n"],
        "invalid operation: a + b (mismatched types int and string)",
    );
    has_error(
        &["package p\n\nfunc f() {\n\ta := 1\n\ta := 2\n\t_ = a\n}\n"],
        "no new variables on left side of :=",
    );
}

#[test]
fn redeclaration_and_blank_use() {
    has_error(&["package p\n\nvar a int\n", "package p\n\nvar a string\n"], "a redeclared in this block");
    has_error(&["package p\n\nvar x = _\n"], "cannot use _ as value");
    has_error(&["package p\n\nvar x = iota\n"], "cannot use iota outside constant declaration");
}

#[test]
fn labels_and_branches() {
    has_error(&["package p\n\nfunc f() {\nL:\n\tfor {\n\t}\n}\n"], "label L defined and not used");
    has_error(&["package p\n\nfunc f() { break }\n"], "break is not in a loop, switch, or select");
    load(&["package p\n\nfunc f() {\nouter:\n\tfor {\n\t\tfor {\n\t\t\tbreak outer\n\t\t}\n\t}\n}\n"]);
}

#[test]
fn type_switch_declares_per_clause_variables() {
    let fs = load(&[
        "package p\n\nfunc f(x any) int {\n\tswitch v := x.(type) {\n\tcase int:\n\t\treturn v\n\tdefault:\n\t\t_ = v\n\t\treturn 0\n\t}\n}\n",
    ]);
    let info = fs.info();
    let vars: Vec<_> = info
        .implicits
        .values()
        .map(|o| info.object(*o))
        .filter(|o| o.name == "v")
        .collect();
    assert_eq!(vars.len(), 2);
    assert!(vars.iter().any(|o| info.type_string(o.ty) == "int"));
    assert_eq!(info.defs[&ident(&fs, "v", 0).key()], None);
}

#[test]
fn struct_literal_keys_are_field_uses() {
    let fs = load(&["package p\n\ntype P struct{ X, Y int }\n\nvar p = P{X: 1, Y: 2}\n"]);
    let info = fs.info();
    let key = ident(&fs, "X", 1);
    let field = info.uses[&key.key()];
    assert!(info.object(field).is_field());
    has_error(
        &["package p\n\ntype P struct{ X int }\n\nvar p = P{Z: 1}\n"],
        "unknown field Z in struct literal of type P",
    );
}

#[test]
fn records_expression_types() {
    let fs = load(&["package p\n\nvar m = map[string][]int{\"a\": {1, 2}}\nvar n = len(m[\"a\"])\n"]);
    let info = fs.info();
    let m = fs.package().lookup(info, "m").unwrap();
    assert_eq!(info.type_string(info.object(m).ty), "map[string][]int");
    let n = fs.package().lookup(info, "n").unwrap();
    assert_eq!(info.type_string(info.object(n).ty), "int");
}

#[test]
fn opaque_calls_fill_any_number_of_values() {
    load(&[r#"package p

import (
	"errors"
	"fmt"
	"os"
	"strconv"
)

func open() error {
	if _, err := os.Open("x"); err != nil {
		return fmt.Errorf("wrap: %w", err)
	}
	return errors.New("x")
}

func parse(s string) (int, error) {
	return strconv.Atoi(s)
}

func positive(n int, err error) bool { return err == nil && n > 0 }

var ok = positive(strconv.Atoi("1"))

var f, ferr = os.Open("y")
"#]);
    has_error(
        &["package p\n\nfunc one() int { return 1 }\n\nfunc f() {\n\ta, b := one()\n\t_, _ = a, b\n}\n"],
        "assignment mismatch: 2 variables but",
    );
}

#[test]
fn members_promoted_from_opaque_embeddings_resolve() {
    load(&[r#"package p

import (
	"io"
	"sync"
)

type S struct{ sync.Mutex }

type T struct{ *S }

type R interface{ io.Reader }

func f(s *S, t T, r R, m *sync.Mutex) {
	s.Lock()
	defer s.Unlock()
	t.Lock()
	m.Lock()
	var buf []byte
	r.Read(buf)
}
"#]);
    has_error(
        &["package p\n\ntype V struct{}\n\ntype U struct{ V }\n\nfunc f(u U) { u.Missing() }\n"],
        "u.Missing undefined (type U has no field or method Missing)",
    );
}

#[test]
fn type_switch_accepts_nil_case() {
    let fs = load(&[r#"package p

func kind(v any) string {
	switch v.(type) {
	case nil:
		return "nil"
	case int, string:
		return "scalar"
	}
	return "other"
}
"#]);
    let info = fs.info();
    let nil = info.uses[&ident(&fs, "nil", 0).key()];
    assert!(matches!(info.object(nil).kind, ObjectKind::Nil));
}

#[test]
fn min_and_max_unify_untyped_operands() {
    let fs = load(&["package p\n\nvar a = min(1, 2.5)\nvar b = max(1, 2, 3.0)\n"]);
    let info = fs.info();
    for name in ["a", "b"] {
        let obj = fs.package().lookup(info, name).unwrap();
        assert_eq!(info.type_string(info.object(obj).ty), "float64");
    }
    has_error(
        &["package p\n\nvar x int\nvar y float64\nvar z = min(x, y)\n"],
        "mismatched types int (previous argument) and float64",
    );
}

#[test]
fn non_constant_shift_takes_type_from_context() {
    let fs = load(&[r#"package p

func f(n uint) int64 { return 1 << n }

var s uint = 3
var a int64 = 1 << s
var b = 1 << s
"#]);
    let info = fs.info();
    let b = fs.package().lookup(info, "b").unwrap();
    assert_eq!(info.type_string(info.object(b).ty), "int");
}

#[test]
fn generic_calls_accept_arguments_without_inference() {
    load(&[r#"package p

type Number interface{ ~int | ~float64 }

func Sum[T Number](xs []T) T {
	var total T
	for _, x := range xs {
		total += x
	}
	return total
}

func Map[T, U any](xs []T, f func(T) U) []U {
	out := make([]U, 0, len(xs))
	for _, x := range xs {
		out = append(out, f(x))
	}
	return out
}

func Join[T any](xs ...T) []T { return xs }

var total = Sum([]int{1, 2})
var names []string = Map([]int{1}, func(i int) string { return "x" })
var joined = Join(1, 2, 3)
"#]);
    has_error(
        &["package p\n\nfunc g(xs []int) {}\n\nfunc h() { g([]string{\"a\"}) }\n"],
        "as []int value in argument to g",
    );
}

#[test]
fn make_argument_count_depends_on_type() {
    load(&["package p\n\nfunc f() {\n\t_ = make([]int, 1, 2)\n\t_ = make(map[string]int, 1)\n\t_ = make(chan int)\n}\n"]);
    has_error(
        &["package p\n\nfunc f() { _ = make(map[string]int, 1, 2) }\n"],
        "expects 1 or 2 arguments; found 3",
    );
    has_error(
        &["package p\n\nfunc f() { _ = make(chan int, 1, 2) }\n"],
        "expects 1 or 2 arguments; found 3",
    );
}
