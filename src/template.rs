//! Hand-off of located declarations to a code generator.
//!
//! gogen locates; a [`Renderer`] produces the text. Formatting the output is
//! the renderer's concern.

use crate::fileset::FileSet;
use crate::query::{Decl, DeclKind};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("type {name} not found")]
    NotFound { name: String },

    #[error("render failed: {message}")]
    Render { message: String },
}

/// Produces text for a located declaration.
pub trait Renderer {
    fn render(&self, decl: &Decl<'_>, fs: &FileSet) -> Result<String, RenderError>;
}

impl<F> Renderer for F
where
    F: Fn(&Decl<'_>, &FileSet) -> Result<String, RenderError>,
{
    fn render(&self, decl: &Decl<'_>, fs: &FileSet) -> Result<String, RenderError> {
        self(decl, fs)
    }
}

/// Locate the type spec declaring `name` and render it.
pub fn template_type<R>(fs: &FileSet, name: &str, renderer: &R) -> Result<String, RenderError>
where
    R: Renderer + ?Sized,
{
    let decl = fs
        .lookup(DeclKind::Type, name)
        .ok_or_else(|| RenderError::NotFound {
            name: name.to_string(),
        })?;
    debug!(name, "rendering type");
    renderer.render(&decl, fs)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MethodLister;

    impl Renderer for MethodLister {
        fn render(&self, decl: &Decl<'_>, fs: &FileSet) -> Result<String, RenderError> {
            let name = decl.names()[0];
            let methods: Vec<&str> = fs.methods_of(name).iter().map(|m| m.name()).collect();
            Ok(format!("{name}: {}", methods.join(", ")))
        }
    }

    fn fileset() -> FileSet {
        FileSet::from_texts([
            "package p\n\ntype Point struct{ X, Y int }\n",
            "package p\n\nfunc (p Point) Len() int { return 0 }\n\nfunc (p *Point) Scale(k int) {}\n",
        ])
        .unwrap()
    }

    #[test]
    fn renders_named_type() {
        let fs = fileset();
        assert_eq!(
            template_type(&fs, "Point", &MethodLister).unwrap(),
            "Point: Len, Scale"
        );
    }

    #[test]
    fn missing_type_is_not_found() {
        let fs = fileset();
        assert_eq!(
            template_type(&fs, "Line", &MethodLister),
            Err(RenderError::NotFound {
                name: "Line".into()
            })
        );
    }

    #[test]
    fn closures_are_renderers() {
        let fs = fileset();
        let kind = |decl: &Decl<'_>, _: &FileSet| -> Result<String, RenderError> {
            match decl {
                Decl::Type(spec) => Ok(spec.type_kind().unwrap_or("?").to_string()),
                _ => Err(RenderError::Render {
                    message: "not a type".into(),
                }),
            }
        };
        assert_eq!(template_type(&fs, "Point", &kind).unwrap(), "struct_type");
    }
}
