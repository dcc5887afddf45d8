//! The universe scope: predeclared types, constants, `nil` and builtins.

use crate::pos::Pos;
use crate::types::constant::Value;
use crate::types::ids::{ObjectId, ScopeId, TypeId};
use crate::types::object::{Builtin, Object, ObjectKind};
use crate::types::scope::ScopeKind;
use crate::types::ty::{BasicKind, InterfaceType, NamedType, Signature, Type, TypeTable};
use crate::types::TypeInfo;

/// Handles to the predeclared entities the checker refers to directly.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Universe {
    pub scope: ScopeId,
    /// The empty interface, `any`.
    pub any: TypeId,
    /// The predeclared `error` type (read only by tests).
    #[cfg(test)]
    pub error: TypeId,
}

const TYPED_BASICS: [BasicKind; 17] = [
    BasicKind::Bool,
    BasicKind::Int,
    BasicKind::Int8,
    BasicKind::Int16,
    BasicKind::Int32,
    BasicKind::Int64,
    BasicKind::Uint,
    BasicKind::Uint8,
    BasicKind::Uint16,
    BasicKind::Uint32,
    BasicKind::Uint64,
    BasicKind::Uintptr,
    BasicKind::Float32,
    BasicKind::Float64,
    BasicKind::Complex64,
    BasicKind::Complex128,
    BasicKind::String,
];

pub(crate) fn build(info: &mut TypeInfo) -> Universe {
    let scope = info.scope_table.alloc(ScopeKind::Universe, None);

    let declare = |info: &mut TypeInfo, name: &str, kind: ObjectKind, ty: TypeId| -> ObjectId {
        let obj = info.objects.alloc(Object {
            name: name.to_string(),
            kind,
            pos: Pos::NONE,
            ty,
            parent: Some(scope),
            import: None,
        });
        info.scope_table.insert(scope, name, obj);
        obj
    };

    for kind in TYPED_BASICS {
        declare(info, kind.name(), ObjectKind::TypeName { alias: false }, TypeTable::basic(kind));
    }
    declare(
        info,
        "byte",
        ObjectKind::TypeName { alias: true },
        TypeTable::basic(BasicKind::Uint8),
    );
    declare(
        info,
        "rune",
        ObjectKind::TypeName { alias: true },
        TypeTable::basic(BasicKind::Int32),
    );

    let any = info.type_table.alloc(Type::Interface(InterfaceType {
        methods: Vec::new(),
        embeddeds: Vec::new(),
    }));
    declare(info, "any", ObjectKind::TypeName { alias: true }, any);

    // type error interface { Error() string }
    let error_obj = declare(
        info,
        "error",
        ObjectKind::TypeName { alias: false },
        TypeTable::invalid(),
    );
    let error = info.type_table.alloc(Type::Named(NamedType {
        obj: error_obj,
        underlying: None,
        methods: Vec::new(),
        type_params: Vec::new(),
        type_args: Vec::new(),
        origin: None,
    }));
    let result = info.objects.alloc(Object {
        name: String::new(),
        kind: ObjectKind::Var {
            field: false,
            embedded: false,
        },
        pos: Pos::NONE,
        ty: TypeTable::basic(BasicKind::String),
        parent: None,
        import: None,
    });
    let recv = info.objects.alloc(Object {
        name: String::new(),
        kind: ObjectKind::Var {
            field: false,
            embedded: false,
        },
        pos: Pos::NONE,
        ty: error,
        parent: None,
        import: None,
    });
    let sig = info.type_table.alloc(Type::Signature(Signature {
        recv: Some(recv),
        type_params: Vec::new(),
        params: Vec::new(),
        results: vec![result],
        variadic: false,
    }));
    let method = info.objects.alloc(Object {
        name: "Error".to_string(),
        kind: ObjectKind::Func,
        pos: Pos::NONE,
        ty: sig,
        parent: None,
        import: None,
    });
    let underlying = info.type_table.alloc(Type::Interface(InterfaceType {
        methods: vec![method],
        embeddeds: Vec::new(),
    }));
    if let Type::Named(named) = info.type_table.get_mut(error) {
        named.underlying = Some(underlying);
    }
    info.objects.get_mut(error_obj).ty = error;

    let comparable_obj = declare(
        info,
        "comparable",
        ObjectKind::TypeName { alias: false },
        TypeTable::invalid(),
    );
    let comparable = info.type_table.alloc(Type::Named(NamedType {
        obj: comparable_obj,
        underlying: Some(any),
        methods: Vec::new(),
        type_params: Vec::new(),
        type_args: Vec::new(),
        origin: None,
    }));
    info.objects.get_mut(comparable_obj).ty = comparable;

    let untyped_bool = TypeTable::basic(BasicKind::UntypedBool);
    declare(info, "true", ObjectKind::Const { value: Value::Bool(true) }, untyped_bool);
    declare(info, "false", ObjectKind::Const { value: Value::Bool(false) }, untyped_bool);
    declare(
        info,
        "iota",
        ObjectKind::Const { value: Value::Int(0) },
        TypeTable::basic(BasicKind::UntypedInt),
    );
    declare(info, "nil", ObjectKind::Nil, TypeTable::basic(BasicKind::UntypedNil));

    for builtin in Builtin::ALL {
        declare(info, builtin.name(), ObjectKind::Builtin(builtin), TypeTable::invalid());
    }

    Universe {
        scope,
        any,
        #[cfg(test)]
        error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predeclared_names_resolve() {
        let mut info = TypeInfo::new();
        let universe = build(&mut info);
        let scope = info.scope(universe.scope);

        for name in ["int", "string", "byte", "rune", "error", "any", "len", "nil", "true"] {
            assert!(scope.lookup(name).is_some(), "{name}");
        }

        let byte = scope.lookup("byte").unwrap();
        assert_eq!(info.object(byte).ty, TypeTable::basic(BasicKind::Uint8));

        let error = scope.lookup("error").unwrap();
        assert_eq!(info.object(error).ty, universe.error);
        assert!(matches!(info.ty(universe.error), Type::Named(n) if n.underlying.is_some()));
    }
}
