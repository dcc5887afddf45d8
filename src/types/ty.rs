//! Type representation.
//!
//! Types are stored in a [`TypeTable`]. Basic types occupy fixed slots at the
//! start of the table so `TypeTable::basic(kind)` needs no lookup. Composite
//! types are created on demand and compared structurally, see
//! [`TypeInfo::identical`](super::TypeInfo::identical).

use crate::types::ids::{ObjectId, TypeId};

/// Predeclared basic types, including the untyped constant kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum BasicKind {
    Invalid,
    Bool,
    Int,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Uintptr,
    Float32,
    Float64,
    Complex64,
    Complex128,
    String,
    UnsafePointer,
    UntypedBool,
    UntypedInt,
    UntypedRune,
    UntypedFloat,
    UntypedString,
    UntypedNil,
}

impl BasicKind {
    pub const ALL: [BasicKind; 25] = [
        BasicKind::Invalid,
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
        BasicKind::UnsafePointer,
        BasicKind::UntypedBool,
        BasicKind::UntypedInt,
        BasicKind::UntypedRune,
        BasicKind::UntypedFloat,
        BasicKind::UntypedString,
        BasicKind::UntypedNil,
    ];

    pub fn name(self) -> &'static str {
        match self {
            BasicKind::Invalid => "invalid type",
            BasicKind::Bool => "bool",
            BasicKind::Int => "int",
            BasicKind::Int8 => "int8",
            BasicKind::Int16 => "int16",
            BasicKind::Int32 => "int32",
            BasicKind::Int64 => "int64",
            BasicKind::Uint => "uint",
            BasicKind::Uint8 => "uint8",
            BasicKind::Uint16 => "uint16",
            BasicKind::Uint32 => "uint32",
            BasicKind::Uint64 => "uint64",
            BasicKind::Uintptr => "uintptr",
            BasicKind::Float32 => "float32",
            BasicKind::Float64 => "float64",
            BasicKind::Complex64 => "complex64",
            BasicKind::Complex128 => "complex128",
            BasicKind::String => "string",
            BasicKind::UnsafePointer => "unsafe.Pointer",
            BasicKind::UntypedBool => "untyped bool",
            BasicKind::UntypedInt => "untyped int",
            BasicKind::UntypedRune => "untyped rune",
            BasicKind::UntypedFloat => "untyped float",
            BasicKind::UntypedString => "untyped string",
            BasicKind::UntypedNil => "untyped nil",
        }
    }

    pub fn is_untyped(self) -> bool {
        matches!(
            self,
            BasicKind::UntypedBool
                | BasicKind::UntypedInt
                | BasicKind::UntypedRune
                | BasicKind::UntypedFloat
                | BasicKind::UntypedString
                | BasicKind::UntypedNil
        )
    }

    pub fn is_boolean(self) -> bool {
        matches!(self, BasicKind::Bool | BasicKind::UntypedBool)
    }

    pub fn is_integer(self) -> bool {
        matches!(
            self,
            BasicKind::Int
                | BasicKind::Int8
                | BasicKind::Int16
                | BasicKind::Int32
                | BasicKind::Int64
                | BasicKind::Uint
                | BasicKind::Uint8
                | BasicKind::Uint16
                | BasicKind::Uint32
                | BasicKind::Uint64
                | BasicKind::Uintptr
                | BasicKind::UntypedInt
                | BasicKind::UntypedRune
        )
    }

    pub fn is_unsigned(self) -> bool {
        matches!(
            self,
            BasicKind::Uint
                | BasicKind::Uint8
                | BasicKind::Uint16
                | BasicKind::Uint32
                | BasicKind::Uint64
                | BasicKind::Uintptr
        )
    }

    pub fn is_float(self) -> bool {
        matches!(
            self,
            BasicKind::Float32 | BasicKind::Float64 | BasicKind::UntypedFloat
        )
    }

    pub fn is_complex(self) -> bool {
        matches!(self, BasicKind::Complex64 | BasicKind::Complex128)
    }

    pub fn is_numeric(self) -> bool {
        self.is_integer() || self.is_float() || self.is_complex()
    }

    pub fn is_string(self) -> bool {
        matches!(self, BasicKind::String | BasicKind::UntypedString)
    }

    pub fn is_ordered(self) -> bool {
        self.is_integer() || self.is_float() || self.is_string()
    }

    /// Kinds a constant may have.
    pub fn is_const_type(self) -> bool {
        self.is_boolean() || self.is_numeric() || self.is_string()
    }

    /// Inclusive value range of a sized integer kind. Platform-sized kinds
    /// are treated as 64 bits.
    pub fn int_range(self) -> Option<(i128, i128)> {
        let range = match self {
            BasicKind::Int8 => (i8::MIN as i128, i8::MAX as i128),
            BasicKind::Int16 => (i16::MIN as i128, i16::MAX as i128),
            BasicKind::Int32 => (i32::MIN as i128, i32::MAX as i128),
            BasicKind::Int | BasicKind::Int64 => (i64::MIN as i128, i64::MAX as i128),
            BasicKind::Uint8 => (0, u8::MAX as i128),
            BasicKind::Uint16 => (0, u16::MAX as i128),
            BasicKind::Uint32 => (0, u32::MAX as i128),
            BasicKind::Uint | BasicKind::Uint64 | BasicKind::Uintptr => (0, u64::MAX as i128),
            _ => return None,
        };
        Some(range)
    }

    /// The type an untyped constant of this kind assumes by default.
    pub fn default_kind(self) -> BasicKind {
        match self {
            BasicKind::UntypedBool => BasicKind::Bool,
            BasicKind::UntypedInt => BasicKind::Int,
            BasicKind::UntypedRune => BasicKind::Int32,
            BasicKind::UntypedFloat => BasicKind::Float64,
            BasicKind::UntypedString => BasicKind::String,
            other => other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChanDir {
    Both,
    Send,
    Recv,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Signature {
    /// Receiver variable of a method.
    pub recv: Option<ObjectId>,
    pub type_params: Vec<TypeId>,
    pub params: Vec<ObjectId>,
    pub results: Vec<ObjectId>,
    /// The last parameter is `...T`; its recorded type is `[]T`.
    pub variadic: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructType {
    /// Field variables in declaration order.
    pub fields: Vec<ObjectId>,
    pub tags: Vec<Option<String>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InterfaceType {
    /// Explicitly declared methods.
    pub methods: Vec<ObjectId>,
    /// Embedded types and type-set terms.
    pub embeddeds: Vec<TypeId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NamedType {
    pub obj: ObjectId,
    /// Unset while the declaration is being resolved.
    pub underlying: Option<TypeId>,
    pub methods: Vec<ObjectId>,
    pub type_params: Vec<TypeId>,
    /// Set on instantiations such as `List[int]`.
    pub type_args: Vec<TypeId>,
    /// The generic type an instantiation was made from.
    pub origin: Option<TypeId>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Term {
    pub tilde: bool,
    pub ty: TypeId,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    Basic(BasicKind),
    Pointer(TypeId),
    Slice(TypeId),
    /// `len` is `None` when the length expression was invalid.
    Array { len: Option<u64>, elem: TypeId },
    Map { key: TypeId, value: TypeId },
    Chan { dir: ChanDir, elem: TypeId },
    Signature(Signature),
    Struct(StructType),
    Interface(InterfaceType),
    /// Multiple results of a call.
    Tuple(Vec<TypeId>),
    Named(NamedType),
    TypeParam { obj: ObjectId, constraint: TypeId },
    Union(Vec<Term>),
    /// A type from a package whose contents are unknown. Every operation on
    /// it is accepted.
    Opaque { name: Option<String> },
}

/// Owner of every [`Type`] created for one unit.
#[derive(Debug, Clone)]
pub struct TypeTable {
    types: Vec<Type>,
}

impl TypeTable {
    /// Slot of the unnamed opaque type.
    pub const OPAQUE: TypeId = TypeId(BasicKind::ALL.len() as u32);

    pub fn new() -> Self {
        let mut types: Vec<Type> = BasicKind::ALL.iter().map(|k| Type::Basic(*k)).collect();
        types.push(Type::Opaque { name: None });
        Self { types }
    }

    pub const fn basic(kind: BasicKind) -> TypeId {
        TypeId(kind as u32)
    }

    pub const fn invalid() -> TypeId {
        Self::basic(BasicKind::Invalid)
    }

    pub fn alloc(&mut self, ty: Type) -> TypeId {
        let id = TypeId(self.types.len() as u32);
        self.types.push(ty);
        id
    }

    pub fn get(&self, id: TypeId) -> &Type {
        &self.types[id.index()]
    }

    pub(crate) fn get_mut(&mut self, id: TypeId) -> &mut Type {
        &mut self.types[id.index()]
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl Default for TypeTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_slots_are_fixed() {
        let table = TypeTable::new();
        for kind in BasicKind::ALL {
            assert_eq!(table.get(TypeTable::basic(kind)), &Type::Basic(kind));
        }
        assert_eq!(table.get(TypeTable::OPAQUE), &Type::Opaque { name: None });
    }

    #[test]
    fn int_ranges() {
        assert_eq!(BasicKind::Int8.int_range(), Some((-128, 127)));
        assert_eq!(BasicKind::Uint8.int_range(), Some((0, 255)));
        assert_eq!(BasicKind::Float64.int_range(), None);
    }

    #[test]
    fn untyped_defaults() {
        assert_eq!(BasicKind::UntypedRune.default_kind(), BasicKind::Int32);
        assert_eq!(BasicKind::UntypedFloat.default_kind(), BasicKind::Float64);
        assert!(BasicKind::UntypedRune.is_integer());
        assert!(!BasicKind::String.is_numeric());
    }
}
