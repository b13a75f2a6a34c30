//! The slice of the front end's type system that device calls need.
//!
//! Only enough structure is modelled to decide whether a declared signature
//! can cross the device call boundary and to render the offending type in a
//! diagnostic. Types are plain values; equality is structural.

use std::fmt;

/// Primitive numeric scalar kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumericKind {
    /// Unsigned natural number.
    Nat,
    /// Signed 64-bit integer.
    Int,
    /// 64-bit float.
    Float,
}

impl fmt::Display for NumericKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            NumericKind::Nat => "nat",
            NumericKind::Int => "int",
            NumericKind::Float => "float",
        })
    }
}

/// Ownership flag attached to a function input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum InputFlags {
    /// Borrowed for the duration of the call and left with the caller.
    #[default]
    Borrowed,
    /// Moved into the callee.
    Owned,
    /// Exclusively borrowed for the call and handed back afterwards.
    Inout,
}

impl fmt::Display for InputFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputFlags::Borrowed => Ok(()),
            InputFlags::Owned => f.write_str(" @owned"),
            InputFlags::Inout => f.write_str(" @inout"),
        }
    }
}

/// Native library a module handle refers to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModuleInfo {
    pub gpu_file: String,
    pub gpu_config: Option<String>,
}

/// A type defined outside the language core, such as a module handle.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OpaqueType {
    pub name: String,
    /// Set when the type is the handle of a declared GPU module.
    pub module: Option<ModuleInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Numeric(NumericKind),
    Bool,
    /// The unit return type.
    None,
    Array { elem: Box<Type>, len: usize },
    Tuple(Vec<Type>),
    Struct(String),
    Opaque(OpaqueType),
}

impl Type {
    pub const INT: Type = Type::Numeric(NumericKind::Int);
    pub const NAT: Type = Type::Numeric(NumericKind::Nat);
    pub const FLOAT: Type = Type::Numeric(NumericKind::Float);

    pub fn array(elem: Type, len: usize) -> Self {
        Type::Array {
            elem: Box::new(elem),
            len,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Type::None)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Type::Numeric(_))
    }

    pub fn module_info(&self) -> Option<&ModuleInfo> {
        gpu_module_info(self)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Numeric(kind) => write!(f, "{kind}"),
            Type::Bool => f.write_str("bool"),
            Type::None => f.write_str("None"),
            Type::Array { elem, len } => write!(f, "array[{elem}, {len}]"),
            Type::Tuple(elems) => {
                f.write_str("(")?;
                for (i, elem) in elems.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{elem}")?;
                }
                f.write_str(")")
            }
            Type::Struct(name) => f.write_str(name),
            Type::Opaque(opaque) => f.write_str(&opaque.name),
        }
    }
}

/// Returns the module a handle type refers to, or `None` for any other type.
pub fn gpu_module_info(ty: &Type) -> Option<&ModuleInfo> {
    match ty {
        Type::Opaque(OpaqueType {
            module: Some(info), ..
        }) => Some(info),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FuncInput {
    pub name: String,
    pub ty: Type,
    pub flags: InputFlags,
}

impl FuncInput {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
            flags: InputFlags::Borrowed,
        }
    }

    pub fn owned(mut self) -> Self {
        self.flags = InputFlags::Owned;
        self
    }

    pub fn inout(mut self) -> Self {
        self.flags = InputFlags::Inout;
        self
    }
}

/// Declared shape of a function: ordered inputs and a return type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctionType {
    pub inputs: Vec<FuncInput>,
    pub output: Type,
}

impl FunctionType {
    pub fn new(inputs: Vec<FuncInput>, output: Type) -> Self {
        Self { inputs, output }
    }
}

impl fmt::Display for FunctionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, input) in self.inputs.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}: {}{}", input.name, input.ty, input.flags)?;
        }
        write!(f, ") -> {}", self.output)
    }
}
