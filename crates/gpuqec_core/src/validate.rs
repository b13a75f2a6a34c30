//! Declaration-time checks for functions bound as device calls.
//!
//! A device call receives its module context as the first input, taken
//! `@inout` so the caller holds it exclusively for the duration of the call.
//! Every other input and the return value must be a primitive numeric scalar,
//! since only those have a transport representation. Checks run once per
//! declaration and never at call time.

use crate::ty::{FuncInput, FunctionType, InputFlags, ModuleInfo, Type, gpu_module_info};
use std::fmt;
use std::panic::Location;
use thiserror::Error;

/// Why a declared signature cannot be bound as a device call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    /// The first input is missing, is not a module handle, or is not `@inout`.
    #[error("first argument of a GPU function must be a GPU module taken `@inout`, {}", found(.ty))]
    FirstArgNotModule { ty: Option<Type> },

    /// An input after the first, or the return type, has no transport form.
    #[error("type `{ty}` cannot be passed to or returned from a GPU function")]
    UnconvertibleType { ty: Type },
}

fn found(ty: &Option<Type>) -> String {
    match ty {
        Some(ty) => format!("found `{ty}`"),
        None => "but the function takes no arguments".to_string(),
    }
}

/// Whether `ty` can be carried across the device call boundary.
pub fn is_device_type(ty: &Type) -> bool {
    ty.is_numeric()
}

/// Checks the four device-call rules in order, stopping at the first failure.
pub fn validate(sig: &FunctionType) -> Result<(), SignatureError> {
    match sig.inputs.first() {
        Some(FuncInput {
            ty,
            flags: InputFlags::Inout,
            ..
        }) if gpu_module_info(ty).is_some() => {}
        Some(FuncInput { ty, .. }) => {
            return Err(SignatureError::FirstArgNotModule {
                ty: Some(ty.clone()),
            });
        }
        None => return Err(SignatureError::FirstArgNotModule { ty: None }),
    }

    if let Some(bad) = sig.inputs[1..].iter().find(|i| !is_device_type(&i.ty)) {
        return Err(SignatureError::UnconvertibleType { ty: bad.ty.clone() });
    }

    if !sig.output.is_none() && !is_device_type(&sig.output) {
        return Err(SignatureError::UnconvertibleType {
            ty: sig.output.clone(),
        });
    }

    Ok(())
}

/// Like [`validate`], and additionally requires the handle to belong to `module`.
pub fn validate_method(sig: &FunctionType, module: &ModuleInfo) -> Result<(), SignatureError> {
    validate(sig)?;
    let first = &sig.inputs[0].ty;
    if gpu_module_info(first) != Some(module) {
        return Err(SignatureError::FirstArgNotModule {
            ty: Some(first.clone()),
        });
    }
    Ok(())
}

/// Where a declaration was made.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceLocation {
    pub file: String,
    pub line: u32,
    pub column: u32,
}

impl SourceLocation {
    pub fn new(file: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            file: file.into(),
            line,
            column,
        }
    }
}

impl From<&Location<'_>> for SourceLocation {
    fn from(loc: &Location<'_>) -> Self {
        Self::new(loc.file(), loc.line(), loc.column())
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// A rejected declaration, with enough context to point the user at it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Qualified name of the declaration, e.g. `Decoder.reset_decoder_ui64`.
    pub name: String,
    pub location: Option<SourceLocation>,
    pub error: SignatureError,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(loc) = &self.location {
            write!(f, "{loc}: ")?;
        }
        write!(f, "error in `{}`: {}", self.name, self.error)
    }
}

impl std::error::Error for Diagnostic {}
