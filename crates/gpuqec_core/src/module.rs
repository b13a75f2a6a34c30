//! GPU module definitions and their lifecycle functions.
//!
//! A module names one native library (and optionally a configuration file for
//! it). Declaring a module introduces an opaque handle type and two functions
//! shaped the same way for every module: a constructor that produces a handle
//! and a teardown that consumes it.

use crate::ty::{FuncInput, FunctionType, InputFlags, ModuleInfo, OpaqueType, Type, gpu_module_info};
use gpuqec_common::wire::{CONST_MODULE_VALUE, CONTEXT_TYPE, EXTENSION_NAME, MODULE_TYPE};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A declared GPU module.
///
/// Only one module may be bound per native file, and vice versa.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GpuModuleDef {
    pub name: String,
    pub gpu_file: String,
    pub gpu_config: Option<String>,
    /// Whether the constructor takes a numeric sizing argument.
    pub init_arg: bool,
}

impl GpuModuleDef {
    pub fn new(name: impl Into<String>, gpu_file: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            gpu_file: gpu_file.into(),
            gpu_config: None,
            init_arg: false,
        }
    }

    pub fn with_config(mut self, gpu_config: impl Into<String>) -> Self {
        self.gpu_config = Some(gpu_config.into());
        self
    }

    pub fn with_init_arg(mut self) -> Self {
        self.init_arg = true;
        self
    }

    pub fn info(&self) -> ModuleInfo {
        ModuleInfo {
            gpu_file: self.gpu_file.clone(),
            gpu_config: self.gpu_config.clone(),
        }
    }

    /// The opaque handle type values of this module have.
    pub fn handle_type(&self) -> Type {
        Type::Opaque(OpaqueType {
            name: self.name.clone(),
            module: Some(self.info()),
        })
    }

    /// Extension type every module handle lowers to.
    pub fn lowered_type(&self) -> ExtensionType {
        ExtensionType::new(CONTEXT_TYPE)
    }

    /// `() -> Handle`, or `(size: nat @owned) -> Handle` for sized modules.
    pub fn constructor_type(&self) -> FunctionType {
        let inputs = if self.init_arg {
            vec![FuncInput::new("size", Type::NAT).owned()]
        } else {
            Vec::new()
        };
        FunctionType::new(inputs, self.handle_type())
    }

    /// `(self: Handle @owned) -> None`.
    pub fn discard_type(&self) -> FunctionType {
        FunctionType::new(
            vec![FuncInput::new("self", self.handle_type()).owned()],
            Type::None,
        )
    }

    /// Constant the runtime uses to locate the native library.
    pub fn const_value(&self) -> ConstGpuModule {
        ConstGpuModule {
            module_filename: self.gpu_file.clone(),
            config_filename: self.gpu_config.clone(),
        }
    }
}

/// A type provided by the compiler extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExtensionType {
    pub extension: &'static str,
    pub name: &'static str,
}

impl ExtensionType {
    pub const fn new(name: &'static str) -> Self {
        Self {
            extension: EXTENSION_NAME,
            name,
        }
    }
}

impl fmt::Display for ExtensionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.extension, self.name)
    }
}

/// Constant reference to a native module, as handed to the runtime.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConstGpuModule {
    pub module_filename: String,
    pub config_filename: Option<String>,
}

impl ConstGpuModule {
    pub const NAME: &'static str = CONST_MODULE_VALUE;

    pub fn value_type(&self) -> ExtensionType {
        ExtensionType::new(MODULE_TYPE)
    }
}

impl fmt::Display for ConstGpuModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.module(gpu_file={}, ", EXTENSION_NAME, self.module_filename)?;
        match &self.config_filename {
            Some(config) => write!(f, "gpu_config={config})"),
            None => f.write_str("gpu_config=None)"),
        }
    }
}

/// A lifecycle function does not have the shape every module shares.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    #[error("constructor takes at most one argument, found {found}")]
    ConstructorArity { found: usize },

    #[error("constructor takes {found} argument(s) but init_arg is {init_arg}")]
    InitArgMismatch { init_arg: bool, found: usize },

    #[error("constructor argument must be an owned numeric value, found `{ty}`")]
    ConstructorInput { ty: Type },

    #[error("constructor must return a handle of module `{module}`, found `{ty}`")]
    ConstructorOutput { module: String, ty: Type },

    #[error("discard takes exactly one argument, found {found}")]
    DiscardArity { found: usize },

    #[error("discard must consume a handle of module `{module}`, found `{ty}`")]
    DiscardInput { module: String, ty: Type },

    #[error("discard must return None, found `{ty}`")]
    DiscardOutput { ty: Type },
}

fn is_handle_of(ty: &Type, def: &GpuModuleDef) -> bool {
    gpu_module_info(ty).is_some_and(|info| info.gpu_file == def.gpu_file)
}

/// Checks that `ty` is a valid constructor for `def`.
pub fn validate_constructor(def: &GpuModuleDef, ty: &FunctionType) -> Result<(), LifecycleError> {
    match ty.inputs.as_slice() {
        [] => {}
        [input] if input.ty.is_numeric() && input.flags == InputFlags::Owned => {}
        [input] => {
            return Err(LifecycleError::ConstructorInput {
                ty: input.ty.clone(),
            });
        }
        inputs => {
            return Err(LifecycleError::ConstructorArity {
                found: inputs.len(),
            });
        }
    }
    if ty.inputs.len() != def.init_arg as usize {
        return Err(LifecycleError::InitArgMismatch {
            init_arg: def.init_arg,
            found: ty.inputs.len(),
        });
    }
    if !is_handle_of(&ty.output, def) {
        return Err(LifecycleError::ConstructorOutput {
            module: def.name.clone(),
            ty: ty.output.clone(),
        });
    }
    Ok(())
}

/// Checks that `ty` is a valid teardown for `def`.
pub fn validate_discard(def: &GpuModuleDef, ty: &FunctionType) -> Result<(), LifecycleError> {
    let [input] = ty.inputs.as_slice() else {
        return Err(LifecycleError::DiscardArity {
            found: ty.inputs.len(),
        });
    };
    if input.flags != InputFlags::Owned || !is_handle_of(&input.ty, def) {
        return Err(LifecycleError::DiscardInput {
            module: def.name.clone(),
            ty: input.ty.clone(),
        });
    }
    if !ty.output.is_none() {
        return Err(LifecycleError::DiscardOutput {
            ty: ty.output.clone(),
        });
    }
    Ok(())
}
