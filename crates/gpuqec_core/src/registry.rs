//! Explicit registration of GPU modules and device functions.
//!
//! Declarations are plain values built by the embedding application and
//! handed to [`Registry::register`]. Every declaration is validated when it is
//! registered; nothing is checked again at call time. A rejected batch leaves
//! the registry untouched.

use crate::module::{GpuModuleDef, LifecycleError, validate_constructor, validate_discard};
use crate::ty::FunctionType;
use crate::validate::{Diagnostic, SourceLocation, validate, validate_method};
use gpuqec_common::call_id::{CallId, call_id};
use gpuqec_common::ops::DeviceOp;
use gpuqec_common::wire::{CONSTRUCTOR_SYMBOL, DISCARD_SYMBOL};
use std::collections::HashSet;
use std::panic::Location;
use thiserror::Error;
use tracing::{debug, info};

/// How a function's call id is obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CallIdSpec {
    /// Dispatch by name only.
    #[default]
    None,
    Explicit(CallId),
    /// Derived from the function name.
    FromName,
}

impl CallIdSpec {
    pub fn resolve(self, name: &str) -> Option<CallId> {
        match self {
            CallIdSpec::None => None,
            CallIdSpec::Explicit(id) => Some(id),
            CallIdSpec::FromName => Some(call_id(name)),
        }
    }
}

/// A function to be bound as a device call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDecl {
    pub name: String,
    pub signature: FunctionType,
    pub call_id: CallIdSpec,
    pub location: Option<SourceLocation>,
}

impl FunctionDecl {
    /// Records the caller's location for diagnostics.
    #[track_caller]
    pub fn new(name: impl Into<String>, signature: FunctionType) -> Self {
        Self {
            name: name.into(),
            signature,
            call_id: CallIdSpec::None,
            location: Some(Location::caller().into()),
        }
    }

    pub fn with_call_id(mut self, id: CallId) -> Self {
        self.call_id = CallIdSpec::Explicit(id);
        self
    }

    pub fn hashed_call_id(mut self) -> Self {
        self.call_id = CallIdSpec::FromName;
        self
    }

    pub fn at(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }
}

/// A module together with the device functions declared on it.
///
/// Lifecycle signatures left as `None` are synthesised from the definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleDecl {
    pub def: GpuModuleDef,
    pub functions: Vec<FunctionDecl>,
    pub constructor: Option<FunctionType>,
    pub discard: Option<FunctionType>,
    pub location: Option<SourceLocation>,
}

impl ModuleDecl {
    #[track_caller]
    pub fn new(def: GpuModuleDef) -> Self {
        Self {
            def,
            functions: Vec::new(),
            constructor: None,
            discard: None,
            location: Some(Location::caller().into()),
        }
    }

    pub fn function(mut self, decl: FunctionDecl) -> Self {
        self.functions.push(decl);
        self
    }

    pub fn with_constructor(mut self, signature: FunctionType) -> Self {
        self.constructor = Some(signature);
        self
    }

    pub fn with_discard(mut self, signature: FunctionType) -> Self {
        self.discard = Some(signature);
        self
    }

    pub fn at(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    Call,
    Constructor,
    Discard,
}

/// A validated declaration, ready for dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundFunction {
    pub name: String,
    pub ty: FunctionType,
    pub call_id: Option<CallId>,
    pub kind: BindingKind,
    /// The native decoder operation this name exports, if any.
    pub op: Option<DeviceOp>,
}

impl BoundFunction {
    fn call(decl: &FunctionDecl) -> Self {
        Self {
            name: decl.name.clone(),
            ty: decl.signature.clone(),
            call_id: decl.call_id.resolve(&decl.name),
            kind: BindingKind::Call,
            op: DeviceOp::from_symbol(&decl.name),
        }
    }

    fn lifecycle(name: &str, ty: FunctionType, kind: BindingKind) -> Self {
        Self {
            name: name.to_string(),
            ty,
            call_id: None,
            kind,
            op: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundModule {
    pub def: GpuModuleDef,
    pub constructor: BoundFunction,
    pub discard: BoundFunction,
    /// Device functions in declaration order.
    pub functions: Vec<BoundFunction>,
}

impl BoundModule {
    pub fn function(&self, name: &str) -> Option<&BoundFunction> {
        self.functions.iter().find(|f| f.name == name)
    }

    pub fn op(&self, op: DeviceOp) -> Option<&BoundFunction> {
        self.functions.iter().find(|f| f.op == Some(op))
    }
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("{} invalid declaration(s):\n{}", .0.len(), render(.0))]
    Invalid(Vec<Diagnostic>),

    #[error("module `{0}` is already registered")]
    DuplicateModule(String),

    #[error("GPU file `{gpu_file}` is already bound to module `{existing}`")]
    DuplicateFile { gpu_file: String, existing: String },

    #[error("function `{name}` is declared more than once")]
    DuplicateFunction { name: String },

    #[error("call id {id:#010x} of `{name}` is already used by `{existing}`")]
    CallIdCollision {
        id: CallId,
        name: String,
        existing: String,
    },

    #[error("lifecycle of module `{module}` is malformed: {source}")]
    Lifecycle {
        module: String,
        #[source]
        source: LifecycleError,
    },
}

fn render(diags: &[Diagnostic]) -> String {
    diags
        .iter()
        .map(|d| format!("  {d}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Bound modules and free device functions.
#[derive(Debug, Default)]
pub struct Registry {
    documentation: bool,
    modules: Vec<BoundModule>,
    functions: Vec<BoundFunction>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry for documentation builds: registration is a no-op.
    pub fn documentation() -> Self {
        Self {
            documentation: true,
            ..Self::default()
        }
    }

    pub fn is_documentation(&self) -> bool {
        self.documentation
    }

    /// Validates and binds a batch of modules and free functions.
    ///
    /// Either the whole batch is bound or none of it is.
    pub fn register(
        &mut self,
        modules: Vec<ModuleDecl>,
        functions: Vec<FunctionDecl>,
    ) -> Result<(), RegistryError> {
        if self.documentation {
            debug!(
                modules = modules.len(),
                functions = functions.len(),
                "documentation mode, skipping registration"
            );
            return Ok(());
        }

        self.check_uniqueness(&modules, &functions)?;

        let mut diagnostics = Vec::new();
        let mut bound_modules = Vec::with_capacity(modules.len());
        for decl in &modules {
            let info = decl.def.info();
            for f in &decl.functions {
                if let Err(error) = validate_method(&f.signature, &info) {
                    diagnostics.push(Diagnostic {
                        name: format!("{}.{}", decl.def.name, f.name),
                        location: f.location.clone().or_else(|| decl.location.clone()),
                        error,
                    });
                }
            }
            bound_modules.push(bind_module(decl)?);
        }

        for f in &functions {
            if let Err(error) = validate(&f.signature) {
                diagnostics.push(Diagnostic {
                    name: f.name.clone(),
                    location: f.location.clone(),
                    error,
                });
            }
        }

        if !diagnostics.is_empty() {
            return Err(RegistryError::Invalid(diagnostics));
        }

        let bound_functions: Vec<_> = functions.iter().map(BoundFunction::call).collect();
        self.check_call_ids(&bound_modules, &bound_functions)?;

        for module in &bound_modules {
            info!(
                module = %module.def.name,
                gpu_file = %module.def.gpu_file,
                functions = module.functions.len(),
                "registered GPU module"
            );
        }
        for f in &bound_functions {
            debug!(function = %f.name, call_id = ?f.call_id, "registered GPU function");
        }

        self.modules.extend(bound_modules);
        self.functions.extend(bound_functions);
        Ok(())
    }

    fn check_uniqueness(
        &self,
        modules: &[ModuleDecl],
        functions: &[FunctionDecl],
    ) -> Result<(), RegistryError> {
        let mut names: HashSet<&str> = self.modules.iter().map(|m| m.def.name.as_str()).collect();
        let mut files: Vec<(&str, &str)> = self
            .modules
            .iter()
            .map(|m| (m.def.gpu_file.as_str(), m.def.name.as_str()))
            .collect();

        for decl in modules {
            if !names.insert(&decl.def.name) {
                return Err(RegistryError::DuplicateModule(decl.def.name.clone()));
            }
            if let Some((_, existing)) = files.iter().find(|(f, _)| *f == decl.def.gpu_file) {
                return Err(RegistryError::DuplicateFile {
                    gpu_file: decl.def.gpu_file.clone(),
                    existing: existing.to_string(),
                });
            }
            files.push((decl.def.gpu_file.as_str(), decl.def.name.as_str()));

            let mut seen = HashSet::new();
            for f in &decl.functions {
                if !seen.insert(f.name.as_str()) {
                    return Err(RegistryError::DuplicateFunction {
                        name: format!("{}.{}", decl.def.name, f.name),
                    });
                }
            }
        }

        let mut seen: HashSet<&str> = self.functions.iter().map(|f| f.name.as_str()).collect();
        for f in functions {
            if !seen.insert(&f.name) {
                return Err(RegistryError::DuplicateFunction {
                    name: f.name.clone(),
                });
            }
        }
        Ok(())
    }

    fn check_call_ids(
        &self,
        modules: &[BoundModule],
        functions: &[BoundFunction],
    ) -> Result<(), RegistryError> {
        let mut seen: Vec<(CallId, &str)> = self
            .all_functions()
            .filter_map(|f| f.call_id.map(|id| (id, f.name.as_str())))
            .collect();

        let incoming = modules
            .iter()
            .flat_map(|m| m.functions.iter())
            .chain(functions.iter());
        for f in incoming {
            let Some(id) = f.call_id else { continue };
            if let Some((_, existing)) = seen.iter().find(|(other, _)| *other == id) {
                return Err(RegistryError::CallIdCollision {
                    id,
                    name: f.name.clone(),
                    existing: existing.to_string(),
                });
            }
            seen.push((id, f.name.as_str()));
        }
        Ok(())
    }

    pub fn modules(&self) -> &[BoundModule] {
        &self.modules
    }

    pub fn functions(&self) -> &[BoundFunction] {
        &self.functions
    }

    pub fn module(&self, name: &str) -> Option<&BoundModule> {
        self.modules.iter().find(|m| m.def.name == name)
    }

    pub fn function(&self, module: &str, name: &str) -> Option<&BoundFunction> {
        self.module(module)?.function(name)
    }

    pub fn by_call_id(&self, id: CallId) -> Option<&BoundFunction> {
        self.all_functions().find(|f| f.call_id == Some(id))
    }

    fn all_functions(&self) -> impl Iterator<Item = &BoundFunction> {
        self.modules
            .iter()
            .flat_map(|m| m.functions.iter())
            .chain(self.functions.iter())
    }
}

fn bind_module(decl: &ModuleDecl) -> Result<BoundModule, RegistryError> {
    let def = &decl.def;
    let constructor = decl
        .constructor
        .clone()
        .unwrap_or_else(|| def.constructor_type());
    let discard = decl.discard.clone().unwrap_or_else(|| def.discard_type());
    validate_constructor(def, &constructor)
        .and_then(|_| validate_discard(def, &discard))
        .map_err(|source| RegistryError::Lifecycle {
            module: def.name.clone(),
            source,
        })?;

    Ok(BoundModule {
        def: def.clone(),
        constructor: BoundFunction::lifecycle(
            CONSTRUCTOR_SYMBOL,
            constructor,
            BindingKind::Constructor,
        ),
        discard: BoundFunction::lifecycle(DISCARD_SYMBOL, discard, BindingKind::Discard),
        functions: decl.functions.iter().map(BoundFunction::call).collect(),
    })
}
