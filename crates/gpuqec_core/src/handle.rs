//! Linear device handles.
//!
//! A [`DeviceHandle`] stands for one open context of a native module. It is
//! neither `Clone` nor `Copy`, so the type system already prevents aliasing a
//! handle; [`DeviceContext`] additionally refuses to open a second live handle
//! for a module file while the first is still around.

use crate::module::GpuModuleDef;
use crate::ty::ModuleInfo;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandleError {
    #[error("module `{module}` already has a live handle for `{gpu_file}`")]
    AlreadyLive { module: String, gpu_file: String },

    #[error("constructor of module `{module}` takes {expected} argument(s), got {found}")]
    ConstructorArity {
        module: String,
        expected: usize,
        found: usize,
    },
}

/// Tracks which module instances currently have a live handle.
///
/// Clones share the same set of live instances.
#[derive(Debug, Clone, Default)]
pub struct DeviceContext {
    live: Arc<Mutex<HashSet<String>>>,
}

impl DeviceContext {
    pub fn new() -> Self {
        Self::default()
    }

    fn live(&self) -> MutexGuard<'_, HashSet<String>> {
        self.live.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Opens the context of `def`.
    ///
    /// `size` must be given exactly when the module's constructor takes a
    /// sizing argument.
    pub fn open(&self, def: &GpuModuleDef, size: Option<u64>) -> Result<DeviceHandle, HandleError> {
        if def.init_arg != size.is_some() {
            return Err(HandleError::ConstructorArity {
                module: def.name.clone(),
                expected: def.init_arg as usize,
                found: size.is_some() as usize,
            });
        }

        if !self.live().insert(def.gpu_file.clone()) {
            return Err(HandleError::AlreadyLive {
                module: def.name.clone(),
                gpu_file: def.gpu_file.clone(),
            });
        }

        debug!(module = %def.name, gpu_file = %def.gpu_file, ?size, "opened device handle");
        Ok(DeviceHandle {
            name: def.name.clone(),
            module: def.info(),
            size,
            context: self.clone(),
            released: false,
        })
    }

    pub fn is_live(&self, gpu_file: &str) -> bool {
        self.live().contains(gpu_file)
    }

    pub fn live_count(&self) -> usize {
        self.live().len()
    }

    fn release(&self, gpu_file: &str) {
        self.live().remove(gpu_file);
    }
}

/// Exclusive token for one open module context.
#[derive(Debug)]
pub struct DeviceHandle {
    name: String,
    module: ModuleInfo,
    size: Option<u64>,
    context: DeviceContext,
    released: bool,
}

impl DeviceHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn module(&self) -> &ModuleInfo {
        &self.module
    }

    pub fn size(&self) -> Option<u64> {
        self.size
    }

    /// Tears the context down. Consumes the handle.
    pub fn discard(mut self) {
        self.release();
        debug!(module = %self.name, "discarded device handle");
    }

    fn release(&mut self) {
        if !self.released {
            self.context.release(&self.module.gpu_file);
            self.released = true;
        }
    }
}

impl Drop for DeviceHandle {
    fn drop(&mut self) {
        if !self.released {
            warn!(module = %self.name, "device handle dropped without discard");
            self.release();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_live_handle_is_refused() {
        let ctx = DeviceContext::new();
        let def = GpuModuleDef::new("Decoder", "cudaq-qec");

        let handle = ctx.open(&def, None).unwrap();
        assert!(ctx.is_live("cudaq-qec"));
        assert!(matches!(
            ctx.open(&def, None),
            Err(HandleError::AlreadyLive { .. })
        ));

        handle.discard();
        assert!(!ctx.is_live("cudaq-qec"));
        ctx.open(&def, None).unwrap().discard();
    }

    #[test]
    fn distinct_modules_coexist() {
        let ctx = DeviceContext::new();
        let a = ctx.open(&GpuModuleDef::new("A", "a-lib"), None).unwrap();
        let b = ctx.open(&GpuModuleDef::new("B", "b-lib"), None).unwrap();
        assert_eq!(ctx.live_count(), 2);
        a.discard();
        b.discard();
        assert_eq!(ctx.live_count(), 0);
    }

    #[test]
    fn dropping_releases_the_instance() {
        let ctx = DeviceContext::new();
        let def = GpuModuleDef::new("Decoder", "cudaq-qec");
        {
            let _handle = ctx.open(&def, None).unwrap();
            assert_eq!(ctx.live_count(), 1);
        }
        assert_eq!(ctx.live_count(), 0);
    }

    #[test]
    fn constructor_arity_follows_init_arg() {
        let ctx = DeviceContext::new();
        let plain = GpuModuleDef::new("Decoder", "cudaq-qec");
        let sized = GpuModuleDef::new("Sized", "sized-lib").with_init_arg();

        assert_eq!(
            ctx.open(&plain, Some(4)).unwrap_err(),
            HandleError::ConstructorArity {
                module: "Decoder".into(),
                expected: 0,
                found: 1
            }
        );
        assert!(ctx.open(&sized, None).is_err());

        let handle = ctx.open(&sized, Some(16)).unwrap();
        assert_eq!(handle.size(), Some(16));
        assert_eq!(handle.module().gpu_file, "sized-lib");
        handle.discard();
        assert_eq!(ctx.live_count(), 0);
    }
}
