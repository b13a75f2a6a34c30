//! Binding layer between a quantum language front end and a GPU decoder.
//!
//! This crate describes how declared functions become device calls into an
//! external GPU-resident error correction decoder: which signatures are legal
//! to bind, how module handles are owned, how call ids are assigned, and how
//! syndrome and correction bit vectors are packed into transport words. The
//! decoding itself, the GPU runtime and the compiler IR all live elsewhere.

/// Big-endian packing of bit vectors into 64-bit transport words.
///
/// Converts between boolean vectors of at most 64 bits and the single
/// unsigned word the decoder's native entry points exchange. Bit 0 of the
/// vector is the most significant populated bit of the word.
pub mod bit_utils;

/// Typed client for the GPU decoder library.
///
/// Declares the decoder module and its three native operations, and wraps a
/// live handle plus a transport into a client that packs syndromes and
/// unpacks corrections at the call boundary.
pub mod decoder;

/// Linear device handles and live-instance tracking.
///
/// A handle is a move-only token for one open module context. Opening a
/// second handle for the same module file while one is live is refused.
pub mod handle;

/// Module definitions and their constructor/teardown shapes.
///
/// Describes a native library binding, the opaque handle type it introduces,
/// and the lifecycle functions every module shares.
pub mod module;

/// Explicit registration of modules and device functions.
///
/// Validates declarations once, synthesises lifecycle functions, resolves
/// call ids and exposes lookups for dispatch.
pub mod registry;

/// The slice of the front end's type system that device calls need.
pub mod ty;

/// Declaration-time signature checks and diagnostics.
pub mod validate;

pub use bit_utils::{BitPack, CodecError};
pub use handle::{DeviceContext, DeviceHandle, HandleError};
pub use registry::{FunctionDecl, ModuleDecl, Registry, RegistryError};
pub use validate::{SignatureError, validate};
