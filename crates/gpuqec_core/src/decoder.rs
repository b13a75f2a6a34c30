//! Client for the GPU decoder library.
//!
//! Declares the decoder module and its three native operations. A
//! [`Decoder`] owns one live handle and a [`DeviceTransport`], packing
//! syndromes into transport words on the way out and unpacking corrections
//! on the way back.

use crate::bit_utils::{BitPack, CodecError};
use crate::handle::DeviceHandle;
use crate::module::GpuModuleDef;
use crate::registry::{BoundFunction, BoundModule, FunctionDecl, ModuleDecl};
use crate::ty::{FuncInput, FunctionType, Type};
use gpuqec_common::ops::DeviceOp;
use thiserror::Error;
use tracing::trace;

pub const DECODER_MODULE: &str = "Decoder";
pub const DECODER_FILE: &str = "cudaq-qec";

/// Declared signature of a native decoder operation on `module`.
pub fn decoder_signature(op: DeviceOp, module: &GpuModuleDef) -> FunctionType {
    let mut inputs = vec![
        FuncInput::new("self", module.handle_type()).inout(),
        FuncInput::new("decoder_id", Type::INT),
    ];
    match op {
        DeviceOp::EnqueueSyndromes => {
            inputs.push(FuncInput::new("syndrome_size", Type::INT));
            inputs.push(FuncInput::new("syndrome", Type::INT));
            inputs.push(FuncInput::new("tag", Type::INT));
        }
        DeviceOp::GetCorrections => {
            inputs.push(FuncInput::new("return_size", Type::INT));
            inputs.push(FuncInput::new("reset", Type::INT));
        }
        DeviceOp::ResetDecoder => {}
    }
    let output = if op.returns_word() { Type::INT } else { Type::None };
    FunctionType::new(inputs, output)
}

/// Declaration of the GPU decoder library module.
#[track_caller]
pub fn decoder_module() -> ModuleDecl {
    let def = GpuModuleDef::new(DECODER_MODULE, DECODER_FILE);
    let mut decl = ModuleDecl::new(def.clone());
    let location = decl.location.clone();
    for op in DeviceOp::ALL {
        let mut f = FunctionDecl::new(op.symbol(), decoder_signature(op, &def));
        f.location = location.clone();
        decl = decl.function(f);
    }
    decl
}

/// Numeric value crossing the device call boundary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Int(i64),
    Nat(u64),
    Float(f64),
}

impl Value {
    /// Reinterprets a packed word as the `int` the native side receives.
    pub fn word(word: u64) -> Self {
        Value::Int(word as i64)
    }

    pub fn as_word(&self) -> Option<u64> {
        match *self {
            Value::Int(v) => Some(v as u64),
            Value::Nat(v) => Some(v),
            Value::Float(_) => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("device call `{name}` failed: {message}")]
    Call { name: String, message: String },

    #[error("device call `{name}` returned {found:?}")]
    UnexpectedReturn { name: String, found: Option<Value> },
}

/// Carries bound calls to the external GPU runtime.
pub trait DeviceTransport {
    fn invoke(
        &mut self,
        handle: &mut DeviceHandle,
        func: &BoundFunction,
        args: &[Value],
    ) -> Result<Option<Value>, TransportError>;
}

impl<T: DeviceTransport + ?Sized> DeviceTransport for &mut T {
    fn invoke(
        &mut self,
        handle: &mut DeviceHandle,
        func: &BoundFunction,
        args: &[Value],
    ) -> Result<Option<Value>, TransportError> {
        (**self).invoke(handle, func, args)
    }
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("module `{module}` does not bind `{symbol}`")]
    MissingBinding { module: String, symbol: &'static str },

    #[error("handle belongs to `{found}`, expected `{expected}`")]
    WrongHandle { expected: String, found: String },
}

/// Typed client for the decoder library.
///
/// Owns the module handle for its whole lifetime; syndromes and corrections
/// are packed and unpacked at this boundary.
pub struct Decoder<T> {
    handle: DeviceHandle,
    transport: T,
    enqueue: BoundFunction,
    corrections: BoundFunction,
    reset: BoundFunction,
}

impl<T: DeviceTransport> Decoder<T> {
    pub fn new(module: &BoundModule, handle: DeviceHandle, transport: T) -> Result<Self, ClientError> {
        if handle.module().gpu_file != module.def.gpu_file {
            return Err(ClientError::WrongHandle {
                expected: module.def.gpu_file.clone(),
                found: handle.module().gpu_file.clone(),
            });
        }
        let lookup = |op: DeviceOp| {
            module
                .op(op)
                .cloned()
                .ok_or_else(|| ClientError::MissingBinding {
                    module: module.def.name.clone(),
                    symbol: op.symbol(),
                })
        };
        Ok(Self {
            enqueue: lookup(DeviceOp::EnqueueSyndromes)?,
            corrections: lookup(DeviceOp::GetCorrections)?,
            reset: lookup(DeviceOp::ResetDecoder)?,
            handle,
            transport,
        })
    }

    pub fn enqueue_syndromes(
        &mut self,
        decoder_id: i64,
        syndrome: &[bool],
        tag: i64,
    ) -> Result<(), ClientError> {
        let word = BitPack::pack(syndrome)?;
        self.send_syndrome(decoder_id, syndrome.len(), word, tag)
    }

    pub fn enqueue_syndromes_array<const N: usize>(
        &mut self,
        decoder_id: i64,
        syndrome: [bool; N],
        tag: i64,
    ) -> Result<(), ClientError> {
        let word = BitPack::pack_array(syndrome);
        self.send_syndrome(decoder_id, N, word, tag)
    }

    fn send_syndrome(
        &mut self,
        decoder_id: i64,
        size: usize,
        word: u64,
        tag: i64,
    ) -> Result<(), ClientError> {
        trace!(decoder_id, size, word, tag, "enqueue syndrome");
        let args = [
            Value::Int(decoder_id),
            Value::Int(size as i64),
            Value::word(word),
            Value::Int(tag),
        ];
        self.call_unit(Which::Enqueue, &args)
    }

    pub fn get_corrections(
        &mut self,
        decoder_id: i64,
        return_size: usize,
        reset: bool,
    ) -> Result<Vec<bool>, ClientError> {
        BitPack::check_width(return_size)?;
        let word = self.fetch_corrections(decoder_id, return_size, reset)?;
        Ok(BitPack::unpack(word, return_size)?)
    }

    pub fn get_corrections_array<const N: usize>(
        &mut self,
        decoder_id: i64,
        reset: bool,
    ) -> Result<[bool; N], ClientError> {
        let word = self.fetch_corrections(decoder_id, N, reset)?;
        Ok(BitPack::unpack_array(word))
    }

    fn fetch_corrections(
        &mut self,
        decoder_id: i64,
        return_size: usize,
        reset: bool,
    ) -> Result<u64, ClientError> {
        let args = [
            Value::Int(decoder_id),
            Value::Int(return_size as i64),
            Value::Int(reset as i64),
        ];
        let ret = self
            .transport
            .invoke(&mut self.handle, &self.corrections, &args)?;
        let word = ret.as_ref().and_then(Value::as_word).ok_or_else(|| {
            TransportError::UnexpectedReturn {
                name: self.corrections.name.clone(),
                found: ret,
            }
        })?;
        trace!(decoder_id, return_size, word, "corrections");
        Ok(word)
    }

    pub fn reset_decoder(&mut self, decoder_id: i64) -> Result<(), ClientError> {
        self.call_unit(Which::Reset, &[Value::Int(decoder_id)])
    }

    fn call_unit(&mut self, which: Which, args: &[Value]) -> Result<(), ClientError> {
        let func = match which {
            Which::Enqueue => &self.enqueue,
            Which::Reset => &self.reset,
        };
        match self.transport.invoke(&mut self.handle, func, args)? {
            None => Ok(()),
            found => Err(TransportError::UnexpectedReturn {
                name: func.name.clone(),
                found,
            }
            .into()),
        }
    }

    pub fn handle(&self) -> &DeviceHandle {
        &self.handle
    }

    /// Discards the module handle and hands the transport back.
    pub fn close(self) -> T {
        self.handle.discard();
        self.transport
    }
}

#[derive(Clone, Copy)]
enum Which {
    Enqueue,
    Reset,
}
