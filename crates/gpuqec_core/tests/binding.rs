use gpuqec_common::call_id::call_id;
use gpuqec_core::decoder::{DECODER_MODULE, Decoder, DeviceTransport, TransportError, Value, decoder_module};
use gpuqec_core::handle::{DeviceContext, DeviceHandle};
use gpuqec_core::module::GpuModuleDef;
use gpuqec_core::registry::{BoundFunction, FunctionDecl, ModuleDecl, Registry, RegistryError};
use gpuqec_core::ty::{FuncInput, FunctionType, Type};
use gpuqec_core::validate::SignatureError;
use std::collections::HashMap;

/// Stand-in for the GPU runtime: XORs every enqueued syndrome into the
/// decoder's correction word.
#[derive(Default)]
struct XorDevice {
    corrections: HashMap<i64, u64>,
}

impl DeviceTransport for XorDevice {
    fn invoke(
        &mut self,
        _handle: &mut DeviceHandle,
        func: &BoundFunction,
        args: &[Value],
    ) -> Result<Option<Value>, TransportError> {
        let int = |i: usize| match args[i] {
            Value::Int(v) => v,
            other => panic!("unexpected argument {other:?}"),
        };
        match func.name.as_str() {
            "enqueue_syndromes_ui64" => {
                *self.corrections.entry(int(0)).or_default() ^= int(2) as u64;
                Ok(None)
            }
            "get_corrections_ui64" => {
                let word = self.corrections.get(&int(0)).copied().unwrap_or(0);
                if int(2) != 0 {
                    self.corrections.remove(&int(0));
                }
                Ok(Some(Value::word(word)))
            }
            "reset_decoder_ui64" => {
                self.corrections.remove(&int(0));
                Ok(None)
            }
            other => Err(TransportError::Call {
                name: other.to_string(),
                message: "unknown entry point".into(),
            }),
        }
    }
}

#[test]
fn decoder_round_trip_through_a_device() {
    let mut reg = Registry::new();
    reg.register(vec![decoder_module()], vec![]).unwrap();
    let module = reg.module(DECODER_MODULE).unwrap();

    let ctx = DeviceContext::new();
    let handle = ctx.open(&module.def, None).unwrap();
    let mut decoder = Decoder::new(module, handle, XorDevice::default()).unwrap();

    decoder.enqueue_syndromes(1, &[true, false, true, true], 0).unwrap();
    decoder.enqueue_syndromes(1, &[false, false, true, false], 1).unwrap();
    decoder.enqueue_syndromes(2, &[true, true, true, true], 2).unwrap();

    assert_eq!(
        decoder.get_corrections(1, 4, true).unwrap(),
        vec![true, false, false, true]
    );
    assert_eq!(decoder.get_corrections(1, 4, false).unwrap(), vec![false; 4]);

    decoder.reset_decoder(2).unwrap();
    assert_eq!(decoder.get_corrections_array::<4>(2, false).unwrap(), [false; 4]);

    decoder.close();
    assert!(!ctx.is_live("cudaq-qec"));
}

#[test]
fn signature_examples() {
    let def = GpuModuleDef::new("DeviceHandle", "lib");
    let handle = FuncInput::new("handle", def.handle_type()).inout();

    let accept = FunctionDecl::new(
        "accept",
        FunctionType::new(
            vec![
                handle.clone(),
                FuncInput::new("decoder_id", Type::INT),
                FuncInput::new("x", Type::INT),
            ],
            Type::INT,
        ),
    );
    let missing = FunctionDecl::new(
        "missing",
        FunctionType::new(vec![FuncInput::new("decoder_id", Type::INT)], Type::INT),
    );
    let payload = FunctionDecl::new(
        "payload",
        FunctionType::new(
            vec![handle, FuncInput::new("payload", Type::Struct("SomeStruct".into()))],
            Type::None,
        ),
    );

    let mut reg = Registry::new();
    let module = ModuleDecl::new(def).function(accept);
    let err = reg.register(vec![module], vec![missing, payload]).unwrap_err();
    let RegistryError::Invalid(diags) = err else {
        panic!("expected diagnostics");
    };
    assert_eq!(diags.len(), 2);
    assert_eq!(
        diags[0].error,
        SignatureError::FirstArgNotModule { ty: Some(Type::INT) }
    );
    assert_eq!(
        diags[1].error,
        SignatureError::UnconvertibleType {
            ty: Type::Struct("SomeStruct".into())
        }
    );
    assert!(diags[1].to_string().contains("SomeStruct"));
    assert!(reg.modules().is_empty());
}

#[test]
fn hashed_ids_route_back_to_their_function() {
    let decl = decoder_module();
    let decl = ModuleDecl {
        functions: decl
            .functions
            .into_iter()
            .map(FunctionDecl::hashed_call_id)
            .collect(),
        ..decl
    };
    let mut reg = Registry::new();
    reg.register(vec![decl], vec![]).unwrap();

    for name in ["enqueue_syndromes_ui64", "get_corrections_ui64", "reset_decoder_ui64"] {
        let f = reg.by_call_id(call_id(name)).unwrap();
        assert_eq!(f.name, name);
    }
}
