//! Wire contract shared between the binding layer and the external GPU decoder.
//!
//! This crate holds everything both sides of the call boundary must agree on
//! bit-for-bit: the width ceiling of a packed transport word, the names of the
//! extension and opaque types the compiler front end lowers module handles to,
//! the table of native decoder operations, and the derivation of the 32-bit
//! call identifiers the native dispatch table is keyed by.

#![cfg_attr(not(test), no_std)]

/// Transport word layout and extension identity.
///
/// Packed syndrome and correction words travel as a single unsigned 64-bit
/// integer. These constants must match the native decoder library; changing
/// any of them breaks wire compatibility.
pub mod wire {
    /// Maximum number of bits carried by one packed transport word.
    ///
    /// Both packing and unpacking reject widths above this ceiling. The
    /// limit is the native word width of the decoder's `ui64` entry points.
    pub const MAX_PACKED_BITS: usize = 64;

    /// Name of the compiler extension that owns the GPU module types.
    pub const EXTENSION_NAME: &str = "tket.gpu";

    /// Opaque type of a constant module reference (file + optional config).
    ///
    /// A module declaration lowers to a constant of this type, which the
    /// runtime uses to locate and load the native library.
    pub const MODULE_TYPE: &str = "module";

    /// Opaque type of a live device context.
    ///
    /// Every handle to a declared module lowers to this type, regardless of
    /// which module it was created from.
    pub const CONTEXT_TYPE: &str = "context";

    /// Name of the constant value that wraps a module reference.
    pub const CONST_MODULE_VALUE: &str = "ConstGpuModule";

    /// Symbol of the synthesised module constructor.
    pub const CONSTRUCTOR_SYMBOL: &str = "__new__";

    /// Symbol of the synthesised module teardown.
    pub const DISCARD_SYMBOL: &str = "discard";
}

/// Native operations exported by the GPU decoder library.
///
/// The decoder multiplexes several logical decoder instances inside a single
/// device context. Each operation addresses one of them through a numeric
/// decoder id passed as the first argument after the context handle.
pub mod ops {
    /// Operation code for a native decoder entry point.
    #[repr(u8)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub enum DeviceOp {
        /// Enqueue a packed syndrome for decoding.
        ///
        /// Arguments: decoder id, syndrome width in bits (at most 64), the
        /// packed syndrome word, and a tag used only for logging on the
        /// device side.
        EnqueueSyndromes = 0x01,

        /// Read back the accumulated corrections of one decoder.
        ///
        /// Arguments: decoder id, requested width in bits (at most 64), and a
        /// flag that clears the corrections after they are read. Returns the
        /// packed correction word.
        GetCorrections = 0x02,

        /// Clear queued syndromes and reset corrections to zero.
        ResetDecoder = 0x03,
    }

    impl DeviceOp {
        /// All operations in dispatch order.
        pub const ALL: [DeviceOp; 3] = [
            DeviceOp::EnqueueSyndromes,
            DeviceOp::GetCorrections,
            DeviceOp::ResetDecoder,
        ];

        /// Symbol the native library exports for this operation.
        pub const fn symbol(self) -> &'static str {
            match self {
                DeviceOp::EnqueueSyndromes => "enqueue_syndromes_ui64",
                DeviceOp::GetCorrections => "get_corrections_ui64",
                DeviceOp::ResetDecoder => "reset_decoder_ui64",
            }
        }

        /// Looks an operation up by its exported symbol.
        pub fn from_symbol(symbol: &str) -> Option<Self> {
            Self::ALL.into_iter().find(|op| op.symbol() == symbol)
        }

        /// Number of numeric arguments following the context handle.
        pub const fn arity(self) -> usize {
            match self {
                DeviceOp::EnqueueSyndromes => 4,
                DeviceOp::GetCorrections => 3,
                DeviceOp::ResetDecoder => 1,
            }
        }

        /// Whether the operation returns a packed word.
        pub const fn returns_word(self) -> bool {
            matches!(self, DeviceOp::GetCorrections)
        }
    }
}

/// Stable call identifiers for native dispatch.
///
/// A call id lets the runtime route a call to its native entry point without
/// depending on textual name mangling. The id is the first four bytes of the
/// BLAKE3 digest of the function name, read little-endian.
pub mod call_id {
    /// 32-bit identifier keyed into the native dispatch table.
    pub type CallId = u32;

    /// Derives the call id of a function from its declared name.
    ///
    /// Pure function of the UTF-8 bytes of `name`; identical across runs,
    /// platforms and implementations using the same hash primitive.
    pub fn call_id(name: &str) -> CallId {
        let digest = blake3::hash(name.as_bytes());
        let bytes = digest.as_bytes();
        u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
    }
}

#[cfg(test)]
mod tests {
    use super::call_id::call_id;
    use super::ops::DeviceOp;

    #[test]
    fn call_id_is_deterministic() {
        let a = call_id("reset_decoder_ui64");
        let b = call_id("reset_decoder_ui64");
        assert_eq!(a, b);
    }

    #[test]
    fn call_id_reads_digest_prefix_little_endian() {
        let digest = blake3::hash(b"reset_decoder_ui64");
        let d = digest.as_bytes();
        let expected =
            d[0] as u32 | (d[1] as u32) << 8 | (d[2] as u32) << 16 | (d[3] as u32) << 24;
        assert_eq!(call_id("reset_decoder_ui64"), expected);
    }

    #[test]
    fn call_ids_differ_between_operations() {
        let ids: Vec<u32> = DeviceOp::ALL.iter().map(|op| call_id(op.symbol())).collect();
        assert_ne!(ids[0], ids[1]);
        assert_ne!(ids[1], ids[2]);
        assert_ne!(ids[0], ids[2]);
    }

    #[test]
    fn symbols_round_trip() {
        for op in DeviceOp::ALL {
            assert_eq!(DeviceOp::from_symbol(op.symbol()), Some(op));
        }
        assert_eq!(DeviceOp::from_symbol("enqueue_syndromes"), None);
    }

    #[test]
    fn only_get_corrections_returns_a_word() {
        assert!(DeviceOp::GetCorrections.returns_word());
        assert!(!DeviceOp::EnqueueSyndromes.returns_word());
        assert!(!DeviceOp::ResetDecoder.returns_word());
        assert_eq!(DeviceOp::EnqueueSyndromes.arity(), 4);
    }
}
