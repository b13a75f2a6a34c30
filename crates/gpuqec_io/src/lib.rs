//! File formats around the GPU decoder binding layer.
//!
//! Reads binding manifests (TOML declarations of modules and their device
//! functions), parses the textual signatures they contain, and loads syndrome
//! shot data (.b8 files) for packing into decoder transport words.

/// Syndrome shot files.
///
/// Reads and writes Stim .b8 data, slices it into per-shot bit vectors and
/// packs each shot into the word the decoder's enqueue entry point takes.
pub mod loader;

/// Binding manifests in TOML.
///
/// Deserializes module and function declarations, attaches manifest source
/// locations, and hands them to a registry.
pub mod manifest;

/// Parser for function signatures such as
/// `(self: Decoder @inout, decoder_id: int) -> None`.
pub mod parser;

pub use manifest::{Manifest, load_manifest, parse_manifest};
pub use parser::{SignatureParseError, parse_signature, parse_type};
