//! Manifest checking and single-word codec commands.

use anyhow::{Context, Result, bail};
use gpuqec_common::call_id::call_id;
use gpuqec_core::BitPack;
use gpuqec_core::registry::{BoundFunction, Registry};
use gpuqec_io::load_manifest;
use tracing::info;

pub fn check_manifest(path: &str) -> Result<Registry> {
    let registry = load_manifest(path)?
        .into_registry()
        .with_context(|| format!("{path} does not register"))?;

    if registry.is_documentation() {
        println!("{path}: documentation mode, nothing registered");
        return Ok(registry);
    }

    for module in registry.modules() {
        println!("{}", module.def.const_value());
        print_function(&module.constructor);
        print_function(&module.discard);
        for f in &module.functions {
            print_function(f);
        }
    }
    for f in registry.functions() {
        print_function(f);
    }
    info!(
        modules = registry.modules().len(),
        functions = registry.functions().len(),
        "manifest ok"
    );
    Ok(registry)
}

fn print_function(f: &BoundFunction) {
    let id = f
        .call_id
        .map_or_else(|| "-".to_string(), |id| format!("{id:#010x}"));
    println!("  {:<28} {:>10}  {}", f.name, id, f.ty);
}

pub fn print_call_ids(names: &[String]) {
    for name in names {
        let id = call_id(name);
        println!("{name}\t{id}\t{id:#010x}");
    }
}

pub fn parse_bits(text: &str) -> Result<Vec<bool>> {
    text.chars()
        .filter(|c| *c != '_')
        .map(|c| match c {
            '0' => Ok(false),
            '1' => Ok(true),
            other => bail!("expected 0 or 1, found {other:?}"),
        })
        .collect()
}

pub fn parse_word(text: &str) -> Result<u64> {
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => text.parse(),
    };
    parsed.with_context(|| format!("invalid word {text:?}"))
}

pub fn render_bits(bits: &[bool]) -> String {
    bits.iter().map(|&b| if b { '1' } else { '0' }).collect()
}

pub fn pack(text: &str) -> Result<u64> {
    let bits = parse_bits(text)?;
    let word = BitPack::pack(&bits)?;
    println!("{word}\t{word:#018x}");
    Ok(word)
}

pub fn unpack(word: &str, size: usize) -> Result<String> {
    let bits = BitPack::unpack(parse_word(word)?, size)?;
    let rendered = render_bits(&bits);
    println!("{rendered}");
    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bit_strings() {
        assert_eq!(parse_bits("1_01").unwrap(), vec![true, false, true]);
        assert!(parse_bits("102").is_err());
        assert_eq!(render_bits(&[false, true, true]), "011");
    }

    #[test]
    fn words_accept_hex() {
        assert_eq!(parse_word("0x1F").unwrap(), 31);
        assert_eq!(parse_word("31").unwrap(), 31);
        assert!(parse_word("-1").is_err());
    }

    #[test]
    fn pack_and_unpack_commands() {
        assert_eq!(pack("1011").unwrap(), 11);
        assert_eq!(unpack("11", 4).unwrap(), "1011");
        assert_eq!(unpack("0x4", 3).unwrap(), "100");
        assert!(pack(&"1".repeat(65)).is_err());
        assert!(unpack("1", 65).is_err());
    }

    #[test]
    fn check_reports_registered_and_rejected_manifests() {
        let tmp = tempfile::TempDir::new().unwrap();
        let good = tmp.path().join("good.toml");
        std::fs::write(
            &good,
            "[[module]]\nname = \"Decoder\"\nfile = \"cudaq-qec\"\n\n\
             [[module.function]]\nname = \"reset_decoder_ui64\"\n\
             signature = \"(self: Decoder @inout, decoder_id: int)\"\ncall_id = \"hash\"\n",
        )
        .unwrap();
        let registry = check_manifest(good.to_str().unwrap()).unwrap();
        assert!(registry.function("Decoder", "reset_decoder_ui64").is_some());

        let bad = tmp.path().join("bad.toml");
        std::fs::write(&bad, "[[function]]\nname = \"f\"\nsignature = \"(x: int) -> int\"\n")
            .unwrap();
        let err = check_manifest(bad.to_str().unwrap()).unwrap_err();
        assert!(format!("{err:#}").contains("error in `f`"));
    }
}
