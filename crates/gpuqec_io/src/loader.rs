use anyhow::{Context, Result, bail};
use bitvec::prelude::*;
use gpuqec_core::BitPack;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tracing::debug;

/// Loads a Stim .b8 file (binary measurement data).
pub fn load_b8_file<P: AsRef<Path>>(path: P) -> Result<BitVec<u8, Lsb0>> {
    let path = path.as_ref();
    let mut file = File::open(path)
        .with_context(|| format!("Failed to open .b8 file {}", path.display()))?;
    let mut buffer = Vec::new();
    file.read_to_end(&mut buffer)?;
    debug!(path = %path.display(), bytes = buffer.len(), "loaded .b8 file");

    // Stim packs each shot little endian within a byte
    Ok(BitVec::<u8, Lsb0>::from_vec(buffer))
}

/// Writes shots in .b8 layout, each padded to a whole byte.
pub fn write_b8_file<P: AsRef<Path>>(path: P, shots: &[Vec<bool>]) -> Result<()> {
    let path = path.as_ref();
    let mut bits = BitVec::<u8, Lsb0>::new();
    for shot in shots {
        bits.extend(shot.iter().copied());
        let pad = shot.len().div_ceil(8) * 8 - shot.len();
        bits.extend(core::iter::repeat_n(false, pad));
    }
    let mut file = File::create(path)
        .with_context(|| format!("Failed to create .b8 file {}", path.display()))?;
    file.write_all(bits.as_raw_slice())?;
    Ok(())
}

pub fn slice_shots(raw_bits: &BitVec<u8, Lsb0>, bits_per_shot: usize) -> Vec<Vec<bool>> {
    if bits_per_shot == 0 {
        return Vec::new();
    }
    let stride_bits = bits_per_shot.div_ceil(8) * 8;

    raw_bits
        .chunks_exact(stride_bits)
        .map(|shot| shot[..bits_per_shot].iter().by_vals().collect())
        .collect()
}

/// Packs every shot into one transport word.
pub fn pack_shots(raw_bits: &BitVec<u8, Lsb0>, bits_per_shot: usize) -> Result<Vec<u64>> {
    if bits_per_shot == 0 {
        bail!("shot size must be at least one bit");
    }
    BitPack::check_width(bits_per_shot)?;
    slice_shots(raw_bits, bits_per_shot)
        .iter()
        .enumerate()
        .map(|(i, shot)| BitPack::pack(shot).with_context(|| format!("shot {i}")))
        .collect()
}
