//! Random syndrome data for the `encode` command.
//!
//! Each detector fires independently with probability `p`. Shots are written
//! in .b8 layout so they can be read back exactly like measured data.

use anyhow::{Result, ensure};
use gpuqec_core::BitPack;
use gpuqec_io::loader;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

pub fn generate_syndromes(
    b8_path: &str,
    size: usize,
    num_shots: usize,
    p: f64,
    seed: Option<u64>,
) -> Result<Vec<Vec<bool>>> {
    BitPack::check_width(size)?;
    ensure!((0.0..=1.0).contains(&p), "p must lie in [0, 1], got {p}");

    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    println!("Generating {} shots of {} detectors (p={})...", num_shots, size, p);
    let shots: Vec<Vec<bool>> = (0..num_shots)
        .map(|_| (0..size).map(|_| rng.gen_bool(p)).collect())
        .collect();

    loader::write_b8_file(b8_path, &shots)?;
    info!(path = b8_path, shots = num_shots, size, "wrote syndrome shots");
    println!("Done.");
    Ok(shots)
}
