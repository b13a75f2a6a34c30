use crate::stats::LatencyStats;
use anyhow::Result;
use gpuqec_core::BitPack;
use gpuqec_io::loader;
use rayon::prelude::*;
use std::time::Instant;
use tracing::info;

/// Packs every shot of a .b8 file into transport words.
pub fn run_encode(b8_path: &str, size: usize, print_words: bool) -> Result<Vec<u64>> {
    BitPack::check_width(size)?;

    println!("Loading Shots from {}...", b8_path);
    let raw_bits = loader::load_b8_file(b8_path)?;
    let shots = loader::slice_shots(&raw_bits, size);
    println!("Loaded {} shots of {} bits.", shots.len(), size);

    let start = Instant::now();
    let (words, stats) = shots
        .par_iter()
        .map(|shot| {
            let t = Instant::now();
            let word = BitPack::pack(shot);
            (word, t.elapsed().as_nanos() as u64)
        })
        .fold(
            || (Vec::new(), LatencyStats::new()),
            |(mut words, mut stats), (word, nanos)| {
                words.push(word);
                stats.update(nanos);
                (words, stats)
            },
        )
        .reduce(
            || (Vec::new(), LatencyStats::new()),
            |(mut a, sa), (b, sb)| {
                a.extend(b);
                (a, sa.merge(sb))
            },
        );
    let words = words.into_iter().collect::<Result<Vec<u64>, _>>()?;
    let seconds = start.elapsed().as_secs_f64();

    if print_words {
        for word in &words {
            println!("{word:#018x}");
        }
    }

    println!("Results");
    println!("Time: {:.4} s", seconds);
    if seconds > 0.0 {
        println!("Throughput: {:.2} shots/s", words.len() as f64 / seconds);
    }
    stats.print_report();
    info!(shots = words.len(), size, "encoded shots");

    Ok(words)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::generate_syndromes;
    use tempfile::TempDir;

    #[test]
    fn encodes_generated_shots() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("shots.b8");
        let path = path.to_str().unwrap();

        let shots = generate_syndromes(path, 21, 200, 0.1, Some(7)).unwrap();
        let words = run_encode(path, 21, false).unwrap();

        assert_eq!(words.len(), 200);
        for (shot, word) in shots.iter().zip(&words) {
            assert_eq!(*word, BitPack::pack(shot).unwrap());
            assert!(*word <= BitPack::mask(21));
        }
    }

    #[test]
    fn seeded_generation_is_reproducible() {
        let tmp = TempDir::new().unwrap();
        let a = tmp.path().join("a.b8");
        let b = tmp.path().join("b.b8");
        let first = generate_syndromes(a.to_str().unwrap(), 8, 50, 0.5, Some(1)).unwrap();
        let second = generate_syndromes(b.to_str().unwrap(), 8, 50, 0.5, Some(1)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn rejects_wide_shots() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("wide.b8");
        assert!(generate_syndromes(path.to_str().unwrap(), 65, 1, 0.1, None).is_err());
        assert!(run_encode(path.to_str().unwrap(), 65, false).is_err());
    }
}
