//! Per-shot packing latency statistics.

const BUCKETS: usize = 20;
const BUCKET_NS: u64 = 10;

/// Accumulates packing latencies in nanoseconds.
///
/// Keeps min, max and mean plus a histogram of 10 ns buckets, the last
/// bucket collecting everything slower.
#[derive(Debug, Clone)]
pub struct LatencyStats {
    pub min: u64,
    pub max: u64,
    pub sum: u64,
    pub count: u64,
    pub buckets: [u64; BUCKETS],
}

impl Default for LatencyStats {
    fn default() -> Self {
        Self {
            min: u64::MAX,
            max: 0,
            sum: 0,
            count: 0,
            buckets: [0; BUCKETS],
        }
    }
}

impl LatencyStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, nanos: u64) {
        self.min = self.min.min(nanos);
        self.max = self.max.max(nanos);
        self.sum += nanos;
        self.count += 1;

        let idx = (nanos / BUCKET_NS).min(BUCKETS as u64 - 1) as usize;
        self.buckets[idx] += 1;
    }

    /// Folds another worker's statistics into this one.
    pub fn merge(mut self, other: Self) -> Self {
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
        self.sum += other.sum;
        self.count += other.count;
        for (a, b) in self.buckets.iter_mut().zip(other.buckets) {
            *a += b;
        }
        self
    }

    pub fn avg(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum as f64 / self.count as f64
        }
    }

    pub fn print_report(&self) {
        println!("\nPacking Latency");
        println!("Count: {}", self.count);
        if self.count == 0 {
            return;
        }
        println!("Min:   {} ns", self.min);
        println!("Avg:   {:.2} ns", self.avg());
        println!("Max:   {} ns", self.max);

        println!("Distribution ({BUCKET_NS}ns buckets):");
        for (i, &count) in self.buckets.iter().enumerate() {
            if count > 0 {
                let open = if i == BUCKETS - 1 { ">" } else { "" };
                let lower = i as u64 * BUCKET_NS;
                let upper = lower + BUCKET_NS;
                println!("[{lower:3}-{upper:3}{open} ns]: {count}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_extremes_and_buckets() {
        let mut stats = LatencyStats::new();
        for n in [5, 15, 1_000] {
            stats.update(n);
        }
        assert_eq!(stats.min, 5);
        assert_eq!(stats.max, 1_000);
        assert_eq!(stats.buckets[0], 1);
        assert_eq!(stats.buckets[1], 1);
        assert_eq!(stats.buckets[BUCKETS - 1], 1);
        assert!((stats.avg() - 340.0).abs() < 1e-9);
    }

    #[test]
    fn merge_combines_workers() {
        let mut a = LatencyStats::new();
        a.update(30);
        let mut b = LatencyStats::new();
        b.update(2);
        b.update(4);
        let all = a.merge(b).merge(LatencyStats::new());
        assert_eq!(all.count, 3);
        assert_eq!(all.min, 2);
        assert_eq!(all.max, 30);
        assert_eq!(all.buckets[0], 2);
    }
}
