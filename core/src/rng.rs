//! Deterministic random number generation for the outlier model.
//!
//! RULE: The model never calls a platform RNG.
//! All randomness flows through ModelRng instances derived
//! from the single master seed in AnomalyConfig.
//!
//! Each tree gets its own stream, seeded from
//! (master_seed XOR stream_index * golden ratio). This means:
//!   - Growing the forest never changes existing trees.
//!   - Each tree is fully reproducible in isolation.

use rand::SeedableRng;
use rand_pcg::Pcg64Mcg;

/// A deterministic RNG stream for a single tree.
pub struct ModelRng {
    inner: Pcg64Mcg,
}

impl ModelRng {
    /// Create a stream from the master seed and a stable index.
    pub fn new(master_seed: u64, stream_index: u64) -> Self {
        let derived_seed = master_seed ^ (stream_index.wrapping_mul(0x9e37_79b9_7f4a_7c15));
        Self {
            inner: Pcg64Mcg::seed_from_u64(derived_seed),
        }
    }

    /// Roll a float in [0.0, 1.0).
    pub fn next_f64(&mut self) -> f64 {
        use rand::RngCore;
        let bits = self.inner.next_u64();
        (bits >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Roll a usize in [0, n).
    pub fn next_below(&mut self, n: usize) -> usize {
        use rand::RngCore;
        assert!(n > 0, "n must be > 0");
        (self.inner.next_u64() % n as u64) as usize
    }

    /// Uniform float in [lo, hi).
    pub fn uniform(&mut self, lo: f64, hi: f64) -> f64 {
        lo + (hi - lo) * self.next_f64()
    }

    /// Draw `k` distinct indices from 0..n (partial Fisher-Yates).
    /// Returns all of 0..n, shuffled, when k >= n.
    pub fn sample_indices(&mut self, n: usize, k: usize) -> Vec<usize> {
        let mut pool: Vec<usize> = (0..n).collect();
        let k = k.min(n);
        for i in 0..k {
            let j = i + self.next_below(n - i);
            pool.swap(i, j);
        }
        pool.truncate(k);
        pool
    }
}
