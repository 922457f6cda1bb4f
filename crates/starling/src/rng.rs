//! Seeded pseudo-random numbers.
//!
//! Every layout owns its own generator so two runs over the same graph with the same seed
//! produce the same motion.

#[derive(Debug, Clone)]
pub struct XorShift64Star {
    state: u64,
}

impl XorShift64Star {
    pub fn new(seed: u64) -> Self {
        Self { state: seed.max(1) }
    }

    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545F4914F6CDD1D_u64)
    }

    /// Uniform in `[0, 1)` with 53 bits of precision.
    pub fn next_f64_unit(&mut self) -> f64 {
        let u = self.next_u64() >> 11;
        (u as f64) / ((1u64 << 53) as f64)
    }

    /// Uniform in `[-1, 1)`.
    pub fn next_f64_signed(&mut self) -> f64 {
        self.next_f64_unit() * 2.0 - 1.0
    }

    /// Uniform in `[-half_extent, half_extent)`.
    pub fn next_offset(&mut self, half_extent: f64) -> f64 {
        self.next_f64_signed() * half_extent
    }

    /// Standard normal sample (Marsaglia polar method).
    pub fn gaussian(&mut self) -> f64 {
        loop {
            let x = self.next_f64_signed();
            let y = self.next_f64_signed();
            let r = x * x + y * y;
            if r < 1.0 && r != 0.0 {
                return x * (-2.0 * r.ln() / r).sqrt();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::XorShift64Star;

    // The link scheduler draws one duration per link from seed 42; changing the generator
    // reorders every edge animation.
    #[test]
    fn link_durations_for_default_seed_are_stable() {
        let mut rng = XorShift64Star::new(42);
        let durations: Vec<u32> = (0..8)
            .map(|_| (rng.gaussian() * 10.0).abs().round() as u32 + 1)
            .collect();
        assert_eq!(durations, vec![8, 6, 15, 13, 10, 3, 8, 12]);

        let mut rng = XorShift64Star::new(42);
        let units = [rng.next_f64_unit(), rng.next_f64_unit(), rng.next_f64_unit()];
        assert_eq!(
            units,
            [0.33908526400192196, 0.7822558479199243, 0.7901370452687786]
        );
    }

    #[test]
    fn zero_seed_is_not_degenerate() {
        let mut rng = XorShift64Star::new(0);
        assert_ne!(rng.next_u64(), 0);
    }

    #[test]
    fn gaussian_has_unit_spread() {
        let mut rng = XorShift64Star::new(42);
        let n = 20_000;
        let samples: Vec<f64> = (0..n).map(|_| rng.gaussian()).collect();
        let mean = samples.iter().sum::<f64>() / n as f64;
        let var = samples.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n as f64;
        assert!(mean.abs() < 0.05, "mean: {mean}");
        assert!((var - 1.0).abs() < 0.1, "variance: {var}");
    }

    #[test]
    fn same_seed_same_gaussians() {
        let mut a = XorShift64Star::new(42);
        let mut b = XorShift64Star::new(42);
        for _ in 0..100 {
            assert_eq!(a.gaussian().to_bits(), b.gaussian().to_bits());
        }
    }
}
