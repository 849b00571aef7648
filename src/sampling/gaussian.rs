use rand::Rng;

/// Cumulative table for a discrete Gaussian over `[-tail, tail]`,
/// `tail = ceil(6σ)`.
struct CdtTable {
    tail: i64,
    cdf: Vec<f64>,
}

impl CdtTable {
    fn new(sigma: f64) -> Self {
        let tail = (6.0 * sigma).ceil() as i64;
        let two_sigma_sq = 2.0 * sigma * sigma;
        let mut cumulative = 0.0f64;
        let cdf = (-tail..=tail)
            .map(|x| {
                cumulative += (-((x * x) as f64) / two_sigma_sq).exp();
                cumulative
            })
            .collect();
        Self { tail, cdf }
    }

    /// Scans the whole table and selects with integer masks, so the
    /// running time does not depend on the sample.
    fn sample<R: Rng>(&self, rng: &mut R) -> i64 {
        let total = self.cdf.last().copied().unwrap_or(1.0);
        let u: f64 = rng.random::<f64>() * total;

        let mut result = self.tail;
        for (i, &c) in self.cdf.iter().enumerate().rev() {
            let mask = ((u < c) as i64).wrapping_neg();
            let candidate = -self.tail + i as i64;
            result = (candidate & mask) | (result & !mask);
        }
        result
    }
}

/// `n` independent discrete Gaussian samples with standard deviation `sigma`.
pub fn sample_gaussian_coeffs<R: Rng>(n: usize, sigma: f64, rng: &mut R) -> Vec<i64> {
    let table = CdtTable::new(sigma);
    (0..n).map(|_| table.sample(rng)).collect()
}
