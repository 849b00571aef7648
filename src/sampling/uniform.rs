use rand::Rng;

use crate::ring::ntt::NttPoly;
use crate::ring::rns::{RnsBasis, RnsPoly};

/// Uniform value in `[0, modulus)` by masked rejection sampling.
fn uniform_below<R: Rng>(modulus: u64, rng: &mut R) -> u64 {
    let mask = if modulus.is_power_of_two() {
        modulus - 1
    } else {
        u64::MAX >> modulus.leading_zeros()
    };
    loop {
        let v = rng.random::<u64>() & mask;
        if v < modulus {
            return v;
        }
    }
}

/// Uniform element of `R_Q`.
///
/// Independent uniform residues are uniform modulo `Q` by CRT, and the NTT
/// is a bijection, so evaluations are sampled directly.
pub fn sample_uniform_rns<R: Rng>(basis: &RnsBasis, rng: &mut R) -> RnsPoly {
    let components = basis.moduli.iter()
        .zip(&basis.plans)
        .map(|(&q, plan)| NttPoly {
            evals: (0..basis.ring_degree).map(|_| uniform_below(q, rng)).collect(),
            modulus: q,
            plan: plan.clone(),
        })
        .collect();
    RnsPoly { components, ring_degree: basis.ring_degree }
}

/// Coefficients uniform over `{-1, 0, 1}`.
pub fn sample_ternary_coeffs<R: Rng>(n: usize, rng: &mut R) -> Vec<i64> {
    (0..n)
        .map(|_| loop {
            let r = rng.random::<u8>() & 0x03;
            if r < 3 {
                break r as i64 - 1;
            }
        })
        .collect()
}

/// Coefficients uniform over `{0, 1}`.
pub fn sample_binary_coeffs<R: Rng>(n: usize, rng: &mut R) -> Vec<i64> {
    (0..n).map(|_| (rng.random::<u8>() & 1) as i64).collect()
}
