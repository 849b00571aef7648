use std::sync::Arc;
use concrete_ntt::prime64::Plan;

use crate::error::{ControlError, Result};
use crate::ring::modular::{barrett_constant, mod_add, mod_mul, mod_neg, mod_sub};
use crate::ring::poly::CoeffPoly;

/// Polynomial over `Z_q[X]/(X^n + 1)` in evaluation (NTT) form.
///
/// Transforms go through `concrete-ntt`, which picks AVX2/AVX-512/NEON
/// kernels at runtime.
#[derive(Clone, Debug)]
pub struct NttPoly {
    pub evals: Vec<u64>,
    pub modulus: u64,
    pub plan: Arc<Plan>,
}

/// Build an NTT plan. `concrete-ntt` needs `n >= 16`, `q` prime and
/// `q ≡ 1 (mod 2n)`.
pub fn make_plan(n: usize, modulus: u64) -> Result<Arc<Plan>> {
    if !n.is_power_of_two() || n < 16 {
        return Err(ControlError::InvalidRingDegree(n));
    }
    let plan = Plan::try_new(n, modulus).ok_or_else(|| {
        ControlError::InvalidParameters(format!(
            "no NTT plan for n={n}, q={modulus} (need prime q ≡ 1 mod {})",
            2 * n
        ))
    })?;
    Ok(Arc::new(plan))
}

impl NttPoly {
    pub fn zero(n: usize, modulus: u64, plan: Arc<Plan>) -> Self {
        Self { evals: vec![0u64; n], modulus, plan }
    }

    /// Forward transform of a coefficient polynomial.
    pub fn from_coeff_poly(poly: &CoeffPoly, plan: Arc<Plan>) -> Result<Self> {
        if poly.modulus != plan.modulus() {
            return Err(ControlError::ModulusMismatch);
        }
        let mut evals = poly.coeffs.clone();
        plan.fwd(&mut evals);
        Ok(Self { evals, modulus: poly.modulus, plan })
    }

    /// Inverse transform. `normalize` applies the 1/n factor that pointwise
    /// products leave behind.
    pub fn to_coeff_poly(&self) -> CoeffPoly {
        let mut coeffs = self.evals.clone();
        self.plan.inv(&mut coeffs);
        self.plan.normalize(&mut coeffs);
        CoeffPoly { coeffs, modulus: self.modulus }
    }

    pub fn len(&self) -> usize {
        self.evals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.evals.is_empty()
    }

    fn check_compatible(&self, other: &Self) -> Result<()> {
        if self.len() != other.len() || self.modulus != other.modulus {
            return Err(ControlError::ModulusMismatch);
        }
        Ok(())
    }

    pub fn add(&self, other: &Self) -> Result<Self> {
        self.check_compatible(other)?;
        let q = self.modulus;
        let evals = self.evals.iter().zip(&other.evals).map(|(&a, &b)| mod_add(a, b, q)).collect();
        Ok(Self { evals, modulus: q, plan: self.plan.clone() })
    }

    pub fn sub(&self, other: &Self) -> Result<Self> {
        self.check_compatible(other)?;
        let q = self.modulus;
        let evals = self.evals.iter().zip(&other.evals).map(|(&a, &b)| mod_sub(a, b, q)).collect();
        Ok(Self { evals, modulus: q, plan: self.plan.clone() })
    }

    pub fn neg(&self) -> Self {
        let q = self.modulus;
        let evals = self.evals.iter().map(|&a| mod_neg(a, q)).collect();
        Self { evals, modulus: q, plan: self.plan.clone() }
    }

    /// Pointwise product, i.e. negacyclic polynomial multiplication.
    pub fn mul(&self, other: &Self) -> Result<Self> {
        self.check_compatible(other)?;
        let q = self.modulus;
        let bk = barrett_constant(q);
        let evals = self.evals.iter()
            .zip(&other.evals)
            .map(|(&a, &b)| mod_mul(a, b, q, bk))
            .collect();
        Ok(Self { evals, modulus: q, plan: self.plan.clone() })
    }

    pub fn scalar_mul(&self, scalar: u64) -> Self {
        let q = self.modulus;
        let s = scalar % q;
        let bk = barrett_constant(q);
        let evals = self.evals.iter().map(|&a| mod_mul(a, s, q, bk)).collect();
        Self { evals, modulus: q, plan: self.plan.clone() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const N: usize = 16;
    const Q: u64 = 65537;

    fn padded(v: &[u64]) -> Vec<u64> {
        let mut r = vec![0u64; N];
        r[..v.len()].copy_from_slice(v);
        r
    }

    #[test]
    fn test_ntt_roundtrip() {
        let plan = make_plan(N, Q).unwrap();
        let original = CoeffPoly::from_coeffs(padded(&[1, 2, 3, 4, 5, 6, 7, 8]), Q);
        let ntt = NttPoly::from_coeff_poly(&original, plan).unwrap();
        assert_eq!(ntt.to_coeff_poly().coeffs, original.coeffs);
    }

    #[test]
    fn test_ntt_mul_matches_naive() {
        let plan = make_plan(N, Q).unwrap();
        let a = CoeffPoly::from_coeffs(padded(&[3, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 9]), Q);
        let b = CoeffPoly::from_coeffs(padded(&[1, 1, 2]), Q);
        let expected = a.mul_naive(&b).unwrap();

        let a_ntt = NttPoly::from_coeff_poly(&a, plan.clone()).unwrap();
        let b_ntt = NttPoly::from_coeff_poly(&b, plan).unwrap();
        assert_eq!(a_ntt.mul(&b_ntt).unwrap().to_coeff_poly().coeffs, expected.coeffs);
    }

    #[test]
    fn test_ntt_add_sub() {
        let plan = make_plan(N, Q).unwrap();
        let a = CoeffPoly::from_coeffs(padded(&[1, 2, 3]), Q);
        let b = CoeffPoly::from_coeffs(padded(&[4, 5, 6]), Q);
        let a_ntt = NttPoly::from_coeff_poly(&a, plan.clone()).unwrap();
        let b_ntt = NttPoly::from_coeff_poly(&b, plan).unwrap();

        assert_eq!(a_ntt.add(&b_ntt).unwrap().to_coeff_poly().coeffs, a.add(&b).unwrap().coeffs);
        assert_eq!(a_ntt.sub(&b_ntt).unwrap().to_coeff_poly().coeffs, a.sub(&b).unwrap().coeffs);
    }

    #[test]
    fn test_rejects_small_or_odd_degree() {
        assert!(matches!(make_plan(8, Q), Err(ControlError::InvalidRingDegree(8))));
        assert!(matches!(make_plan(24, Q), Err(ControlError::InvalidRingDegree(24))));
        // 65539 is prime but not ≡ 1 mod 32
        assert!(matches!(make_plan(N, 65539), Err(ControlError::InvalidParameters(_))));
    }
}
