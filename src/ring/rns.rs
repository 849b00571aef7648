use std::sync::Arc;
use concrete_ntt::prime64::Plan;
use num_bigint::{BigInt, BigUint, Sign};
use num_traits::{One, Signed, ToPrimitive, Zero};

use crate::error::{ControlError, Result};
use crate::ring::modular::{barrett_constant, lift_signed, mod_inv};
use crate::ring::ntt::{make_plan, NttPoly};
use crate::ring::poly::CoeffPoly;

/// A set of pairwise-coprime NTT primes with their plans and the CRT data
/// needed to reconstruct integers modulo `Q = ∏ q_i`.
#[derive(Clone, Debug)]
pub struct RnsBasis {
    pub moduli: Vec<u64>,
    pub plans: Vec<Arc<Plan>>,
    pub ring_degree: usize,
    pub barrett_ks: Vec<u64>,
    /// `Q`.
    pub product: BigUint,
    /// `(Q/q_i) · ((Q/q_i)^{-1} mod q_i)`.
    crt_terms: Vec<BigUint>,
}

impl RnsBasis {
    pub fn new(moduli: Vec<u64>, ring_degree: usize) -> Result<Self> {
        if moduli.is_empty() {
            return Err(ControlError::InvalidParameters("empty RNS basis".into()));
        }
        let plans = moduli.iter()
            .map(|&q| make_plan(ring_degree, q))
            .collect::<Result<Vec<_>>>()?;
        let barrett_ks = moduli.iter().map(|&q| barrett_constant(q)).collect();

        let product = moduli.iter().fold(BigUint::one(), |acc, &q| acc * q);
        let crt_terms = moduli.iter()
            .map(|&qi| {
                let q_star = &product / qi;
                let q_star_mod_qi = (&q_star % qi).to_u64().unwrap_or(0);
                let inv = mod_inv(q_star_mod_qi, qi).ok_or_else(|| {
                    ControlError::InvalidParameters(format!("RNS modulus {qi} is not coprime to the rest"))
                })?;
                Ok(q_star * inv)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { moduli, plans, ring_degree, barrett_ks, product, crt_terms })
    }

    pub fn num_moduli(&self) -> usize {
        self.moduli.len()
    }

    /// `floor(log2 Q) + 1`.
    pub fn bit_count(&self) -> u64 {
        self.product.bits()
    }

    /// CRT-combine one residue per prime into `[0, Q)`.
    pub fn reconstruct<I>(&self, residues: I) -> BigUint
    where
        I: IntoIterator<Item = u64>,
    {
        let acc = residues.into_iter()
            .zip(&self.crt_terms)
            .fold(BigUint::zero(), |acc, (r, term)| acc + term * r);
        acc % &self.product
    }

    /// Map `[0, Q)` onto `(-Q/2, Q/2]`.
    pub fn center(&self, x: BigUint) -> BigInt {
        if x > (&self.product >> 1) {
            BigInt::from_biguint(Sign::Plus, x) - BigInt::from(self.product.clone())
        } else {
            BigInt::from_biguint(Sign::Plus, x)
        }
    }
}

/// Polynomial over `Z_Q[X]/(X^n + 1)` stored as one NTT-form residue per
/// basis prime.
#[derive(Clone, Debug)]
pub struct RnsPoly {
    pub components: Vec<NttPoly>,
    pub ring_degree: usize,
}

impl RnsPoly {
    pub fn zero(basis: &RnsBasis) -> Self {
        let components = basis.moduli.iter()
            .zip(&basis.plans)
            .map(|(&q, plan)| NttPoly::zero(basis.ring_degree, q, plan.clone()))
            .collect();
        Self { components, ring_degree: basis.ring_degree }
    }

    /// Reduce non-negative coefficients modulo each prime.
    pub fn from_coeff_poly(poly: &CoeffPoly, basis: &RnsBasis) -> Result<Self> {
        if poly.len() != basis.ring_degree {
            return Err(ControlError::DimensionMismatch { expected: basis.ring_degree, got: poly.len() });
        }
        let components = basis.moduli.iter()
            .zip(&basis.plans)
            .map(|(&q, plan)| {
                let reduced = CoeffPoly::from_coeffs(poly.coeffs.clone(), q);
                NttPoly::from_coeff_poly(&reduced, plan.clone())
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { components, ring_degree: basis.ring_degree })
    }

    /// Lift signed coefficients (e.g. centered plaintexts, gadget digits).
    pub fn from_signed(coeffs: &[i64], basis: &RnsBasis) -> Result<Self> {
        if coeffs.len() != basis.ring_degree {
            return Err(ControlError::DimensionMismatch { expected: basis.ring_degree, got: coeffs.len() });
        }
        let components = basis.moduli.iter()
            .zip(&basis.plans)
            .map(|(&q, plan)| {
                let residues = coeffs.iter().map(|&c| lift_signed(c, q)).collect();
                NttPoly::from_coeff_poly(&CoeffPoly { coeffs: residues, modulus: q }, plan.clone())
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { components, ring_degree: basis.ring_degree })
    }

    /// Lift arbitrary-precision signed coefficients.
    pub fn from_bigints(coeffs: &[BigInt], basis: &RnsBasis) -> Result<Self> {
        if coeffs.len() != basis.ring_degree {
            return Err(ControlError::DimensionMismatch { expected: basis.ring_degree, got: coeffs.len() });
        }
        let components = basis.moduli.iter()
            .zip(&basis.plans)
            .map(|(&q, plan)| {
                let q_big = BigInt::from(q);
                let residues = coeffs.iter()
                    .map(|c| {
                        let mut r = c % &q_big;
                        if r.is_negative() {
                            r += &q_big;
                        }
                        r.to_u64().unwrap_or(0)
                    })
                    .collect();
                NttPoly::from_coeff_poly(&CoeffPoly { coeffs: residues, modulus: q }, plan.clone())
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { components, ring_degree: basis.ring_degree })
    }

    /// CRT reconstruction into `[0, Q)`.
    pub fn to_biguints(&self, basis: &RnsBasis) -> Vec<BigUint> {
        let residues: Vec<CoeffPoly> = self.components.iter().map(NttPoly::to_coeff_poly).collect();
        (0..self.ring_degree)
            .map(|j| basis.reconstruct(residues.iter().map(|r| r.coeffs[j])))
            .collect()
    }

    /// CRT reconstruction into `(-Q/2, Q/2]`.
    pub fn to_centered_bigints(&self, basis: &RnsBasis) -> Vec<BigInt> {
        self.to_biguints(basis).into_iter().map(|x| basis.center(x)).collect()
    }

    /// Centered coefficients when the basis is a single prime.
    pub fn to_centered_i64(&self) -> Vec<i64> {
        self.components[0].to_coeff_poly().centered_coeffs()
    }

    fn zip_with<F>(&self, other: &Self, f: F) -> Result<Self>
    where
        F: Fn(&NttPoly, &NttPoly) -> Result<NttPoly>,
    {
        if self.components.len() != other.components.len() {
            return Err(ControlError::DimensionMismatch {
                expected: self.components.len(),
                got: other.components.len(),
            });
        }
        let components = self.components.iter()
            .zip(&other.components)
            .map(|(a, b)| f(a, b))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { components, ring_degree: self.ring_degree })
    }

    pub fn add(&self, other: &Self) -> Result<Self> {
        self.zip_with(other, NttPoly::add)
    }

    pub fn sub(&self, other: &Self) -> Result<Self> {
        self.zip_with(other, NttPoly::sub)
    }

    pub fn mul(&self, other: &Self) -> Result<Self> {
        self.zip_with(other, NttPoly::mul)
    }

    pub fn neg(&self) -> Self {
        Self { components: self.components.iter().map(NttPoly::neg).collect(), ring_degree: self.ring_degree }
    }

    pub fn scalar_mul(&self, scalar: u64) -> Self {
        Self {
            components: self.components.iter().map(|c| c.scalar_mul(scalar)).collect(),
            ring_degree: self.ring_degree,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const N: usize = 16;
    const Q0: u64 = 65537;
    const Q1: u64 = 1099509805057;

    fn padded(v: &[u64]) -> Vec<u64> {
        let mut r = vec![0u64; N];
        r[..v.len()].copy_from_slice(v);
        r
    }

    #[test]
    fn test_roundtrip_two_primes() {
        let basis = RnsBasis::new(vec![Q0, Q1], N).unwrap();
        let original = CoeffPoly::from_coeffs(padded(&[1, 2, 3, 70000, 5]), u64::MAX);
        let rns = RnsPoly::from_coeff_poly(&original, &basis).unwrap();
        let back = rns.to_biguints(&basis);
        for (b, &c) in back.iter().zip(&original.coeffs) {
            assert_eq!(*b, BigUint::from(c));
        }
    }

    #[test]
    fn test_signed_lift_is_centered_on_the_way_back() {
        let basis = RnsBasis::new(vec![Q0, Q1], N).unwrap();
        let mut coeffs = vec![0i64; N];
        coeffs[0] = -5;
        coeffs[1] = 123_456_789;
        coeffs[2] = -1;
        let rns = RnsPoly::from_signed(&coeffs, &basis).unwrap();
        let back = rns.to_centered_bigints(&basis);
        for (b, &c) in back.iter().zip(&coeffs) {
            assert_eq!(*b, BigInt::from(c));
        }

        let big: Vec<BigInt> = coeffs.iter().map(|&c| BigInt::from(c) * 1000).collect();
        let rns = RnsPoly::from_bigints(&big, &basis).unwrap();
        assert_eq!(rns.to_centered_bigints(&basis), big);
    }

    #[test]
    fn test_rns_mul_matches_naive() {
        let basis = RnsBasis::new(vec![Q0], N).unwrap();
        let a = CoeffPoly::from_coeffs(padded(&[1, 1]), Q0);
        let b = CoeffPoly::from_coeffs(padded(&[2, 0, 3]), Q0);
        let ra = RnsPoly::from_coeff_poly(&a, &basis).unwrap();
        let rb = RnsPoly::from_coeff_poly(&b, &basis).unwrap();
        let prod = ra.mul(&rb).unwrap().to_biguints(&basis);
        let expected = a.mul_naive(&b).unwrap();
        for (p, &e) in prod.iter().zip(&expected.coeffs) {
            assert_eq!(*p, BigUint::from(e));
        }
    }

    #[test]
    fn test_non_coprime_basis_rejected() {
        assert!(RnsBasis::new(vec![Q0, Q0], N).is_err());
        assert!(RnsBasis::new(vec![], N).is_err());
    }
}
