use num_bigint::BigInt;
use num_traits::{Signed, ToPrimitive, Zero};

use crate::error::{ControlError, Result};
use crate::ring::modular::{center, lift_signed, mod_inv, mod_mul, mod_sub};
use crate::ring::poly::CoeffPoly;
use crate::ring::rns::{RnsBasis, RnsPoly};
use crate::bfv::{BfvCiphertext, keygen::RelinKey};
use crate::bfv::keyswitch::relinearize;

/// Component-wise sum. A shorter operand is padded with zeros.
pub fn bfv_add(ct1: &BfvCiphertext, ct2: &BfvCiphertext) -> Result<BfvCiphertext> {
    ct1.check_compatible(ct2)?;
    let (long, short) = if ct1.c.len() >= ct2.c.len() { (ct1, ct2) } else { (ct2, ct1) };

    let c = long.c.iter()
        .enumerate()
        .map(|(i, a)| match short.c.get(i) {
            Some(b) => a.add(b),
            None => Ok(a.clone()),
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(BfvCiphertext { c, params: ct1.params.clone() })
}

/// Multiply by a plaintext polynomial.
///
/// The plaintext is lifted through its centered representative, so the
/// noise grows with `|m|` rather than with `t`.
pub fn bfv_plain_mul(ct: &BfvCiphertext, pt: &CoeffPoly) -> Result<BfvCiphertext> {
    let params = &ct.params;
    if pt.modulus != params.plain_modulus {
        return Err(ControlError::ModulusMismatch);
    }
    let m = RnsPoly::from_signed(&pt.centered_coeffs(), &params.ct_basis)?;
    let c = ct.c.iter().map(|ci| ci.mul(&m)).collect::<Result<Vec<_>>>()?;
    Ok(BfvCiphertext { c, params: params.clone() })
}

/// Ciphertext product followed by relinearization back to degree 1.
pub fn bfv_mul_and_relin(
    ct1: &BfvCiphertext,
    ct2: &BfvCiphertext,
    rlk: &RelinKey,
) -> Result<BfvCiphertext> {
    let ct_mul = bfv_mul_no_relin(ct1, ct2)?;
    relinearize(&ct_mul, rlk)
}

/// Tensor product scaled by `t/Q`, giving a degree-2 ciphertext.
///
/// HPS base extension when Q is a single prime with an aux basis,
/// exact BigInt tensoring otherwise.
pub fn bfv_mul_no_relin(ct1: &BfvCiphertext, ct2: &BfvCiphertext) -> Result<BfvCiphertext> {
    ct1.check_compatible(ct2)?;
    if ct1.c.len() != 2 || ct2.c.len() != 2 {
        return Err(ControlError::InvalidParameters(
            "multiplication requires degree-1 ciphertexts".into(),
        ));
    }

    let params = &ct1.params;
    let c = match params.aux_basis.as_deref() {
        Some(aux) if params.ct_basis.num_moduli() == 1 => mul_hps(ct1, ct2, aux)?,
        _ => mul_exact(ct1, ct2)?,
    };
    Ok(BfvCiphertext { c, params: params.clone() })
}

/// Exact tensoring: CRT to centered BigInts, negacyclic product, then
/// `round(t·x/Q)` per coefficient.
fn mul_exact(ct1: &BfvCiphertext, ct2: &BfvCiphertext) -> Result<Vec<RnsPoly>> {
    let params = &ct1.params;
    let basis = &params.ct_basis;
    let n = params.ring_degree;
    let q = BigInt::from(basis.product.clone());
    let half_q = &q >> 1;
    let t = params.plain_modulus;

    let c0 = ct1.c[0].to_centered_bigints(basis);
    let c1 = ct1.c[1].to_centered_bigints(basis);
    let d0 = ct2.c[0].to_centered_bigints(basis);
    let d1 = ct2.c[1].to_centered_bigints(basis);

    let t0 = negacyclic_mul(&c0, &d0, n);
    let t1 = poly_add(&negacyclic_mul(&c0, &d1, n), &negacyclic_mul(&c1, &d0, n));
    let t2 = negacyclic_mul(&c1, &d1, n);

    [t0, t1, t2]
        .iter()
        .map(|tensor| {
            let scaled: Vec<BigInt> = tensor.iter().map(|x| round_div(&(x * t), &q, &half_q)).collect();
            RnsPoly::from_bigints(&scaled, basis)
        })
        .collect()
}

fn negacyclic_mul(a: &[BigInt], b: &[BigInt], n: usize) -> Vec<BigInt> {
    let mut out = vec![BigInt::zero(); n];
    for (i, ai) in a.iter().enumerate() {
        if ai.is_zero() {
            continue;
        }
        for (j, bj) in b.iter().enumerate() {
            let prod = ai * bj;
            let k = i + j;
            if k < n {
                out[k] += prod;
            } else {
                out[k - n] -= prod;
            }
        }
    }
    out
}

fn poly_add(a: &[BigInt], b: &[BigInt]) -> Vec<BigInt> {
    a.iter().zip(b).map(|(x, y)| x + y).collect()
}

/// Round-half-away-from-zero division.
fn round_div(x: &BigInt, q: &BigInt, half_q: &BigInt) -> BigInt {
    if x.is_negative() {
        -((-x + half_q) / q)
    } else {
        (x + half_q) / q
    }
}

/// HPS tensoring for a single-prime Q.
///
/// Each tensor coefficient `T` is known mod q (as `a`) and mod P. The
/// quotient `m = (T - a)/q` is recovered in P, and
/// `round(t·T/q) = round(t·a/q) + t·m`.
fn mul_hps(ct1: &BfvCiphertext, ct2: &BfvCiphertext, aux: &RnsBasis) -> Result<Vec<RnsPoly>> {
    let params = &ct1.params;
    let q = params.ct_basis.moduli[0];

    let c0_p = base_extend_centered(&ct1.c[0], aux)?;
    let c1_p = base_extend_centered(&ct1.c[1], aux)?;
    let d0_p = base_extend_centered(&ct2.c[0], aux)?;
    let d1_p = base_extend_centered(&ct2.c[1], aux)?;

    let t0_q = ct1.c[0].mul(&ct2.c[0])?;
    let t1_q = ct1.c[0].mul(&ct2.c[1])?.add(&ct1.c[1].mul(&ct2.c[0])?)?;
    let t2_q = ct1.c[1].mul(&ct2.c[1])?;

    let t0_p = c0_p.mul(&d0_p)?;
    let t1_p = c0_p.mul(&d1_p)?.add(&c1_p.mul(&d0_p)?)?;
    let t2_p = c1_p.mul(&d1_p)?;

    let q_inv: Vec<u64> = aux.moduli.iter()
        .map(|&pj| {
            mod_inv(q % pj, pj).ok_or_else(|| {
                ControlError::InvalidParameters(format!("q = {q} is not invertible mod aux prime {pj}"))
            })
        })
        .collect::<Result<_>>()?;

    vec![(t0_q, t0_p), (t1_q, t1_p), (t2_q, t2_p)]
        .iter()
        .map(|(tq, tp)| hps_scale(tq, tp, params.plain_modulus, q, &q_inv, aux, &params.ct_basis))
        .collect()
}

/// Move a single-prime polynomial into the aux basis through its centered
/// coefficients.
fn base_extend_centered(poly: &RnsPoly, aux: &RnsBasis) -> Result<RnsPoly> {
    RnsPoly::from_signed(&poly.to_centered_i64(), aux)
}

fn hps_scale(
    t_q: &RnsPoly,
    t_p: &RnsPoly,
    t: u64,
    q: u64,
    q_inv: &[u64],
    aux: &RnsBasis,
    ct_basis: &RnsBasis,
) -> Result<RnsPoly> {
    let a_poly = t_q.components[0].to_coeff_poly();
    let b_polys: Vec<CoeffPoly> = t_p.components.iter().map(|c| c.to_coeff_poly()).collect();

    let t_128 = t as i128;
    let q_128 = q as i128;
    let q_big = BigInt::from(q);

    let coeffs = a_poly.coeffs.iter()
        .enumerate()
        .map(|(i, &a)| {
            let a_c = center(a, q);
            let residues = aux.moduli.iter()
                .zip(&aux.barrett_ks)
                .zip(b_polys.iter().zip(q_inv))
                .map(|((&pj, &bk), (b, &qi))| {
                    mod_mul(mod_sub(b.coeffs[i], lift_signed(a_c, pj), pj), qi, pj, bk)
                });
            let m = aux.center(aux.reconstruct(residues));
            let m_mod_q = (m % &q_big).to_i128().unwrap_or(0);

            let ta = t_128 * a_c as i128;
            let half = q_128 / 2;
            let round_ta = if ta >= 0 { (ta + half) / q_128 } else { -((-ta + half) / q_128) };

            (round_ta + t_128 * m_mod_q).rem_euclid(q_128) as u64
        })
        .collect();

    RnsPoly::from_coeff_poly(&CoeffPoly { coeffs, modulus: q }, ct_basis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;
    use crate::bfv::encrypt::{decrypt, encrypt_pk_with_rng, noise_budget};
    use crate::bfv::keygen::*;
    use crate::params::{BfvParams, BfvParamsBuilder};
    use crate::params::presets::toy_bfv;

    struct Fixture {
        params: Arc<BfvParams>,
        sk: SecretKey,
        pk: PublicKey,
        rlk: RelinKey,
        rng: ChaCha20Rng,
    }

    impl Fixture {
        fn new(params: Arc<BfvParams>, seed: u64) -> Self {
            let mut rng = ChaCha20Rng::seed_from_u64(seed);
            let sk = gen_secret_key_with_rng(&params, &mut rng).unwrap();
            let pk = gen_public_key_with_rng(&sk, &mut rng).unwrap();
            let rlk = gen_relin_key_with_rng(&sk, &mut rng).unwrap();
            Self { params, sk, pk, rlk, rng }
        }

        fn encrypt(&mut self, v: i64) -> BfvCiphertext {
            let pt = self.constant(v);
            encrypt_pk_with_rng(&pt, &self.pk, &mut self.rng).unwrap()
        }

        fn constant(&self, v: i64) -> CoeffPoly {
            let t = self.params.plain_modulus;
            CoeffPoly::constant(lift_signed(v, t), self.params.ring_degree, t)
        }

        fn decrypt(&self, ct: &BfvCiphertext) -> i64 {
            center(decrypt(ct, &self.sk).unwrap().coeffs[0], self.params.plain_modulus)
        }
    }

    #[test]
    fn test_add() {
        let mut f = Fixture::new(toy_bfv().unwrap(), 1);
        let a = f.encrypt(100);
        let b = f.encrypt(-30);
        assert_eq!(f.decrypt(&bfv_add(&a, &b).unwrap()), 70);
        // wraps mod t
        let c = f.encrypt(100);
        assert_eq!(f.decrypt(&bfv_add(&a, &c).unwrap()), 200 - 257);
    }

    #[test]
    fn test_plain_mul_signed() {
        let mut f = Fixture::new(toy_bfv().unwrap(), 2);
        let ct = f.encrypt(-7);
        for k in [-5i64, -1, 0, 1, 3, 18] {
            let pt = f.constant(k);
            assert_eq!(f.decrypt(&bfv_plain_mul(&ct, &pt).unwrap()), -7 * k, "k = {k}");
        }
    }

    #[test]
    fn test_plain_mul_costs_about_log_k_bits() {
        let mut f = Fixture::new(toy_bfv().unwrap(), 3);
        let ct = f.encrypt(2);
        let before = noise_budget(&ct, &f.sk).unwrap();
        let after = noise_budget(&bfv_plain_mul(&ct, &f.constant(4)).unwrap(), &f.sk).unwrap();
        assert_eq!(before - after, 2);
    }

    #[test]
    fn test_mul_exact_path() {
        let mut f = Fixture::new(toy_bfv().unwrap(), 4);
        let a = f.encrypt(-3);
        let b = f.encrypt(11);
        let prod = bfv_mul_and_relin(&a, &b, &f.rlk).unwrap();
        assert_eq!(prod.degree(), 1);
        assert_eq!(f.decrypt(&prod), -33);
        assert!(noise_budget(&prod, &f.sk).unwrap() < noise_budget(&a, &f.sk).unwrap());
    }

    #[test]
    fn test_mul_hps_path() {
        let params = BfvParamsBuilder::new()
            .ring_degree(16)
            .plain_modulus(257)
            .ct_moduli(vec![1152921504606830593])
            .aux_moduli(vec![18014398509998081, 36028797018972161])
            .gadget_base(1 << 8)
            .build()
            .unwrap();
        let mut f = Fixture::new(params, 5);
        let a = f.encrypt(12);
        let b = f.encrypt(-10);
        let no_relin = bfv_mul_no_relin(&a, &b).unwrap();
        assert_eq!(no_relin.degree(), 2);
        assert_eq!(f.decrypt(&no_relin), -120);
        assert_eq!(f.decrypt(&bfv_mul_and_relin(&a, &b, &f.rlk).unwrap()), -120);
    }

    #[test]
    fn test_mismatched_instances_rejected() {
        let mut f = Fixture::new(toy_bfv().unwrap(), 6);
        let other = BfvParamsBuilder::new()
            .ring_degree(32)
            .ct_moduli(vec![65537, 1099509805057])
            .build()
            .unwrap();
        let mut g = Fixture::new(other, 6);
        let a = f.encrypt(1);
        let b = g.encrypt(1);
        assert!(matches!(bfv_add(&a, &b), Err(ControlError::ModulusMismatch)));
    }

    #[test]
    fn test_exact_round_div() {
        let q = BigInt::from(10);
        let half = BigInt::from(5);
        assert_eq!(round_div(&BigInt::from(14), &q, &half), BigInt::from(1));
        assert_eq!(round_div(&BigInt::from(15), &q, &half), BigInt::from(2));
        assert_eq!(round_div(&BigInt::from(-15), &q, &half), BigInt::from(-2));
        assert_eq!(round_div(&BigInt::from(-14), &q, &half), BigInt::from(-1));
    }
}
