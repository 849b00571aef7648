use num_bigint::BigInt;
use num_traits::{Signed, ToPrimitive, Zero};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

use crate::error::{ControlError, Result};
use crate::params::BfvParams;
use crate::ring::ntt::NttPoly;
use crate::ring::modular::mod_mul;
use crate::ring::poly::CoeffPoly;
use crate::ring::rns::RnsPoly;
use crate::bfv::{BfvCiphertext, keygen::{SecretKey, PublicKey}};
use crate::sampling::{sample_binary_coeffs, sample_gaussian_coeffs};

/// Encrypt a plaintext polynomial under the public key.
///
/// ct = (pk0·u + e1 + Δ·m, pk1·u + e2)
/// with Δ = ⌊Q/t⌋, u binary and e1, e2 Gaussian.
pub fn encrypt_pk(plaintext: &CoeffPoly, pk: &PublicKey) -> Result<BfvCiphertext> {
    let mut rng = ChaCha20Rng::from_os_rng();
    encrypt_pk_with_rng(plaintext, pk, &mut rng)
}

pub fn encrypt_pk_with_rng<R: rand::Rng>(
    plaintext: &CoeffPoly,
    pk: &PublicKey,
    rng: &mut R,
) -> Result<BfvCiphertext> {
    let params = &pk.params;
    let basis = &params.ct_basis;
    let n = params.ring_degree;

    let delta_m = scale_plaintext(plaintext, params)?;

    let u = RnsPoly::from_signed(&sample_binary_coeffs(n, rng), basis)?;
    let e1 = RnsPoly::from_signed(&sample_gaussian_coeffs(n, params.sigma, rng), basis)?;
    let e2 = RnsPoly::from_signed(&sample_gaussian_coeffs(n, params.sigma, rng), basis)?;

    let c0 = pk.pk0.mul(&u)?.add(&e1)?.add(&delta_m)?;
    let c1 = pk.pk1.mul(&u)?.add(&e2)?;

    Ok(BfvCiphertext { c: vec![c0, c1], params: params.clone() })
}

/// `m = round(t · (c0 + c1·s + ...) / Q) mod t`.
pub fn decrypt(ct: &BfvCiphertext, sk: &SecretKey) -> Result<CoeffPoly> {
    let params = &ct.params;
    let basis = &params.ct_basis;
    let t = params.plain_modulus;
    let half_q = &basis.product >> 1;

    let coeffs = phase(ct, sk)?
        .to_biguints(basis)
        .into_iter()
        .map(|x| {
            let scaled: num_bigint::BigUint = (x * t + &half_q) / &basis.product;
            (scaled % t).to_u64().ok_or_else(|| {
                ControlError::InvalidParameters("decrypted coefficient does not fit in u64".into())
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(CoeffPoly { coeffs, modulus: t })
}

/// Invariant noise budget in bits.
///
/// With `v = [t · phase]_Q` centered, the budget is
/// `bits(Q) - bits(max|v_i|) - 1`, floored at zero. Decryption is correct
/// while it stays positive.
pub fn noise_budget(ct: &BfvCiphertext, sk: &SecretKey) -> Result<u32> {
    let params = &ct.params;
    let basis = &params.ct_basis;
    let t = params.plain_modulus;

    let norm = phase(ct, sk)?
        .to_biguints(basis)
        .into_iter()
        .map(|x| basis.center((x * t) % &basis.product).abs())
        .max()
        .unwrap_or_else(BigInt::zero);

    let budget = basis.bit_count() as i64 - norm.bits() as i64 - 1;
    Ok(budget.max(0) as u32)
}

/// `c0 + c1·s + c2·s^2 + ...`
fn phase(ct: &BfvCiphertext, sk: &SecretKey) -> Result<RnsPoly> {
    if !sk.params.same_instance(&ct.params) {
        return Err(ControlError::ModulusMismatch);
    }
    let mut acc = ct.c[0].clone();
    let mut s_power = sk.poly.clone();
    for (i, ci) in ct.c.iter().enumerate().skip(1) {
        acc = acc.add(&ci.mul(&s_power)?)?;
        if i + 1 < ct.c.len() {
            s_power = s_power.mul(&sk.poly)?;
        }
    }
    Ok(acc)
}

/// Δ·m in RNS-NTT form.
pub(crate) fn scale_plaintext(plaintext: &CoeffPoly, params: &BfvParams) -> Result<RnsPoly> {
    if plaintext.modulus != params.plain_modulus {
        return Err(ControlError::ModulusMismatch);
    }
    if plaintext.len() != params.ring_degree {
        return Err(ControlError::DimensionMismatch { expected: params.ring_degree, got: plaintext.len() });
    }

    let basis = &params.ct_basis;
    let delta = params.delta();
    let components = basis.moduli.iter()
        .zip(&basis.plans)
        .zip(&basis.barrett_ks)
        .map(|((&qi, plan), &bk)| {
            let delta_i = (&delta % qi).to_u64().unwrap_or(0);
            let coeffs = plaintext.coeffs.iter().map(|&m| mod_mul(m % qi, delta_i, qi, bk)).collect();
            NttPoly::from_coeff_poly(&CoeffPoly { coeffs, modulus: qi }, plan.clone())
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(RnsPoly { components, ring_degree: params.ring_degree })
}
