use std::sync::Arc;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use zeroize::Zeroize;

use crate::error::Result;
use crate::params::BfvParams;
use crate::ring::rns::RnsPoly;
use crate::sampling::{sample_gaussian_coeffs, sample_ternary_coeffs, sample_uniform_rns};

/// BFV secret key: ternary `s`, held in RNS-NTT form.
///
/// Not `Clone`, and wiped on drop.
pub struct SecretKey {
    pub(crate) poly: RnsPoly,
    pub params: Arc<BfvParams>,
}

impl Drop for SecretKey {
    fn drop(&mut self) {
        for comp in &mut self.poly.components {
            comp.evals.zeroize();
        }
    }
}

/// `pk = (-(a·s + e), a)`.
#[derive(Clone, Debug)]
pub struct PublicKey {
    pub pk0: RnsPoly,
    pub pk1: RnsPoly,
    pub params: Arc<BfvParams>,
}

/// Relinearization key. Entry `i` satisfies
/// `rlk0_i + rlk1_i · s = base^i · s^2 - e_i`.
#[derive(Clone, Debug)]
pub struct RelinKey {
    pub keys: Vec<(RnsPoly, RnsPoly)>,
    pub params: Arc<BfvParams>,
}

pub fn gen_secret_key(params: &Arc<BfvParams>) -> Result<SecretKey> {
    let mut rng = ChaCha20Rng::from_os_rng();
    gen_secret_key_with_rng(params, &mut rng)
}

pub fn gen_secret_key_with_rng<R: rand::Rng>(
    params: &Arc<BfvParams>,
    rng: &mut R,
) -> Result<SecretKey> {
    let mut coeffs = sample_ternary_coeffs(params.ring_degree, rng);
    let poly = RnsPoly::from_signed(&coeffs, &params.ct_basis);
    coeffs.zeroize();
    Ok(SecretKey { poly: poly?, params: params.clone() })
}

pub fn gen_public_key(sk: &SecretKey) -> Result<PublicKey> {
    let mut rng = ChaCha20Rng::from_os_rng();
    gen_public_key_with_rng(sk, &mut rng)
}

pub fn gen_public_key_with_rng<R: rand::Rng>(sk: &SecretKey, rng: &mut R) -> Result<PublicKey> {
    let params = &sk.params;
    let (pk0, pk1) = rlwe_sample(sk, rng)?;
    Ok(PublicKey { pk0, pk1, params: params.clone() })
}

pub fn gen_relin_key(sk: &SecretKey) -> Result<RelinKey> {
    let mut rng = ChaCha20Rng::from_os_rng();
    gen_relin_key_with_rng(sk, &mut rng)
}

pub fn gen_relin_key_with_rng<R: rand::Rng>(sk: &SecretKey, rng: &mut R) -> Result<RelinKey> {
    let params = &sk.params;
    let mut gadget_s_sq = sk.poly.mul(&sk.poly)?;

    let mut keys = Vec::with_capacity(params.gadget_digits);
    for _ in 0..params.gadget_digits {
        let (b, a) = rlwe_sample(sk, rng)?;
        keys.push((b.add(&gadget_s_sq)?, a));
        gadget_s_sq = gadget_s_sq.scalar_mul(params.gadget_base);
    }

    Ok(RelinKey { keys, params: params.clone() })
}

/// `(-(a·s + e), a)` with `a` uniform and `e` Gaussian.
fn rlwe_sample<R: rand::Rng>(sk: &SecretKey, rng: &mut R) -> Result<(RnsPoly, RnsPoly)> {
    let params = &sk.params;
    let basis = &params.ct_basis;
    let a = sample_uniform_rns(basis, rng);
    let e = RnsPoly::from_signed(&sample_gaussian_coeffs(params.ring_degree, params.sigma, rng), basis)?;
    let b = a.mul(&sk.poly)?.add(&e)?.neg();
    Ok((b, a))
}
