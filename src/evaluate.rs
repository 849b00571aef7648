//! Homomorphic matrix·vector evaluation.
//!
//! Every row is an independent unit of work: it reads the shared input
//! vector and produces one output ciphertext. Rows run on the rayon pool.
//! All dimension checks happen before any ciphertext is touched.

use rayon::prelude::*;
use tracing::{debug, instrument};

use crate::bfv::{bfv_add, bfv_mul_and_relin, bfv_plain_mul, BfvCiphertext, RelinKey};
use crate::error::{ControlError, Result};
use crate::linalg::Matrix;
use crate::ring::poly::CoeffPoly;

/// A gain matrix ready for evaluation.
#[derive(Clone, Debug)]
pub enum EncodedGain {
    Open(Matrix<CoeffPoly>),
    Sealed(Matrix<BfvCiphertext>),
}

impl EncodedGain {
    pub fn rows(&self) -> usize {
        match self {
            Self::Open(m) => m.rows(),
            Self::Sealed(m) => m.rows(),
        }
    }

    pub fn cols(&self) -> usize {
        match self {
            Self::Open(m) => m.cols(),
            Self::Sealed(m) => m.cols(),
        }
    }
}

fn check_dims(rows: usize, cols: usize, v: &[BfvCiphertext], bias: Option<&[BfvCiphertext]>) -> Result<()> {
    if v.len() != cols {
        return Err(ControlError::DimensionMismatch { expected: cols, got: v.len() });
    }
    if let Some(bias) = bias {
        if bias.len() != rows {
            return Err(ControlError::DimensionMismatch { expected: rows, got: bias.len() });
        }
    }
    Ok(())
}

/// `bias + M·v` for a plaintext `M`.
///
/// Zero entries of `M` are skipped: multiplying by an encoded zero still
/// costs noise and time, and the bias row already carries a valid
/// ciphertext for rows that end up empty.
#[instrument(skip_all, fields(rows = m.rows(), cols = m.cols()))]
pub fn evaluate_open(
    m: &Matrix<CoeffPoly>,
    v: &[BfvCiphertext],
    bias: Vec<BfvCiphertext>,
) -> Result<Vec<BfvCiphertext>> {
    check_dims(m.rows(), m.cols(), v, Some(&bias))?;

    let skipped = m.iter_rows().flatten().filter(|pt| pt.is_zero()).count();
    debug!(skipped, "zero gain entries skipped");

    bias.into_par_iter()
        .enumerate()
        .map(|(i, acc)| {
            m.row(i).iter()
                .zip(v)
                .filter(|(entry, _)| !entry.is_zero())
                .try_fold(acc, |acc, (entry, vj)| bfv_add(&acc, &bfv_plain_mul(vj, entry)?))
        })
        .collect()
}

/// `M·v (+ bias)` for an encrypted `M`.
///
/// No entry can be skipped since a ciphertext does not reveal whether it
/// encrypts zero.
#[instrument(skip_all, fields(rows = m.rows(), cols = m.cols()))]
pub fn evaluate_sealed(
    m: &Matrix<BfvCiphertext>,
    v: &[BfvCiphertext],
    rlk: &RelinKey,
    bias: Option<Vec<BfvCiphertext>>,
) -> Result<Vec<BfvCiphertext>> {
    check_dims(m.rows(), m.cols(), v, bias.as_deref())?;
    if m.cols() == 0 && bias.is_none() {
        return Err(ControlError::InvalidParameters(
            "sealed evaluation of a matrix with no columns needs a bias".into(),
        ));
    }

    (0..m.rows())
        .into_par_iter()
        .map(|i| -> Result<BfvCiphertext> {
            let mut terms = m.row(i).iter().zip(v).map(|(kij, vj)| bfv_mul_and_relin(kij, vj, rlk));
            let mut acc = match (&bias, terms.next()) {
                (Some(b), Some(first)) => bfv_add(&b[i], &first?)?,
                (Some(b), None) => b[i].clone(),
                (None, Some(first)) => first?,
                (None, None) => {
                    return Err(ControlError::InvalidParameters("empty row and no bias".into()))
                }
            };
            for term in terms {
                acc = bfv_add(&acc, &term?)?;
            }
            Ok(acc)
        })
        .collect()
}

/// Dispatch on the gain variant. Open gains require a bias of one
/// ciphertext per row; a missing bias counts as an empty one.
pub fn evaluate(
    gain: &EncodedGain,
    v: &[BfvCiphertext],
    rlk: &RelinKey,
    bias: Option<Vec<BfvCiphertext>>,
) -> Result<Vec<BfvCiphertext>> {
    match gain {
        EncodedGain::Open(m) => evaluate_open(m, v, bias.unwrap_or_default()),
        EncodedGain::Sealed(m) => evaluate_sealed(m, v, rlk, bias),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;
    use crate::cipher_vec::{Decryptor, Encryptor};
    use crate::codec::Codec;
    use crate::keys::{generate_keys_with_rng, Context, PublicMaterial, SecretMaterial};
    use crate::params::presets::toy_bfv;

    struct Fixture {
        codec: Codec,
        public: Arc<PublicMaterial>,
        secret: SecretMaterial,
        rng: ChaCha20Rng,
    }

    impl Fixture {
        fn new(seed: u64) -> Self {
            let ctx = Context::from_params(toy_bfv().unwrap());
            let mut rng = ChaCha20Rng::seed_from_u64(seed);
            let (public, secret) = generate_keys_with_rng(&ctx, &mut rng).unwrap();
            Self { codec: ctx.codec(), public, secret, rng }
        }

        fn encrypt(&mut self, values: &[i64]) -> Vec<BfvCiphertext> {
            let pts = self.codec.encode_vector(values).unwrap();
            Encryptor::new(self.public.clone()).encrypt_vector_with_rng(&pts, &mut self.rng).unwrap()
        }

        fn decrypt(&self, cts: &[BfvCiphertext]) -> Vec<i64> {
            self.codec.decode_vector(&Decryptor::new(&self.secret).decrypt_vector(cts).unwrap()).unwrap()
        }
    }

    #[test]
    fn test_open_matches_plaintext() {
        let mut f = Fixture::new(21);
        let m = Matrix::from_rows(vec![vec![-1, 1, 0], vec![1, 0, 3]]).unwrap();
        let v = f.encrypt(&[4, -5, 2]);
        let bias = f.encrypt(&[0, 10]);

        let out = evaluate_open(&f.codec.encode_matrix(&m).unwrap(), &v, bias).unwrap();
        assert_eq!(f.decrypt(&out), vec![-9, 20]);
    }

    #[test]
    fn test_open_all_zero_row_returns_bias() {
        let mut f = Fixture::new(22);
        let m = Matrix::from_rows(vec![vec![0, 0], vec![2, 0]]).unwrap();
        let v = f.encrypt(&[9, 9]);
        let bias = f.encrypt(&[0, 0]);
        let out = evaluate_open(&f.codec.encode_matrix(&m).unwrap(), &v, bias).unwrap();
        assert_eq!(f.decrypt(&out), vec![0, 18]);
    }

    #[test]
    fn test_sealed_matches_plaintext() {
        let mut f = Fixture::new(23);
        let m = Matrix::from_rows(vec![vec![-1, 1], vec![1, 0]]).unwrap();
        let sealed = Encryptor::new(f.public.clone())
            .encrypt_matrix_with_rng(&f.codec.encode_matrix(&m).unwrap(), &mut f.rng)
            .unwrap();
        let v = f.encrypt(&[1, 1]);

        let out = evaluate_sealed(&sealed, &v, f.public.relin_key(), None).unwrap();
        assert_eq!(f.decrypt(&out), vec![0, 1]);

        let bias = f.encrypt(&[5, -5]);
        let out = evaluate_sealed(&sealed, &v, f.public.relin_key(), Some(bias)).unwrap();
        assert_eq!(f.decrypt(&out), vec![5, -4]);
    }

    #[test]
    fn test_dimension_mismatch_before_work() {
        let mut f = Fixture::new(24);
        let m = f.codec.encode_matrix(&Matrix::from_rows(vec![vec![1, 2]]).unwrap()).unwrap();
        let v = f.encrypt(&[1, 2, 3]);
        let bias = f.encrypt(&[0]);
        assert!(matches!(
            evaluate_open(&m, &v, bias.clone()),
            Err(ControlError::DimensionMismatch { expected: 2, got: 3 })
        ));

        let v = f.encrypt(&[1, 2]);
        assert!(matches!(
            evaluate(&EncodedGain::Open(m), &v, f.public.relin_key(), None),
            Err(ControlError::DimensionMismatch { expected: 1, got: 0 })
        ));
        // inputs are untouched
        assert_eq!(f.decrypt(&v), vec![1, 2]);
        assert_eq!(f.decrypt(&bias), vec![0]);
    }
}
