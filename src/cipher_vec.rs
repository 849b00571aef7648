//! Element-wise encryption and decryption of vectors and matrices.

use std::sync::Arc;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

use crate::bfv::{self, BfvCiphertext};
use crate::error::Result;
use crate::keys::{PublicMaterial, SecretMaterial};
use crate::linalg::Matrix;
use crate::ring::poly::CoeffPoly;

/// Encrypts under shared public material. Holds no secret.
#[derive(Clone, Debug)]
pub struct Encryptor {
    public: Arc<PublicMaterial>,
}

impl Encryptor {
    pub fn new(public: Arc<PublicMaterial>) -> Self {
        Self { public }
    }

    pub fn public_material(&self) -> &Arc<PublicMaterial> {
        &self.public
    }

    pub fn encrypt_vector(&self, pts: &[CoeffPoly]) -> Result<Vec<BfvCiphertext>> {
        let mut rng = ChaCha20Rng::from_os_rng();
        self.encrypt_vector_with_rng(pts, &mut rng)
    }

    pub fn encrypt_vector_with_rng<R: rand::Rng>(
        &self,
        pts: &[CoeffPoly],
        rng: &mut R,
    ) -> Result<Vec<BfvCiphertext>> {
        pts.iter()
            .map(|pt| bfv::encrypt_pk_with_rng(pt, self.public.public_key(), rng))
            .collect()
    }

    pub fn encrypt_matrix(&self, pts: &Matrix<CoeffPoly>) -> Result<Matrix<BfvCiphertext>> {
        let mut rng = ChaCha20Rng::from_os_rng();
        self.encrypt_matrix_with_rng(pts, &mut rng)
    }

    pub fn encrypt_matrix_with_rng<R: rand::Rng>(
        &self,
        pts: &Matrix<CoeffPoly>,
        rng: &mut R,
    ) -> Result<Matrix<BfvCiphertext>> {
        pts.try_map(|pt| bfv::encrypt_pk_with_rng(pt, self.public.public_key(), rng))
    }

    /// `len` fresh encryptions of zero.
    pub fn encrypt_zeros_with_rng<R: rand::Rng>(&self, len: usize, rng: &mut R) -> Result<Vec<BfvCiphertext>> {
        let params = self.public.params();
        let zero = CoeffPoly::zero(params.ring_degree, params.plain_modulus);
        (0..len).map(|_| bfv::encrypt_pk_with_rng(&zero, self.public.public_key(), rng)).collect()
    }
}

/// Decrypts with borrowed secret material.
pub struct Decryptor<'a> {
    secret: &'a SecretMaterial,
}

impl<'a> Decryptor<'a> {
    pub fn new(secret: &'a SecretMaterial) -> Self {
        Self { secret }
    }

    pub fn decrypt_vector(&self, cts: &[BfvCiphertext]) -> Result<Vec<CoeffPoly>> {
        cts.iter().map(|ct| bfv::decrypt(ct, self.secret.secret_key())).collect()
    }

    pub fn decrypt_matrix(&self, cts: &Matrix<BfvCiphertext>) -> Result<Matrix<CoeffPoly>> {
        cts.try_map(|ct| bfv::decrypt(ct, self.secret.secret_key()))
    }

    pub fn noise_budgets(&self, cts: &[BfvCiphertext]) -> Result<Vec<u32>> {
        cts.iter().map(|ct| bfv::noise_budget(ct, self.secret.secret_key())).collect()
    }

    /// Smallest budget in the vector, `None` when it is empty.
    pub fn min_noise_budget(&self, cts: &[BfvCiphertext]) -> Result<Option<u32>> {
        Ok(self.noise_budgets(cts)?.into_iter().min())
    }
}
