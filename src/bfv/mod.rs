//! BFV over `Z_Q[X]/(X^n + 1)`: keys, public-key encryption, decryption,
//! noise budget, and the three homomorphic operations the controller needs.

pub mod keygen;
pub mod encrypt;
pub mod eval;
pub mod keyswitch;

pub use keygen::{SecretKey, PublicKey, RelinKey};
pub use encrypt::{encrypt_pk, encrypt_pk_with_rng, decrypt, noise_budget};
pub use eval::{bfv_add, bfv_plain_mul, bfv_mul_and_relin};

use std::sync::Arc;
use crate::error::{ControlError, Result};
use crate::params::BfvParams;
use crate::ring::rns::RnsPoly;

/// A BFV ciphertext: (c0, c1) when fresh, (c0, c1, c2) between a tensor
/// product and relinearization.
#[derive(Clone, Debug)]
pub struct BfvCiphertext {
    pub c: Vec<RnsPoly>,
    pub params: Arc<BfvParams>,
}

impl BfvCiphertext {
    pub fn degree(&self) -> usize {
        self.c.len() - 1
    }

    /// Both operands belong to the same scheme instance.
    pub(crate) fn check_compatible(&self, other: &Self) -> Result<()> {
        if Arc::ptr_eq(&self.params, &other.params) || self.params.same_instance(&other.params) {
            Ok(())
        } else {
            Err(ControlError::ModulusMismatch)
        }
    }
}
