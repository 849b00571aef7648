//! The untrusted party: evaluates `u = K·x` on ciphertexts.
//!
//! Nothing in this module accepts or returns secret key material.
//!
//! ```compile_fail
//! use encrypted_control::prelude::*;
//!
//! let ctx = Context::from_params(presets::toy_bfv().unwrap());
//! let (_public, secret) = generate_keys(&ctx).unwrap();
//! let mut controller = Controller::new(Gain::Open(Matrix::identity(2))).unwrap();
//! controller.bind_encryption(secret).unwrap();
//! ```

use std::sync::Arc;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use tracing::debug;

use crate::bfv::BfvCiphertext;
use crate::cipher_vec::Encryptor;
use crate::error::{ControlError, Result};
use crate::evaluate::{evaluate, EncodedGain};
use crate::keys::PublicMaterial;
use crate::linalg::Matrix;

/// Gain matrix as handed to the controller, fixed for its lifetime.
#[derive(Clone, Debug)]
pub enum Gain {
    /// Plaintext `K`; the controller learns the control law.
    Open(Matrix<i64>),
    /// Encrypted `K`; the controller learns only its shape.
    Sealed(Matrix<BfvCiphertext>),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GainMode {
    Open,
    Sealed,
}

struct Bound {
    gain: EncodedGain,
    encryptor: Encryptor,
}

pub struct Controller {
    mode: GainMode,
    rows: usize,
    cols: usize,
    pending: Option<Gain>,
    bound: Option<Bound>,
    /// Latest encrypted control, all zeros once bound.
    u: Vec<BfvCiphertext>,
    k: u64,
    rng: ChaCha20Rng,
}

impl Controller {
    /// Entries of a sealed gain must all belong to one scheme instance.
    pub fn new(gain: Gain) -> Result<Self> {
        let (mode, rows, cols) = match &gain {
            Gain::Open(m) => (GainMode::Open, m.rows(), m.cols()),
            Gain::Sealed(m) => {
                if let Some(first) = m.get(0, 0) {
                    if m.iter_rows().flatten().any(|ct| !ct.params.same_instance(&first.params)) {
                        return Err(ControlError::ModulusMismatch);
                    }
                }
                (GainMode::Sealed, m.rows(), m.cols())
            }
        };
        Ok(Self {
            mode,
            rows,
            cols,
            pending: Some(gain),
            bound: None,
            u: Vec::new(),
            k: 0,
            rng: ChaCha20Rng::from_os_rng(),
        })
    }

    /// Reseed the randomness used for the zero bias.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = ChaCha20Rng::seed_from_u64(seed);
        self
    }

    /// Accept the plant's public material. An open gain is encoded here,
    /// once, and reused every round.
    pub fn bind_encryption(&mut self, public: Arc<PublicMaterial>) -> Result<()> {
        if self.bound.is_some() {
            return Err(ControlError::AlreadyBound("controller"));
        }
        let encoded = match &self.pending {
            Some(Gain::Open(m)) => Some(EncodedGain::Open(public.codec().encode_matrix(m)?)),
            Some(Gain::Sealed(m)) => {
                if m.get(0, 0).is_some_and(|ct| !ct.params.same_instance(public.params())) {
                    return Err(ControlError::InvalidParameters(
                        "sealed gain was encrypted under different parameters".into(),
                    ));
                }
                None
            }
            None => return Err(ControlError::AlreadyBound("controller")),
        };
        let encryptor = Encryptor::new(public);
        let u = encryptor.encrypt_zeros_with_rng(self.rows, &mut self.rng)?;
        let gain = match (encoded, self.pending.take()) {
            (Some(open), _) => open,
            (None, Some(Gain::Sealed(m))) => EncodedGain::Sealed(m),
            (None, _) => return Err(ControlError::AlreadyBound("controller")),
        };
        debug!(mode = ?self.mode, rows = self.rows, cols = self.cols, "controller bound");
        self.u = u;
        self.bound = Some(Bound { gain, encryptor });
        Ok(())
    }

    /// `u = K·x` on ciphertexts. Never decrypts.
    pub fn evaluate_control(&mut self, x_enc: &[BfvCiphertext]) -> Result<Vec<BfvCiphertext>> {
        let bound = self.bound.as_ref().ok_or(ControlError::NotBound("controller"))?;
        let rlk = bound.encryptor.public_material().relin_key();
        let u_enc = match &bound.gain {
            EncodedGain::Open(_) => {
                // all-zero start so rows whose entries are all skipped
                // still yield a ciphertext
                let bias = bound.encryptor.encrypt_zeros_with_rng(self.rows, &mut self.rng)?;
                evaluate(&bound.gain, x_enc, rlk, Some(bias))?
            }
            EncodedGain::Sealed(_) => evaluate(&bound.gain, x_enc, rlk, None)?,
        };
        self.u = u_enc.clone();
        self.k += 1;
        debug!(step = self.k, mode = ?self.mode, "control evaluated");
        Ok(u_enc)
    }

    pub fn current_step(&self) -> u64 {
        self.k
    }

    /// Encrypted control of the latest round. Empty until bound.
    pub fn last_control(&self) -> &[BfvCiphertext] {
        &self.u
    }

    pub fn mode(&self) -> GainMode {
        self.mode
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn is_bound(&self) -> bool {
        self.bound.is_some()
    }
}
