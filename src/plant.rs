//! The trusted party: owns the dynamics `x[k+1] = A·x[k] + B·u[k]` and the
//! secret key.

use std::sync::Arc;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use tracing::{debug, warn};

use crate::bfv::BfvCiphertext;
use crate::cipher_vec::{Decryptor, Encryptor};
use crate::codec::Codec;
use crate::error::{ControlError, Result};
use crate::keys::{generate_keys_with_rng, Context, KeySource, PublicMaterial, SecretMaterial};
use crate::linalg::{vec_add, Matrix};

/// Smallest control budget accepted unless configured otherwise. Zero bits
/// left means the decryption can no longer be trusted.
pub const DEFAULT_NOISE_FLOOR: u32 = 1;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlantPhase {
    /// Constructed, no state emitted yet.
    Initialized,
    /// State emitted, waiting for the matching control.
    AwaitingControl,
    /// Control absorbed and the state advanced.
    Advanced,
}

struct PlantKeys {
    codec: Codec,
    encryptor: Encryptor,
    secret: SecretMaterial,
}

pub struct Plant {
    x: Vec<i64>,
    a: Matrix<i64>,
    b: Matrix<i64>,
    u: Vec<i64>,
    k: u64,
    phase: PlantPhase,
    keys: Option<PlantKeys>,
    noise_floor: u32,
    last_budget: Option<u32>,
    rng: ChaCha20Rng,
}

impl Plant {
    /// `A` must be n×n and `B` n×m for `n = len(x0)`.
    pub fn new(x0: Vec<i64>, a: Matrix<i64>, b: Matrix<i64>) -> Result<Self> {
        let n = x0.len();
        if a.rows() != n {
            return Err(ControlError::DimensionMismatch { expected: n, got: a.rows() });
        }
        if a.cols() != n {
            return Err(ControlError::DimensionMismatch { expected: n, got: a.cols() });
        }
        if b.rows() != n {
            return Err(ControlError::DimensionMismatch { expected: n, got: b.rows() });
        }
        let u = vec![0; b.cols()];
        Ok(Self {
            x: x0,
            a,
            b,
            u,
            k: 0,
            phase: PlantPhase::Initialized,
            keys: None,
            noise_floor: DEFAULT_NOISE_FLOOR,
            last_budget: None,
            rng: ChaCha20Rng::from_os_rng(),
        })
    }

    /// Reseed the encryption randomness.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = ChaCha20Rng::seed_from_u64(seed);
        self
    }

    /// Install key material and return the public half for the controller.
    pub fn bind_encryption(&mut self, ctx: &Context, source: KeySource) -> Result<Arc<PublicMaterial>> {
        if self.keys.is_some() {
            return Err(ControlError::AlreadyBound("plant"));
        }
        let (public, secret) = match source {
            KeySource::SelfGenerated => generate_keys_with_rng(ctx, &mut self.rng)?,
            KeySource::Supplied { public, secret } => {
                if !public.params().same_instance(ctx.params()) || !secret.params().same_instance(ctx.params()) {
                    return Err(ControlError::InvalidParameters(
                        "supplied keys were generated for different parameters".into(),
                    ));
                }
                (public, secret)
            }
        };
        debug!(params = %ctx.params(), "plant bound to key material");
        self.keys = Some(PlantKeys {
            codec: ctx.codec(),
            encryptor: Encryptor::new(public.clone()),
            secret,
        });
        Ok(public)
    }

    fn keys(&self) -> Result<&PlantKeys> {
        self.keys.as_ref().ok_or(ControlError::NotBound("plant"))
    }

    /// Encode and encrypt the current state. The step does not change.
    pub fn emit_encrypted_state(&mut self) -> Result<Vec<BfvCiphertext>> {
        let keys = self.keys.as_ref().ok_or(ControlError::NotBound("plant"))?;
        let pts = keys.codec.encode_vector(&self.x)?;
        let cts = keys.encryptor.encrypt_vector_with_rng(&pts, &mut self.rng)?;
        self.phase = PlantPhase::AwaitingControl;
        Ok(cts)
    }

    /// Decrypt the control, then `x ← A·x + B·u` and `k ← k + 1`.
    ///
    /// The noise budget is checked before anything is decrypted or mutated;
    /// on failure the plant stays at its current step.
    pub fn absorb_control_and_advance(&mut self, u_enc: &[BfvCiphertext]) -> Result<()> {
        let keys = self.keys()?;
        if self.phase != PlantPhase::AwaitingControl {
            return Err(ControlError::OutOfOrder(format!(
                "control for step {} arrived without a pending state emission",
                self.k
            )));
        }
        if u_enc.len() != self.b.cols() {
            return Err(ControlError::DimensionMismatch { expected: self.b.cols(), got: u_enc.len() });
        }

        let decryptor = Decryptor::new(&keys.secret);
        let budget = decryptor.min_noise_budget(u_enc)?;
        if let Some(remaining) = budget {
            if remaining < self.noise_floor {
                warn!(step = self.k, remaining, floor = self.noise_floor, "control noise budget below floor");
                return Err(ControlError::NoiseBudgetExhausted {
                    step: self.k,
                    remaining,
                    floor: self.noise_floor,
                });
            }
        }

        let u = keys.codec.decode_vector(&decryptor.decrypt_vector(u_enc)?)?;
        let x = vec_add(&self.a.mul_vec(&self.x)?, &self.b.mul_vec(&u)?)?;

        self.x = x;
        self.u = u;
        self.k += 1;
        self.last_budget = budget;
        self.phase = PlantPhase::Advanced;
        debug!(step = self.k, state = ?self.x, control = ?self.u, budget = ?budget, "plant advanced");
        Ok(())
    }

    pub fn set_noise_floor(&mut self, bits: u32) {
        self.noise_floor = bits;
    }

    pub fn noise_floor(&self) -> u32 {
        self.noise_floor
    }

    pub fn current_state(&self) -> &[i64] {
        &self.x
    }

    pub fn current_step(&self) -> u64 {
        self.k
    }

    /// Last decoded control, zeros before the first round.
    pub fn last_control(&self) -> &[i64] {
        &self.u
    }

    /// Smallest budget among the last absorbed control ciphertexts.
    pub fn remaining_noise_budget(&self) -> Option<u32> {
        self.last_budget
    }

    pub fn phase(&self) -> PlantPhase {
        self.phase
    }

    pub fn public_material(&self) -> Option<&Arc<PublicMaterial>> {
        self.keys.as_ref().map(|k| k.encryptor.public_material())
    }

    pub fn state_dim(&self) -> usize {
        self.x.len()
    }

    pub fn input_dim(&self) -> usize {
        self.b.cols()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::generate_keys;
    use crate::params::presets::toy_bfv;

    fn scenario_plant() -> Plant {
        Plant::new(
            vec![1, 1],
            Matrix::identity(2),
            Matrix::from_rows(vec![vec![2, -2], vec![-2, 2]]).unwrap(),
        )
        .unwrap()
        .with_seed(99)
    }

    fn encrypt_control(plant: &mut Plant, values: &[i64]) -> Vec<BfvCiphertext> {
        let keys = plant.keys.as_ref().unwrap();
        let pts = keys.codec.encode_vector(values).unwrap();
        keys.encryptor.encrypt_vector_with_rng(&pts, &mut plant.rng).unwrap()
    }

    #[test]
    fn test_new_validates_shapes() {
        let b = Matrix::from_rows(vec![vec![1], vec![1]]).unwrap();
        assert!(Plant::new(vec![1, 2], Matrix::identity(3), b.clone()).is_err());
        assert!(Plant::new(vec![1, 2, 3], Matrix::identity(3), b.clone()).is_err());
        let rect = Matrix::from_rows(vec![vec![1, 0, 0], vec![0, 1, 0]]).unwrap();
        assert!(Plant::new(vec![1, 2], rect, b.clone()).is_err());
        let plant = Plant::new(vec![1, 2], Matrix::identity(2), b).unwrap();
        assert_eq!(plant.last_control(), &[0]);
        assert_eq!(plant.phase(), PlantPhase::Initialized);
    }

    #[test]
    fn test_bind_once() {
        let ctx = Context::from_params(toy_bfv().unwrap());
        let mut plant = scenario_plant();
        assert!(matches!(plant.emit_encrypted_state(), Err(ControlError::NotBound("plant"))));
        let public = plant.bind_encryption(&ctx, KeySource::SelfGenerated).unwrap();
        assert!(Arc::ptr_eq(&public, plant.public_material().unwrap()));
        assert!(matches!(
            plant.bind_encryption(&ctx, KeySource::SelfGenerated),
            Err(ControlError::AlreadyBound("plant"))
        ));
    }

    #[test]
    fn test_supplied_keys_must_match_context() {
        let toy = Context::from_params(toy_bfv().unwrap());
        let other = Context::new(
            crate::params::BfvParamsBuilder::new().ring_degree(32).ct_moduli(vec![65537, 1099509805057]),
        )
        .unwrap();
        let (public, secret) = generate_keys(&other).unwrap();
        let mut plant = scenario_plant();
        assert!(matches!(
            plant.bind_encryption(&toy, KeySource::Supplied { public, secret }),
            Err(ControlError::InvalidParameters(_))
        ));
        assert!(plant.public_material().is_none());
    }

    #[test]
    fn test_emit_then_absorb_advances() {
        let ctx = Context::from_params(toy_bfv().unwrap());
        let mut plant = scenario_plant();
        plant.bind_encryption(&ctx, KeySource::SelfGenerated).unwrap();

        let x_enc = plant.emit_encrypted_state().unwrap();
        assert_eq!(x_enc.len(), 2);
        assert_eq!(plant.current_step(), 0);
        assert_eq!(plant.phase(), PlantPhase::AwaitingControl);

        // u = K·x with K = [[-1, 1], [1, 0]] and x = [1, 1]
        let u_enc = encrypt_control(&mut plant, &[0, 1]);
        plant.absorb_control_and_advance(&u_enc).unwrap();
        assert_eq!(plant.current_state(), &[-1, 3]);
        assert_eq!(plant.last_control(), &[0, 1]);
        assert_eq!(plant.current_step(), 1);
        assert_eq!(plant.phase(), PlantPhase::Advanced);
        assert!(plant.remaining_noise_budget().unwrap() > 0);
    }

    #[test]
    fn test_absorb_without_emission_is_out_of_order() {
        let ctx = Context::from_params(toy_bfv().unwrap());
        let mut plant = scenario_plant();
        plant.bind_encryption(&ctx, KeySource::SelfGenerated).unwrap();
        let u_enc = encrypt_control(&mut plant, &[0, 0]);
        assert!(matches!(plant.absorb_control_and_advance(&u_enc), Err(ControlError::OutOfOrder(_))));

        plant.emit_encrypted_state().unwrap();
        plant.absorb_control_and_advance(&u_enc).unwrap();
        assert!(matches!(plant.absorb_control_and_advance(&u_enc), Err(ControlError::OutOfOrder(_))));
    }

    #[test]
    fn test_noise_floor_rejects_without_mutation() {
        let ctx = Context::from_params(toy_bfv().unwrap());
        let mut plant = scenario_plant();
        plant.bind_encryption(&ctx, KeySource::SelfGenerated).unwrap();
        plant.set_noise_floor(200);

        plant.emit_encrypted_state().unwrap();
        let u_enc = encrypt_control(&mut plant, &[1, 1]);
        match plant.absorb_control_and_advance(&u_enc) {
            Err(ControlError::NoiseBudgetExhausted { step, floor, .. }) => {
                assert_eq!(step, 0);
                assert_eq!(floor, 200);
            }
            other => panic!("expected exhaustion, got {other:?}"),
        }
        assert_eq!(plant.current_state(), &[1, 1]);
        assert_eq!(plant.current_step(), 0);
        assert_eq!(plant.phase(), PlantPhase::AwaitingControl);
        assert_eq!(plant.remaining_noise_budget(), None);
    }

    #[test]
    fn test_wrong_control_length() {
        let ctx = Context::from_params(toy_bfv().unwrap());
        let mut plant = scenario_plant();
        plant.bind_encryption(&ctx, KeySource::SelfGenerated).unwrap();
        plant.emit_encrypted_state().unwrap();
        let u_enc = encrypt_control(&mut plant, &[1]);
        assert!(matches!(
            plant.absorb_control_and_advance(&u_enc),
            Err(ControlError::DimensionMismatch { expected: 2, got: 1 })
        ));
    }
}
