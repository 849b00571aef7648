//! # encrypted-control: linear feedback control over BFV
//!
//! A plant evolves `x[k+1] = A·x[k] + B·u[k]` and a controller computes
//! `u[k] = K·x[k]` without ever seeing `x`. Every round the plant encrypts
//! its state, the controller evaluates `K·x` homomorphically, and the plant
//! decrypts the control and advances. The gain is either plaintext
//! ([`controller::Gain::Open`]) or itself encrypted
//! ([`controller::Gain::Sealed`]), in which case the controller learns
//! nothing but its shape.
//!
//! ## Quick Start
//!
//! ```no_run
//! use encrypted_control::prelude::*;
//!
//! let ctx = Context::from_params(presets::open_gain_bfv().unwrap());
//!
//! let a = Matrix::identity(2);
//! let b = Matrix::from_rows(vec![vec![2, -2], vec![-2, 2]]).unwrap();
//! let k = Matrix::from_rows(vec![vec![-1, 1], vec![1, 0]]).unwrap();
//!
//! let mut plant = Plant::new(vec![1, 1], a, b).unwrap();
//! let public = plant.bind_encryption(&ctx, KeySource::SelfGenerated).unwrap();
//!
//! let mut controller = Controller::new(Gain::Open(k)).unwrap();
//! controller.bind_encryption(public).unwrap();
//!
//! let mut control_loop = ControlLoop::new(plant, controller, LoopConfig::default()).unwrap();
//! let trajectory = control_loop.run().unwrap();
//! assert_eq!(trajectory.states(), vec![vec![-1, 3], vec![9, -7]]);
//! ```

pub mod error;
pub mod params;
pub mod ring;
pub mod sampling;
pub mod bfv;
pub mod codec;
pub mod keys;
pub mod cipher_vec;
pub mod linalg;
pub mod evaluate;
pub mod plant;
pub mod controller;
pub mod protocol;

/// Convenient re-exports for common types and functions.
pub mod prelude {
    pub use crate::error::{ControlError, Result};
    pub use crate::params::{presets, BfvParams, BfvParamsBuilder};
    pub use crate::bfv::BfvCiphertext;
    pub use crate::codec::Codec;
    pub use crate::keys::{generate_keys, generate_keys_with_rng, Context, KeySource, PublicMaterial, SecretMaterial};
    pub use crate::cipher_vec::{Decryptor, Encryptor};
    pub use crate::linalg::Matrix;
    pub use crate::evaluate::{evaluate, evaluate_open, evaluate_sealed, EncodedGain};
    pub use crate::plant::{Plant, PlantPhase};
    pub use crate::controller::{Controller, Gain, GainMode};
    pub use crate::protocol::{simulate_plaintext, ControlLoop, LoopConfig, RoundRecord, Trajectory};
}
