//! Sequential plant ↔ controller rounds.
//!
//! One round is `emit_encrypted_state → evaluate_control →
//! absorb_control_and_advance`. Both parties must be at the same step when a
//! round starts.

use tracing::{debug, info, instrument};

use crate::controller::Controller;
use crate::error::{ControlError, Result};
use crate::linalg::Matrix;
use crate::plant::{Plant, DEFAULT_NOISE_FLOOR};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoopConfig {
    /// Rounds performed by [`ControlLoop::run`].
    pub rounds: u64,
    /// Minimum control noise budget, in bits, the plant accepts.
    pub noise_floor_bits: u32,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self { rounds: 2, noise_floor_bits: DEFAULT_NOISE_FLOOR }
    }
}

impl LoopConfig {
    pub fn rounds(mut self, rounds: u64) -> Self {
        self.rounds = rounds;
        self
    }

    pub fn noise_floor_bits(mut self, bits: u32) -> Self {
        self.noise_floor_bits = bits;
        self
    }
}

/// What the plant observed in one round.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoundRecord {
    /// Step reached at the end of the round.
    pub step: u64,
    pub state: Vec<i64>,
    pub control: Vec<i64>,
    pub noise_budget: Option<u32>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Trajectory {
    pub initial_state: Vec<i64>,
    pub rounds: Vec<RoundRecord>,
}

impl Trajectory {
    /// `x[1], x[2], ...`
    pub fn states(&self) -> Vec<Vec<i64>> {
        self.rounds.iter().map(|r| r.state.clone()).collect()
    }

    pub fn controls(&self) -> Vec<Vec<i64>> {
        self.rounds.iter().map(|r| r.control.clone()).collect()
    }

    /// Smallest budget seen across all rounds.
    pub fn min_noise_budget(&self) -> Option<u32> {
        self.rounds.iter().filter_map(|r| r.noise_budget).min()
    }
}

pub struct ControlLoop {
    plant: Plant,
    controller: Controller,
    config: LoopConfig,
    trajectory: Trajectory,
}

impl ControlLoop {
    /// Both parties must already be bound and conformable: the controller
    /// reads the plant's state and produces its input.
    pub fn new(mut plant: Plant, controller: Controller, config: LoopConfig) -> Result<Self> {
        if plant.public_material().is_none() {
            return Err(ControlError::NotBound("plant"));
        }
        if !controller.is_bound() {
            return Err(ControlError::NotBound("controller"));
        }
        if controller.cols() != plant.state_dim() {
            return Err(ControlError::DimensionMismatch { expected: plant.state_dim(), got: controller.cols() });
        }
        if controller.rows() != plant.input_dim() {
            return Err(ControlError::DimensionMismatch { expected: plant.input_dim(), got: controller.rows() });
        }
        plant.set_noise_floor(config.noise_floor_bits);
        let trajectory = Trajectory { initial_state: plant.current_state().to_vec(), rounds: Vec::new() };
        Ok(Self { plant, controller, config, trajectory })
    }

    /// One full round.
    #[instrument(skip_all, fields(step = self.plant.current_step()))]
    pub fn step(&mut self) -> Result<RoundRecord> {
        let (plant_step, controller_step) = (self.plant.current_step(), self.controller.current_step());
        if plant_step != controller_step {
            return Err(ControlError::StepDesync { plant: plant_step, controller: controller_step });
        }

        let x_enc = self.plant.emit_encrypted_state()?;
        let u_enc = self.controller.evaluate_control(&x_enc)?;
        self.plant.absorb_control_and_advance(&u_enc)?;

        let record = RoundRecord {
            step: self.plant.current_step(),
            state: self.plant.current_state().to_vec(),
            control: self.plant.last_control().to_vec(),
            noise_budget: self.plant.remaining_noise_budget(),
        };
        debug!(?record, "round complete");
        self.trajectory.rounds.push(record.clone());
        Ok(record)
    }

    /// `config.rounds` rounds. Stops at the first error; rounds completed
    /// before it stay in [`ControlLoop::trajectory`].
    pub fn run(&mut self) -> Result<Trajectory> {
        for _ in 0..self.config.rounds {
            self.step()?;
        }
        info!(
            rounds = self.config.rounds,
            min_budget = ?self.trajectory.min_noise_budget(),
            "control loop finished"
        );
        Ok(self.trajectory.clone())
    }

    pub fn trajectory(&self) -> &Trajectory {
        &self.trajectory
    }

    pub fn plant(&self) -> &Plant {
        &self.plant
    }

    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    pub fn config(&self) -> LoopConfig {
        self.config
    }

    pub fn into_parts(self) -> (Plant, Controller) {
        (self.plant, self.controller)
    }
}

/// Reference trajectory `x[k+1] = (A + B·K)·x[k]` in plain integers,
/// returning `x[1], ..., x[rounds]`.
///
/// Matches the encrypted loop as long as every control stays inside the
/// plaintext range; beyond it the encrypted controls wrap modulo `t`.
pub fn simulate_plaintext(
    a: &Matrix<i64>,
    b: &Matrix<i64>,
    k: &Matrix<i64>,
    x0: &[i64],
    rounds: u64,
) -> Result<Vec<Vec<i64>>> {
    let closed = a.add(&b.mul_mat(k)?)?;
    let mut x = x0.to_vec();
    let mut states = Vec::new();
    for _ in 0..rounds {
        x = closed.mul_vec(&x)?;
        states.push(x.clone());
    }
    Ok(states)
}
