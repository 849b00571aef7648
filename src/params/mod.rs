pub mod presets;

use std::fmt;
use std::sync::Arc;
use num_bigint::BigUint;
use num_traits::One;

use crate::error::{ControlError, Result};
use crate::ring::rns::RnsBasis;

/// BFV scheme parameters. Immutable once built and shared through `Arc`.
#[derive(Clone, Debug)]
pub struct BfvParams {
    /// Ring degree n (power of two, >= 16).
    pub ring_degree: usize,
    /// Plaintext modulus t.
    pub plain_modulus: u64,
    /// RNS basis of the ciphertext modulus Q = ∏ q_i.
    pub ct_basis: Arc<RnsBasis>,
    /// Auxiliary basis P for HPS tensoring. Only used when Q is a single
    /// prime; otherwise tensoring is exact over BigInt.
    pub aux_basis: Option<Arc<RnsBasis>>,
    /// Error standard deviation.
    pub sigma: f64,
    /// Gadget base for relinearization.
    pub gadget_base: u64,
    /// Number of balanced gadget digits covering Q.
    pub gadget_digits: usize,
}

impl BfvParams {
    /// ⌊Q/t⌋.
    pub fn delta(&self) -> BigUint {
        &self.ct_basis.product / self.plain_modulus
    }

    /// Centered range of representable scalars.
    pub fn scalar_range(&self) -> (i64, i64) {
        let t = self.plain_modulus as i64;
        (-((t - 1) / 2), t / 2)
    }

    /// Parameters describe the same scheme instance.
    pub fn same_instance(&self, other: &BfvParams) -> bool {
        self.ring_degree == other.ring_degree
            && self.plain_modulus == other.plain_modulus
            && self.ct_basis.moduli == other.ct_basis.moduli
    }
}

impl fmt::Display for BfvParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "BFV(n={}, t={}, log2 Q={}, primes={:?}, aux={:?}, sigma={}, gadget=2^{}x{})",
            self.ring_degree,
            self.plain_modulus,
            self.ct_basis.bit_count(),
            self.ct_basis.moduli,
            self.aux_basis.as_ref().map(|b| &b.moduli),
            self.sigma,
            self.gadget_base.trailing_zeros(),
            self.gadget_digits,
        )
    }
}

/// Builder for [`BfvParams`].
pub struct BfvParamsBuilder {
    ring_degree: usize,
    plain_modulus: u64,
    ct_moduli: Vec<u64>,
    aux_moduli: Vec<u64>,
    sigma: f64,
    gadget_base: u64,
    min_fresh_budget: u32,
}

impl Default for BfvParamsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl BfvParamsBuilder {
    pub fn new() -> Self {
        Self {
            ring_degree: 1024,
            plain_modulus: 257,
            ct_moduli: Vec::new(),
            aux_moduli: Vec::new(),
            sigma: 3.2,
            gadget_base: 1 << 16,
            min_fresh_budget: 4,
        }
    }

    pub fn ring_degree(mut self, n: usize) -> Self {
        self.ring_degree = n;
        self
    }

    pub fn plain_modulus(mut self, t: u64) -> Self {
        self.plain_modulus = t;
        self
    }

    pub fn ct_moduli(mut self, moduli: Vec<u64>) -> Self {
        self.ct_moduli = moduli;
        self
    }

    pub fn aux_moduli(mut self, moduli: Vec<u64>) -> Self {
        self.aux_moduli = moduli;
        self
    }

    pub fn sigma(mut self, sigma: f64) -> Self {
        self.sigma = sigma;
        self
    }

    pub fn gadget_base(mut self, base: u64) -> Self {
        self.gadget_base = base;
        self
    }

    /// Lower bound, in bits, on the worst-case noise budget of a fresh
    /// public-key encryption. Parameters that cannot meet it are rejected.
    pub fn min_fresh_budget(mut self, bits: u32) -> Self {
        self.min_fresh_budget = bits;
        self
    }

    pub fn build(self) -> Result<Arc<BfvParams>> {
        let n = self.ring_degree;
        if !n.is_power_of_two() || n < 16 {
            return Err(ControlError::InvalidRingDegree(n));
        }
        if self.ct_moduli.is_empty() {
            return Err(ControlError::InvalidParameters("at least one ciphertext modulus is required".into()));
        }
        if self.plain_modulus < 2 {
            return Err(ControlError::InvalidParameters("plaintext modulus must be >= 2".into()));
        }
        if !(self.sigma > 0.0) {
            return Err(ControlError::InvalidParameters(format!("sigma must be positive, got {}", self.sigma)));
        }
        if self.gadget_base < 4 || !self.gadget_base.is_power_of_two() {
            return Err(ControlError::InvalidParameters(format!(
                "gadget base must be a power of two >= 4, got {}",
                self.gadget_base
            )));
        }

        let ct_basis = Arc::new(RnsBasis::new(self.ct_moduli, n)?);

        let fresh = fresh_budget_bound(&ct_basis.product, self.plain_modulus, n, self.sigma);
        if fresh < self.min_fresh_budget as i64 {
            return Err(ControlError::InvalidParameters(format!(
                "ciphertext modulus of {} bits leaves {fresh} bits of fresh noise budget, need {}",
                ct_basis.bit_count(),
                self.min_fresh_budget
            )));
        }

        let aux_basis = if self.aux_moduli.is_empty() {
            None
        } else {
            let aux = RnsBasis::new(self.aux_moduli, n)?;
            // HPS recovers the quotient of a tensor coefficient by q in the
            // aux basis; the middle term is bounded by n·q²/2, so it must
            // not wrap below P > n·q.
            if ct_basis.num_moduli() == 1 {
                let bound = &ct_basis.product * BigUint::from(n);
                if aux.product <= bound {
                    return Err(ControlError::InvalidParameters(format!(
                        "aux basis of {} bits too small for HPS, need P > n*Q",
                        aux.bit_count()
                    )));
                }
            }
            Some(Arc::new(aux))
        };

        let gadget_digits = gadget_digits(&ct_basis.product, self.gadget_base);

        Ok(Arc::new(BfvParams {
            ring_degree: n,
            plain_modulus: self.plain_modulus,
            ct_basis,
            aux_basis,
            sigma: self.sigma,
            gadget_base: self.gadget_base,
            gadget_digits,
        }))
    }
}

/// Worst-case fresh budget `bits(Q) - bits(t·B) - 1` with the public-key
/// encryption noise bound `B = 6σ(2n + 1)`.
fn fresh_budget_bound(q: &BigUint, t: u64, n: usize, sigma: f64) -> i64 {
    let noise = (6.0 * sigma * (2 * n + 1) as f64).ceil() as u128;
    let scaled = BigUint::from(noise) * t;
    q.bits() as i64 - scaled.bits() as i64 - 1
}

/// Balanced digits in `[-b/2, b/2)` need one digit beyond `ceil(log_b Q)`
/// to cover every centered residue.
fn gadget_digits(q: &BigUint, base: u64) -> usize {
    let mut pow = BigUint::one();
    let mut digits = 0usize;
    while &pow < q {
        pow *= base;
        digits += 1;
    }
    digits + 1
}
