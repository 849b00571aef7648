use std::sync::Arc;
use crate::error::Result;
use crate::params::{BfvParams, BfvParamsBuilder};

/// n=16, two-prime Q ≈ 2^56, t=257.
///
/// Not secure. Small enough that exact BigInt tensoring is cheap, which
/// makes it the instance unit tests and property tests run on.
pub fn toy_bfv() -> Result<Arc<BfvParams>> {
    BfvParamsBuilder::new()
        .ring_degree(16)
        .plain_modulus(257)
        // both ≡ 1 mod 32
        .ct_moduli(vec![65537, 1099509805057])
        .gadget_base(1 << 8)
        .sigma(3.2)
        .build()
}

/// n=1024, two primes Q ≈ 2^89, t=257.
///
/// Sized for plaintext-gain control: one ciphertext×plaintext level per
/// round costs about 9 bits of the ~70 bits of fresh budget.
pub fn open_gain_bfv() -> Result<Arc<BfvParams>> {
    BfvParamsBuilder::new()
        .ring_degree(1024)
        .plain_modulus(257)
        // both ≡ 1 mod 2048
        .ct_moduli(vec![1099509805057, 562949953443841])
        .sigma(3.2)
        .build()
}

/// n=2048, 60-bit q, t=257, two aux primes for HPS.
///
/// Sized for ciphertext-gain control: a fresh ciphertext has ~40 bits of
/// budget and one relinearized ciphertext×ciphertext product per round
/// costs roughly 22.
pub fn sealed_gain_bfv() -> Result<Arc<BfvParams>> {
    BfvParamsBuilder::new()
        .ring_degree(2048)
        .plain_modulus(257)
        // ≡ 1 mod 8192
        .ct_moduli(vec![1152921504606830593])
        // P ≈ 2^109 > n·q ≈ 2^71
        .aux_moduli(vec![18014398509998081, 36028797018972161])
        .gadget_base(1 << 8)
        .sigma(3.2)
        .build()
}
