use num_bigint::BigInt;
use num_traits::{ToPrimitive, Zero};

use crate::error::{ControlError, Result};
use crate::ring::rns::RnsPoly;
use crate::bfv::{BfvCiphertext, keygen::RelinKey};

/// Balanced gadget decomposition of centered coefficients.
///
/// Returns `num_digits` digit vectors with `c = Σ d_i · base^i` and every
/// `d_i` in `[-base/2, base/2)`.
pub fn gadget_decompose(coeffs: &[BigInt], base: u64, num_digits: usize) -> Vec<Vec<i64>> {
    let base_big = BigInt::from(base);
    let half_base = (base / 2) as i64;
    let mut digits = vec![vec![0i64; coeffs.len()]; num_digits];

    for (pos, c) in coeffs.iter().enumerate() {
        let mut remaining = c.clone();
        for digit in digits.iter_mut() {
            let mut rem = (&remaining % &base_big).to_i64().unwrap_or(0);
            if rem < -half_base {
                rem += base as i64;
            } else if rem >= half_base {
                rem -= base as i64;
            }
            digit[pos] = rem;
            remaining = (remaining - rem) / &base_big;
        }
        debug_assert!(remaining.is_zero(), "gadget digits do not cover Q");
    }

    digits
}

/// Fold `c2` of a degree-2 ciphertext into `(c0, c1)`:
///
/// c0' = c0 + Σ_i D_i(c2) · rlk0_i
/// c1' = c1 + Σ_i D_i(c2) · rlk1_i
pub fn relinearize(ct: &BfvCiphertext, rlk: &RelinKey) -> Result<BfvCiphertext> {
    match ct.c.len() {
        2 => return Ok(ct.clone()),
        3 => {}
        len => {
            return Err(ControlError::InvalidParameters(format!(
                "relinearization needs a degree-2 ciphertext, got degree {}",
                len - 1
            )))
        }
    }

    let params = &ct.params;
    let basis = &params.ct_basis;
    if !rlk.params.same_instance(params) || rlk.keys.len() != params.gadget_digits {
        return Err(ControlError::ModulusMismatch);
    }

    let c2 = ct.c[2].to_centered_bigints(basis);
    let digits = gadget_decompose(&c2, params.gadget_base, params.gadget_digits);

    let mut c0 = ct.c[0].clone();
    let mut c1 = ct.c[1].clone();
    for (digit, (rlk0, rlk1)) in digits.iter().zip(&rlk.keys) {
        if digit.iter().all(|&d| d == 0) {
            continue;
        }
        let d = RnsPoly::from_signed(digit, basis)?;
        c0 = c0.add(&d.mul(rlk0)?)?;
        c1 = c1.add(&d.mul(rlk1)?)?;
    }

    Ok(BfvCiphertext { c: vec![c0, c1], params: params.clone() })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gadget_decompose_small() {
        // 42 = -6 + 3·16
        let digits = gadget_decompose(&[BigInt::from(42)], 16, 3);
        assert_eq!(digits, vec![vec![-6], vec![3], vec![0]]);
    }

    #[test]
    fn test_gadget_decompose_reconstructs_signed_values() {
        let base = 256u64;
        let values: Vec<BigInt> = [0i64, 1, -1, 127, 128, -128, -129, 123_456_789_012, -987_654_321_098]
            .iter()
            .map(|&v| BigInt::from(v))
            .collect();
        let digits = gadget_decompose(&values, base, 7);

        for (pos, v) in values.iter().enumerate() {
            let mut acc = BigInt::from(0);
            let mut power = BigInt::from(1);
            for digit in &digits {
                assert!(digit[pos] >= -128 && digit[pos] < 128);
                acc += &power * digit[pos];
                power *= base;
            }
            assert_eq!(&acc, v);
        }
    }
}
