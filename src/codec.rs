//! Scalar ↔ plaintext encoding.
//!
//! A scalar lives in the constant coefficient of a plaintext polynomial over
//! `Z_t`. Negative values are stored as their residue and read back through
//! the centered representative, so anything that leaves
//! `[-(t-1)/2, t/2]` during evaluation wraps modulo `t`.

use crate::error::{ControlError, Result};
use crate::linalg::Matrix;
use crate::params::BfvParams;
use crate::ring::modular::{center, lift_signed};
use crate::ring::poly::CoeffPoly;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Codec {
    plain_modulus: u64,
    ring_degree: usize,
}

impl Codec {
    pub fn new(params: &BfvParams) -> Self {
        Self { plain_modulus: params.plain_modulus, ring_degree: params.ring_degree }
    }

    /// Inclusive bounds of representable scalars.
    pub fn range(&self) -> (i64, i64) {
        let t = self.plain_modulus as i64;
        (-((t - 1) / 2), t / 2)
    }

    pub fn encode(&self, value: i64) -> Result<CoeffPoly> {
        let (min, max) = self.range();
        if value < min || value > max {
            return Err(ControlError::ScalarOutOfRange { value, min, max });
        }
        Ok(CoeffPoly::constant(lift_signed(value, self.plain_modulus), self.ring_degree, self.plain_modulus))
    }

    /// Centered constant coefficient. Higher coefficients are ignored.
    pub fn decode(&self, pt: &CoeffPoly) -> Result<i64> {
        if pt.len() != self.ring_degree {
            return Err(ControlError::DimensionMismatch { expected: self.ring_degree, got: pt.len() });
        }
        let c = pt.coeffs[0] % self.plain_modulus;
        Ok(center(c, self.plain_modulus))
    }

    pub fn encode_vector(&self, values: &[i64]) -> Result<Vec<CoeffPoly>> {
        values.iter().map(|&v| self.encode(v)).collect()
    }

    pub fn decode_vector(&self, pts: &[CoeffPoly]) -> Result<Vec<i64>> {
        pts.iter().map(|pt| self.decode(pt)).collect()
    }

    pub fn encode_matrix(&self, m: &Matrix<i64>) -> Result<Matrix<CoeffPoly>> {
        m.try_map(|&v| self.encode(v))
    }

    pub fn decode_matrix(&self, m: &Matrix<CoeffPoly>) -> Result<Matrix<i64>> {
        m.try_map(|pt| self.decode(pt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::presets::toy_bfv;

    #[test]
    fn test_roundtrip_full_range() {
        let codec = Codec::new(&toy_bfv().unwrap());
        assert_eq!(codec.range(), (-128, 128));
        for v in -128..=128 {
            assert_eq!(codec.decode(&codec.encode(v).unwrap()).unwrap(), v);
        }
    }

    #[test]
    fn test_out_of_range_rejected() {
        let codec = Codec::new(&toy_bfv().unwrap());
        assert!(matches!(
            codec.encode(129),
            Err(ControlError::ScalarOutOfRange { value: 129, min: -128, max: 128 })
        ));
        assert!(codec.encode(-129).is_err());
    }

    #[test]
    fn test_zero_encodes_to_zero_polynomial() {
        let codec = Codec::new(&toy_bfv().unwrap());
        assert!(codec.encode(0).unwrap().is_zero());
        assert!(!codec.encode(-1).unwrap().is_zero());
    }

    #[test]
    fn test_decode_wraps() {
        let params = toy_bfv().unwrap();
        let codec = Codec::new(&params);
        // 200 ≡ -57 mod 257
        let pt = CoeffPoly::constant(200, params.ring_degree, params.plain_modulus);
        assert_eq!(codec.decode(&pt).unwrap(), -57);
    }

    #[test]
    fn test_matrix_shape_preserved() {
        let codec = Codec::new(&toy_bfv().unwrap());
        let m = Matrix::from_rows(vec![vec![1, -2, 3], vec![0, 5, -6]]).unwrap();
        let encoded = codec.encode_matrix(&m).unwrap();
        assert_eq!((encoded.rows(), encoded.cols()), (2, 3));
        assert_eq!(codec.decode_matrix(&encoded).unwrap(), m);
        assert_eq!(codec.decode_vector(&codec.encode_vector(&[4, -4]).unwrap()).unwrap(), vec![4, -4]);
    }

    #[test]
    fn test_decode_rejects_wrong_length() {
        let params = toy_bfv().unwrap();
        let codec = Codec::new(&params);
        let empty = CoeffPoly::from_coeffs(Vec::new(), params.plain_modulus);
        assert!(matches!(
            codec.decode(&empty),
            Err(ControlError::DimensionMismatch { expected: 16, got: 0 })
        ));
        let short = CoeffPoly::constant(5, 8, params.plain_modulus);
        assert!(codec.decode_vector(&[codec.encode(1).unwrap(), short]).is_err());
    }
}
