pub mod gaussian;
pub mod uniform;

pub use gaussian::sample_gaussian_coeffs;
pub use uniform::{sample_binary_coeffs, sample_ternary_coeffs, sample_uniform_rns};
