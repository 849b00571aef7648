pub mod modular;
pub mod ntt;
pub mod poly;
pub mod rns;

pub use ntt::NttPoly;
pub use poly::CoeffPoly;
pub use rns::{RnsBasis, RnsPoly};
