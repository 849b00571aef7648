//! Scheme context and the split between public and secret key material.
//!
//! [`PublicMaterial`] is immutable and shared through `Arc` with everyone who
//! encrypts or evaluates. [`SecretMaterial`] has a single owner, is not
//! `Clone`, and is wiped on drop.

use std::fmt;
use std::sync::Arc;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

use crate::bfv::keygen::{
    gen_public_key_with_rng, gen_relin_key_with_rng, gen_secret_key_with_rng, PublicKey, RelinKey, SecretKey,
};
use crate::codec::Codec;
use crate::error::Result;
use crate::params::{BfvParams, BfvParamsBuilder};

/// Validated scheme parameters.
#[derive(Clone, Debug)]
pub struct Context {
    params: Arc<BfvParams>,
}

impl Context {
    pub fn new(builder: BfvParamsBuilder) -> Result<Self> {
        Ok(Self { params: builder.build()? })
    }

    pub fn from_params(params: Arc<BfvParams>) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &Arc<BfvParams> {
        &self.params
    }

    pub fn codec(&self) -> Codec {
        Codec::new(&self.params)
    }
}

/// Public key plus relinearization key.
#[derive(Clone, Debug)]
pub struct PublicMaterial {
    public_key: PublicKey,
    relin_key: RelinKey,
}

impl PublicMaterial {
    pub fn params(&self) -> &Arc<BfvParams> {
        &self.public_key.params
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    pub fn relin_key(&self) -> &RelinKey {
        &self.relin_key
    }

    pub fn codec(&self) -> Codec {
        Codec::new(self.params())
    }
}

pub struct SecretMaterial {
    secret_key: SecretKey,
}

impl SecretMaterial {
    pub fn params(&self) -> &Arc<BfvParams> {
        &self.secret_key.params
    }

    pub(crate) fn secret_key(&self) -> &SecretKey {
        &self.secret_key
    }
}

impl fmt::Debug for SecretMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretMaterial").finish_non_exhaustive()
    }
}

/// Where a plant gets its keys from.
pub enum KeySource {
    /// The plant generates a fresh key set and hands out the public half.
    SelfGenerated,
    /// Keys generated elsewhere and moved into the plant.
    Supplied {
        public: Arc<PublicMaterial>,
        secret: SecretMaterial,
    },
}

pub fn generate_keys(ctx: &Context) -> Result<(Arc<PublicMaterial>, SecretMaterial)> {
    let mut rng = ChaCha20Rng::from_os_rng();
    generate_keys_with_rng(ctx, &mut rng)
}

pub fn generate_keys_with_rng<R: rand::Rng>(
    ctx: &Context,
    rng: &mut R,
) -> Result<(Arc<PublicMaterial>, SecretMaterial)> {
    let secret_key = gen_secret_key_with_rng(ctx.params(), rng)?;
    let public_key = gen_public_key_with_rng(&secret_key, rng)?;
    let relin_key = gen_relin_key_with_rng(&secret_key, rng)?;
    Ok((Arc::new(PublicMaterial { public_key, relin_key }), SecretMaterial { secret_key }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::presets::toy_bfv;

    #[test]
    fn test_context_from_builder() {
        let ctx = Context::new(BfvParamsBuilder::new().ring_degree(16).ct_moduli(vec![65537, 1099509805057]))
            .unwrap();
        assert_eq!(ctx.params().ring_degree, 16);
        assert_eq!(ctx.codec().range(), (-128, 128));
        assert!(Context::new(BfvParamsBuilder::new().ring_degree(12)).is_err());
    }

    #[test]
    fn test_generated_material_shares_params() {
        let ctx = Context::from_params(toy_bfv().unwrap());
        let mut rng = ChaCha20Rng::seed_from_u64(5);
        let (public, secret) = generate_keys_with_rng(&ctx, &mut rng).unwrap();
        assert!(public.params().same_instance(ctx.params()));
        assert!(secret.params().same_instance(ctx.params()));
        assert_eq!(public.relin_key().keys.len(), ctx.params().gadget_digits);
        assert_eq!(format!("{secret:?}"), "SecretMaterial { .. }");
    }
}
