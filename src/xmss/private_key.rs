//! XMSS private keys: generation, raw (de)serialization and signing.
//!
//! Raw layout, no version tag:
//!
//! ```text
//! public key (oid || root || public seed) || unused leaf index (8, BE) || prf key || private seed
//! ```
//!
//! A signature is produced in two steps. *Reserve* takes the next leaf index
//! from the shared registry counter; *produce* builds the authentication path
//! and the one-time signature for that leaf. A reserved index is never handed
//! back, even when producing the signature fails afterwards: callers must
//! treat a failed `sign` as having consumed a leaf.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};
use zeroize::Zeroizing;

use crate::crypto::random::SecureRandom;
use crate::xmss::address::{Address, AddressType};
use crate::xmss::context::XMSSContext;
use crate::xmss::hash::to_byte;
use crate::xmss::params::XMSSParams;
use crate::xmss::public_key::XMSSPublicKey;
use crate::xmss::registry::{KeyIdentity, LeafCounter};
use crate::xmss::signature::XMSSSignature;
use crate::xmss::tree::{TreeBuilder, TreeHashExecutor};
use crate::xmss::wots_plus::{OneTimeSignatureProvider, SeedRef, WOTSPlus};
use crate::xmss::{IntegrityError, Result};

pub struct XMSSPrivateKey {
    public_key: XMSSPublicKey,
    private_seed: Zeroizing<Vec<u8>>,
    prf_key: Zeroizing<Vec<u8>>,
    leaf_counter: LeafCounter,
    ots: Arc<dyn OneTimeSignatureProvider>,
    executor: TreeHashExecutor,
}

impl XMSSPrivateKey {
    /// Draws fresh seeds from `rng`, computes the full tree root and registers
    /// the key's identity with the context's registry.
    pub fn generate(
        params: &XMSSParams,
        rng: &mut dyn SecureRandom,
        context: &XMSSContext,
    ) -> Result<Self> {
        Self::generate_with(params, rng, context, default_provider(params))
    }

    /// [`generate`](Self::generate) with a caller-supplied one-time signature
    /// provider. The key keeps using `ots` for signing.
    pub fn generate_with(
        params: &XMSSParams,
        rng: &mut dyn SecureRandom,
        context: &XMSSContext,
        ots: Arc<dyn OneTimeSignatureProvider>,
    ) -> Result<Self> {
        let n = params.element_size();
        let private_seed = Zeroizing::new(rng.random_bytes(n));
        let prf_key = Zeroizing::new(rng.random_bytes(n));
        let public_seed = rng.random_bytes(n);

        let seeds = SeedRef { private_seed: &private_seed, public_seed: &public_seed };
        let root = TreeBuilder::new(params, &*ots, seeds, context.executor()).subtree_root(
            0,
            params.tree_height(),
            &Address::new(),
        )?;
        let public_key = XMSSPublicKey::new(*params, root, public_seed)?;

        let identity = KeyIdentity::derive(&private_seed, &prf_key);
        let leaf_counter = context.registry().counter(identity);
        debug!(%identity, oid = params.oid(), height = params.tree_height(), "generated XMSS key");

        Ok(XMSSPrivateKey {
            public_key,
            private_seed,
            prf_key,
            leaf_counter,
            ots,
            executor: context.executor().clone(),
        })
    }

    /// Parses the raw layout.
    ///
    /// The embedded root is trusted; call [`verify_root`](Self::verify_root)
    /// to check it against the secret seeds. If the embedded leaf index is
    /// ahead of the registry's counter for this identity, the counter is
    /// raised to it; it is never lowered.
    pub fn from_bytes(bytes: &[u8], params: &XMSSParams, context: &XMSSContext) -> Result<Self> {
        Self::from_bytes_with(bytes, params, context, default_provider(params))
    }

    /// [`from_bytes`](Self::from_bytes) with a caller-supplied one-time
    /// signature provider.
    pub fn from_bytes_with(
        bytes: &[u8],
        params: &XMSSParams,
        context: &XMSSContext,
        ots: Arc<dyn OneTimeSignatureProvider>,
    ) -> Result<Self> {
        let expected = params.private_key_size();
        if bytes.len() != expected {
            return Err(IntegrityError::PrivateKeySize { expected, actual: bytes.len() }.into());
        }

        let n = params.element_size();
        let (public_bytes, rest) = bytes.split_at(params.public_key_size());
        let (index_bytes, rest) = rest.split_at(8);
        let (prf_key, private_seed) = rest.split_at(n);

        let public_key = XMSSPublicKey::from_bytes(public_bytes, params)?;

        let mut index = [0u8; 8];
        index.copy_from_slice(index_bytes);
        let unused_leaf = u64::from_be_bytes(index);
        let limit = params.leaf_limit();
        if unused_leaf >= limit {
            return Err(IntegrityError::LeafIndexOutOfRange { index: unused_leaf, limit }.into());
        }

        let private_seed = Zeroizing::new(private_seed.to_vec());
        let prf_key = Zeroizing::new(prf_key.to_vec());
        let identity = KeyIdentity::derive(&private_seed, &prf_key);
        let leaf_counter = context.registry().counter(identity);
        let previous = leaf_counter.advance_to(unused_leaf);
        debug!(
            %identity,
            unused_leaf,
            registry_index = previous.max(unused_leaf),
            "loaded XMSS key"
        );

        Ok(XMSSPrivateKey {
            public_key,
            private_seed,
            prf_key,
            leaf_counter,
            ots,
            executor: context.executor().clone(),
        })
    }

    /// Inverse of [`from_bytes`](Self::from_bytes), written with the current
    /// shared leaf index.
    pub fn to_bytes(&self) -> Zeroizing<Vec<u8>> {
        let mut bytes = Zeroizing::new(Vec::with_capacity(self.params().private_key_size()));
        bytes.extend_from_slice(&self.public_key.to_bytes());
        bytes.extend_from_slice(&self.unused_leaf_index().to_be_bytes());
        bytes.extend_from_slice(&self.prf_key);
        bytes.extend_from_slice(&self.private_seed);
        bytes
    }

    /// Signs `message` with the next unused leaf.
    ///
    /// Fails with `LeafExhausted` once all `2^(h-1)` leaves are spent. Any
    /// other failure happens after the leaf was reserved and still burns it.
    pub fn sign(&self, message: &[u8]) -> Result<XMSSSignature> {
        let index = self.leaf_counter.reserve(self.params().leaf_limit())?;
        debug!(identity = %self.identity(), leaf = index, "reserved XMSS leaf");

        self.produce(index, message).map_err(|err| {
            warn!(
                identity = %self.identity(),
                leaf = index,
                %err,
                "signing failed, leaf stays consumed"
            );
            err
        })
    }

    fn produce(&self, index: u64, message: &[u8]) -> Result<XMSSSignature> {
        let hash = self.params().hasher();
        let randomness = hash.prf(&self.prf_key, &to_byte(index, 32));
        let digest = hash.message_digest(&randomness, self.public_key.root(), index, message);

        let adrs = Address::new();
        let auth_path = self.tree_builder().auth_path(index, &adrs)?;

        let mut ots_adrs = adrs;
        ots_adrs.set_type(AddressType::Ots);
        ots_adrs.set_ots_address(index as u32);
        let wots_signature = self.ots.sign(self.seeds(), &mut ots_adrs, &digest, &hash)?;

        Ok(XMSSSignature::new(index, randomness, wots_signature, auth_path))
    }

    /// Recomputes the root from the secret seeds and compares it with the
    /// stored public root.
    pub fn verify_root(&self) -> Result<bool> {
        let root = self
            .tree_builder()
            .subtree_root(0, self.params().tree_height(), &Address::new())?;
        Ok(root == self.public_key.root())
    }

    pub fn tree_builder(&self) -> TreeBuilder<'_> {
        TreeBuilder::new(self.params(), &*self.ots, self.seeds(), &self.executor)
    }

    pub fn public_key(&self) -> &XMSSPublicKey {
        &self.public_key
    }

    pub fn params(&self) -> &XMSSParams {
        self.public_key.params()
    }

    pub fn identity(&self) -> KeyIdentity {
        self.leaf_counter.identity()
    }

    /// Next leaf index the shared counter will hand out.
    pub fn unused_leaf_index(&self) -> u64 {
        self.leaf_counter.current()
    }

    pub fn remaining_signatures(&self) -> u64 {
        self.params().leaf_limit().saturating_sub(self.unused_leaf_index())
    }

    fn seeds(&self) -> SeedRef<'_> {
        SeedRef { private_seed: &self.private_seed, public_seed: self.public_key.public_seed() }
    }
}

fn default_provider(params: &XMSSParams) -> Arc<dyn OneTimeSignatureProvider> {
    Arc::new(WOTSPlus::new(*params.wots()))
}

impl fmt::Debug for XMSSPrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("XMSSPrivateKey")
            .field("public_key", &self.public_key)
            .field("identity", &self.identity())
            .field("unused_leaf_index", &self.unused_leaf_index())
            .finish_non_exhaustive()
    }
}
