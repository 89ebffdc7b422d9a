use tracing::debug;

use crate::xmss::address::{Address, AddressType};
use crate::xmss::hash::check_len;
use crate::xmss::params::XMSSParams;
use crate::xmss::signature::XMSSSignature;
use crate::xmss::wots_plus::{OneTimeSignatureProvider, WOTSPlus};
use crate::xmss::{IntegrityError, Node, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XMSSPublicKey {
    params: XMSSParams,
    root: Node,
    public_seed: Vec<u8>,
}

impl XMSSPublicKey {
    pub fn new(params: XMSSParams, root: Node, public_seed: Vec<u8>) -> Result<Self> {
        check_len("root", &root, params.element_size())?;
        check_len("public seed", &public_seed, params.element_size())?;
        Ok(XMSSPublicKey { params, root, public_seed })
    }

    pub fn params(&self) -> &XMSSParams {
        &self.params
    }

    pub fn root(&self) -> &[u8] {
        &self.root
    }

    pub fn public_seed(&self) -> &[u8] {
        &self.public_seed
    }

    /// `oid (4, big-endian) || root || public_seed`
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.params.public_key_size());
        bytes.extend_from_slice(&self.params.oid().to_be_bytes());
        bytes.extend_from_slice(&self.root);
        bytes.extend_from_slice(&self.public_seed);
        bytes
    }

    pub fn from_bytes(bytes: &[u8], params: &XMSSParams) -> Result<Self> {
        let expected = params.public_key_size();
        if bytes.len() != expected {
            return Err(IntegrityError::PublicKeySize { expected, actual: bytes.len() }.into());
        }

        let mut oid = [0u8; 4];
        oid.copy_from_slice(&bytes[..4]);
        let found = u32::from_be_bytes(oid);
        if found != params.oid() {
            return Err(IntegrityError::AlgorithmMismatch { expected: params.oid(), found }.into());
        }

        let n = params.element_size();
        Self::new(*params, bytes[4..4 + n].to_vec(), bytes[4 + n..].to_vec())
    }

    pub fn verify(&self, message: &[u8], signature: &XMSSSignature) -> bool {
        self.verify_with(&WOTSPlus::new(*self.params.wots()), message, signature)
    }

    pub fn verify_with(
        &self,
        ots: &dyn OneTimeSignatureProvider,
        message: &[u8],
        signature: &XMSSSignature,
    ) -> bool {
        match self.recompute_root(ots, message, signature) {
            Ok(root) => root == self.root,
            Err(err) => {
                debug!(leaf = signature.leaf_index(), %err, "rejecting malformed XMSS signature");
                false
            }
        }
    }

    /// Root implied by `signature` over `message`.
    pub fn recompute_root(
        &self,
        ots: &dyn OneTimeSignatureProvider,
        message: &[u8],
        signature: &XMSSSignature,
    ) -> Result<Node> {
        let index = signature.leaf_index();
        let height = self.params.tree_height();
        if index >= self.params.leaf_count() {
            let limit = self.params.leaf_count();
            return Err(IntegrityError::LeafIndexOutOfRange { index, limit }.into());
        }
        if signature.auth_path().len() != height {
            return Err(IntegrityError::AuthPathLength {
                expected: height,
                actual: signature.auth_path().len(),
            }
            .into());
        }
        check_len("signature randomness", signature.randomness(), self.params.element_size())?;

        let hash = self.params.hasher();
        let digest = hash.message_digest(signature.randomness(), &self.root, index, message);

        let mut adrs = Address::new();
        adrs.set_type(AddressType::Ots);
        adrs.set_ots_address(index as u32);
        let ots_public_key = ots.public_key_from_signature(
            signature.wots_signature(),
            &digest,
            &mut adrs,
            &self.public_seed,
            &hash,
        )?;

        adrs.set_type(AddressType::LTree);
        adrs.set_ltree_address(index as u32);
        let leaf = ots.compress_to_leaf(&ots_public_key, &mut adrs, &self.public_seed, &hash)?;

        signature
            .auth_path()
            .compute_root(&leaf, index, &Address::new(), &self.public_seed, &hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::hash::HashFamily;
    use crate::xmss::params::XMSSAlgorithm;
    use crate::xmss::XMSSError;

    #[test]
    fn raw_layout_carries_oid() {
        let params = XMSSParams::new(XMSSAlgorithm::Sha2_10_256);
        let key = XMSSPublicKey::new(params, vec![1; 32], vec![2; 32]).unwrap();
        let bytes = key.to_bytes();
        assert_eq!(&bytes[..4], &[0, 0, 0, 1]);
        assert_eq!(XMSSPublicKey::from_bytes(&bytes, &params).unwrap(), key);
    }

    #[test]
    fn oid_mismatch_is_rejected() {
        let params = XMSSParams::new(XMSSAlgorithm::Sha2_10_256);
        let other = XMSSParams::new(XMSSAlgorithm::Shake10_256);
        let bytes = XMSSPublicKey::new(params, vec![1; 32], vec![2; 32]).unwrap().to_bytes();
        assert!(matches!(
            XMSSPublicKey::from_bytes(&bytes, &other),
            Err(XMSSError::IntegrityFailure(IntegrityError::AlgorithmMismatch {
                expected: 7,
                found: 1
            }))
        ));
    }

    #[test]
    fn wrong_root_size_is_rejected() {
        let params = XMSSParams::custom(HashFamily::Sha2, 64, 4).unwrap();
        assert!(XMSSPublicKey::new(params, vec![1; 32], vec![2; 64]).is_err());
    }
}
