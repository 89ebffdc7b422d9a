use crate::xmss::params::XMSSParams;
use crate::xmss::tree::AuthPath;
use crate::xmss::wots_plus::WotsSignature;
use crate::xmss::{IntegrityError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XMSSSignature {
    leaf_index: u64,
    randomness: Vec<u8>,
    wots_signature: WotsSignature,
    auth_path: AuthPath,
}

impl XMSSSignature {
    pub fn new(
        leaf_index: u64,
        randomness: Vec<u8>,
        wots_signature: WotsSignature,
        auth_path: AuthPath,
    ) -> Self {
        XMSSSignature {
            leaf_index,
            randomness,
            wots_signature,
            auth_path,
        }
    }

    pub fn leaf_index(&self) -> u64 {
        self.leaf_index
    }

    pub fn randomness(&self) -> &[u8] {
        &self.randomness
    }

    pub fn wots_signature(&self) -> &WotsSignature {
        &self.wots_signature
    }

    pub fn auth_path(&self) -> &AuthPath {
        &self.auth_path
    }

    /// `idx (4, big-endian) || r || ots chains || auth path`
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::new();

        bytes.extend_from_slice(&(self.leaf_index as u32).to_be_bytes());
        bytes.extend_from_slice(&self.randomness);

        for chain in self.wots_signature.chains() {
            bytes.extend_from_slice(chain);
        }

        for node in self.auth_path.nodes() {
            bytes.extend_from_slice(node);
        }

        bytes
    }

    pub fn from_bytes(bytes: &[u8], params: &XMSSParams) -> Result<Self> {
        let expected = params.signature_size();
        if bytes.len() != expected {
            return Err(IntegrityError::SignatureSize { expected, actual: bytes.len() }.into());
        }

        let n = params.element_size();
        let mut index = [0u8; 4];
        index.copy_from_slice(&bytes[..4]);
        let leaf_index = u64::from(u32::from_be_bytes(index));

        let randomness = bytes[4..4 + n].to_vec();

        let mut nodes = bytes[4 + n..].chunks_exact(n).map(<[u8]>::to_vec);
        let wots_chains: Vec<_> = nodes.by_ref().take(params.wots().len()).collect();
        let auth_nodes: Vec<_> = nodes.collect();

        Ok(XMSSSignature {
            leaf_index,
            randomness,
            wots_signature: WotsSignature::from_chains(wots_chains),
            auth_path: AuthPath::new(auth_nodes),
        })
    }
}
