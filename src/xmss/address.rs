//! Hash addresses (RFC 8391 section 2.5).
//!
//! Every keyed hash and PRF call is domain separated by a 32-byte address:
//!
//! ```text
//!   [0:4]   layer address
//!   [4:12]  tree address
//!   [12:16] type (0 = OTS, 1 = L-tree, 2 = hash tree)
//!   [16:20] OTS address / L-tree address / padding
//!   [20:24] chain address / tree height
//!   [24:28] hash address / tree index
//!   [28:32] key-and-mask
//! ```

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum AddressType {
    Ots = 0,
    LTree = 1,
    HashTree = 2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Address {
    bytes: [u8; 32],
}

impl Address {
    pub const SIZE: usize = 32;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_layer_address(&mut self, layer: u32) {
        self.write(0, layer);
    }

    pub fn set_tree_address(&mut self, tree: u64) {
        self.bytes[4..12].copy_from_slice(&tree.to_be_bytes());
    }

    /// Changing the type clears every type-specific word.
    pub fn set_type(&mut self, address_type: AddressType) {
        self.write(12, address_type as u32);
        self.bytes[16..32].fill(0);
    }

    pub fn address_type(&self) -> u32 {
        self.read(12)
    }

    pub fn set_ots_address(&mut self, leaf: u32) {
        self.write(16, leaf);
    }

    pub fn set_ltree_address(&mut self, leaf: u32) {
        self.write(16, leaf);
    }

    pub fn set_chain_address(&mut self, chain: u32) {
        self.write(20, chain);
    }

    pub fn set_hash_address(&mut self, step: u32) {
        self.write(24, step);
    }

    pub fn set_tree_height(&mut self, height: u32) {
        self.write(20, height);
    }

    pub fn tree_height(&self) -> u32 {
        self.read(20)
    }

    pub fn set_tree_index(&mut self, index: u32) {
        self.write(24, index);
    }

    pub fn tree_index(&self) -> u32 {
        self.read(24)
    }

    pub fn set_key_and_mask(&mut self, value: u32) {
        self.write(28, value);
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }

    fn write(&mut self, offset: usize, value: u32) {
        self.bytes[offset..offset + 4].copy_from_slice(&value.to_be_bytes());
    }

    fn read(&self, offset: usize) -> u32 {
        let mut word = [0u8; 4];
        word.copy_from_slice(&self.bytes[offset..offset + 4]);
        u32::from_be_bytes(word)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_type_clears_type_specific_words() {
        let mut adrs = Address::new();
        adrs.set_layer_address(3);
        adrs.set_tree_address(0x0102_0304_0506_0708);
        adrs.set_type(AddressType::Ots);
        adrs.set_ots_address(9);
        adrs.set_chain_address(4);
        adrs.set_key_and_mask(1);

        adrs.set_type(AddressType::HashTree);

        assert_eq!(adrs.address_type(), 2);
        assert_eq!(adrs.tree_height(), 0);
        assert_eq!(adrs.tree_index(), 0);
        assert_eq!(&adrs.as_bytes()[16..32], &[0u8; 16]);
        assert_eq!(&adrs.as_bytes()[0..4], &3u32.to_be_bytes());
        assert_eq!(&adrs.as_bytes()[4..12], &0x0102_0304_0506_0708u64.to_be_bytes());
    }

    #[test]
    fn tree_fields_round_trip() {
        let mut adrs = Address::new();
        adrs.set_type(AddressType::HashTree);
        adrs.set_tree_height(7);
        adrs.set_tree_index(0xdead);
        assert_eq!(adrs.tree_height(), 7);
        assert_eq!(adrs.tree_index(), 0xdead);
    }
}
