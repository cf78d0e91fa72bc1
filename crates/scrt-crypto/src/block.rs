//! 128-bit blocks and the GF(2^128) doubling used by S2V

use zeroize::{Zeroize, ZeroizeOnDrop};

pub const BLOCK_SIZE: usize = 16;

/// Low byte of the reduction polynomial x^128 + x^7 + x^2 + x + 1
const R: u8 = 0x87;

/// A single AES block. Zeroized on drop.
#[derive(Clone, Default, Zeroize, ZeroizeOnDrop)]
pub struct Block([u8; BLOCK_SIZE]);

impl Block {
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn from_bytes(bytes: [u8; BLOCK_SIZE]) -> Self {
        Self(bytes)
    }

    /// Copy a block out of a slice. `src` must be exactly one block long.
    pub(crate) fn from_slice(src: &[u8]) -> Self {
        let mut block = Self::zero();
        block.0.copy_from_slice(src);
        block
    }

    /// A short final S2V input: the bytes followed by `0x80` and zero fill.
    /// `src` must be shorter than one block.
    pub(crate) fn padded(src: &[u8]) -> Self {
        debug_assert!(src.len() < BLOCK_SIZE);
        let mut block = Self::zero();
        block.0[..src.len()].copy_from_slice(src);
        block.0[src.len()] = 0x80;
        block
    }

    pub fn as_bytes(&self) -> &[u8; BLOCK_SIZE] {
        &self.0
    }

    pub(crate) fn as_mut_bytes(&mut self) -> &mut [u8; BLOCK_SIZE] {
        &mut self.0
    }

    /// Multiply by x in GF(2^128), big-endian bit order.
    pub fn dbl(&mut self) {
        let carry = self.0[0] >> 7;
        for i in 0..BLOCK_SIZE - 1 {
            self.0[i] = (self.0[i] << 1) | (self.0[i + 1] >> 7);
        }
        // branch-free: mask is 0xFF when the top bit was set
        self.0[BLOCK_SIZE - 1] = (self.0[BLOCK_SIZE - 1] << 1) ^ (R & 0u8.wrapping_sub(carry));
    }

    pub fn xor(&mut self, other: &Block) {
        for (a, b) in self.0.iter_mut().zip(other.0.iter()) {
            *a ^= b;
        }
    }
}

impl std::fmt::Debug for Block {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Block").field(&"[REDACTED]").finish()
    }
}
