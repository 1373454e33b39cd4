//! Repeating-key XOR over serialized bit data.

use crate::bits::{self, BitCursor, BITS_IN_BYTE};
use crate::error::{EnumcryptError, Result};
use crate::serializer::SData;

/// The user's key bytes plus a persistent cyclic MSB-first bit cursor.
///
/// The cursor survives across calls, so consecutive fields draw consecutive
/// key bits and the key stream repeats indefinitely. One `Key` lives for
/// one encrypt or decrypt invocation; both ends must feed their fields
/// through in the same order to stay in step. Key material is zeroized on
/// drop.
pub struct Key {
    bytes: Vec<u8>,
    cursor: BitCursor,
}

impl Key {
    /// Copies the key material and parks the cursor at its first bit.
    ///
    /// # Errors
    /// [`EnumcryptError::KeyEmpty`] if `key_data` is empty.
    pub fn new(key_data: &[u8]) -> Result<Self> {
        if key_data.is_empty() {
            return Err(EnumcryptError::KeyEmpty);
        }
        Ok(Key {
            bytes: key_data.to_vec(),
            cursor: BitCursor::msb_start(),
        })
    }

    /// XORs `data` in place against the key bit stream, consuming exactly
    /// `data.bits_number()` key bits. The final partial byte is XORed only
    /// on its defined bit count; bits beyond it are left untouched. XOR is
    /// self-inverse, so the same walk serves encryption and decryption.
    pub fn apply(&mut self, data: &mut SData) {
        let bits_number = data.bits_number();
        let bytes_number = bits::bytes_for_bits(bits_number);
        for i in 0..bytes_number {
            let mut bits_in_byte = BITS_IN_BYTE;
            if i == bytes_number - 1 {
                bits_in_byte = bits_number - BITS_IN_BYTE * i;
            }
            let key_byte = self.next_byte(bits_in_byte);
            data.bytes_mut()[i] ^= key_byte;
        }
    }

    /// Assembles `bits_number` key bits, most significant first, into the
    /// low positions of one byte.
    fn next_byte(&mut self, bits_number: usize) -> u8 {
        let mut byte = 0u8;
        for i in (0..bits_number).rev() {
            let bit = bits::byte_bit_get(self.bytes[self.cursor.byte], self.cursor.bit);
            byte |= bit << i;
            self.cursor.ms_inc_cyc(self.bytes.len());
        }
        byte
    }
}

impl Drop for Key {
    fn drop(&mut self) {
        for byte in self.bytes.iter_mut() {
            *byte = 0;
        }
    }
}
