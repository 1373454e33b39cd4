//! Bit-exact field codecs for the wire format.
//!
//! Three field kinds exist: statistics (256 fields of `sigma + 1` bits,
//! MSB-first), subset (one field of `sigma + 4` bits behind an LSB-first
//! cursor) and the subnumber residue (a little-endian byte export truncated
//! to its exact bit width). The statistics/subset bit-order asymmetry is
//! part of the wire format and must be reproduced exactly.

use num_bigint::BigUint;
use num_traits::Zero;

use crate::bits::{self, BitCursor};
use crate::error::Result;
use crate::statistics::{Statistics, ALPHABET_SIZE};

/// A byte buffer paired with its exact bit length.
///
/// Bit lengths are not generally multiples of 8; unused high positions of
/// the final byte stay zero. This is the atomic unit moved between the
/// serializer, the bit file layer and the keystream cipher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SData {
    bytes: Vec<u8>,
    bits_number: usize,
}

impl SData {
    /// Wraps an existing buffer.
    ///
    /// # Panics
    /// Panics if `bytes` is not exactly the number of bytes needed to hold
    /// `bits_number` bits.
    pub fn new(bytes: Vec<u8>, bits_number: usize) -> Self {
        assert!(
            bytes.len() == bits::bytes_for_bits(bits_number),
            "buffer length disagrees with the bit count"
        );
        SData { bytes, bits_number }
    }

    /// A zeroed buffer sized for `bits_number` bits.
    pub(crate) fn with_bits(bits_number: usize) -> Self {
        SData {
            bytes: vec![0; bits::bytes_for_bits(bits_number)],
            bits_number,
        }
    }

    /// Exact bit length of the payload.
    pub fn bits_number(&self) -> usize {
        self.bits_number
    }

    /// Backing bytes; the last may be partially filled.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub(crate) fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }
}

/// Packs statistics as 256 fields of `sigma + 1` bits each, MSB-first, in
/// ascending symbol-value order. Padding is subtracted out of the value-0
/// count before packing: the wire describes genuine content only.
pub fn statistics_serialize(statistics: &Statistics, sigma: u32) -> SData {
    let item_size = sigma as usize + 1;
    let mut data = SData::with_bits(item_size * ALPHABET_SIZE);
    let mut cursor = BitCursor::msb_start();
    for value in 0..ALPHABET_SIZE {
        let mut count = statistics.count(value);
        if value == 0 {
            count -= statistics.padding() as u32;
        }
        for j in (0..item_size).rev() {
            let bit = bits::bit_get(count, j);
            data.bytes[cursor.byte] = bits::byte_bit_set(data.bytes[cursor.byte], cursor.bit, bit);
            cursor.ms_inc();
        }
    }
    data
}

/// Exact inverse of [`statistics_serialize`]; re-derives the padding from
/// the received counts and folds it back into the value-0 slot.
pub fn statistics_deserialize(data: &SData, sigma: u32) -> Result<Statistics> {
    let item_size = sigma as usize + 1;
    let mut cursor = BitCursor::msb_start();
    let mut stats = [0u32; ALPHABET_SIZE];
    for slot in stats.iter_mut() {
        for j in (0..item_size).rev() {
            let bit = bits::byte_bit_get(data.bytes[cursor.byte], cursor.bit);
            *slot = bits::bit_set(*slot, j, bit);
            cursor.ms_inc();
        }
    }
    let mut statistics = Statistics::from_counts(stats);
    statistics.eval_padding(sigma)?;
    Ok(statistics)
}

/// Packs the subset count as one field of `sigma + 4` bits.
///
/// The value's bits are taken high-to-low but laid down behind an LSB-first
/// cursor — the opposite byte-filling order from every other field. The
/// asymmetry is intentional and interoperability-critical.
pub fn subset_serialize(subset: u32, sigma: u32) -> SData {
    let mut data = SData::with_bits(sigma as usize + 4);
    let mut cursor = BitCursor::lsb_start();
    for i in (0..data.bits_number).rev() {
        let bit = bits::bit_get(subset, i);
        data.bytes[cursor.byte] = bits::byte_bit_set(data.bytes[cursor.byte], cursor.bit, bit);
        cursor.ls_inc();
    }
    data
}

/// Exact inverse of [`subset_serialize`].
pub fn subset_deserialize(data: &SData) -> u32 {
    let mut cursor = BitCursor::lsb_start();
    let mut subset = 0u32;
    for i in (0..data.bits_number).rev() {
        let bit = bits::byte_bit_get(data.bytes[cursor.byte], cursor.bit);
        subset = bits::bit_set(subset, i, bit);
        cursor.ls_inc();
    }
    subset
}

/// Exports `value` as exactly `bits_number` bits, least-significant byte
/// first. The caller guarantees `value < 2^bits_number`.
pub fn biguint_serialize(value: &BigUint, bits_number: usize) -> SData {
    let mut data = SData::with_bits(bits_number);
    if !value.is_zero() {
        let bytes = value.to_bytes_le();
        data.bytes[..bytes.len()].copy_from_slice(&bytes);
    }
    data
}

/// Exact inverse of [`biguint_serialize`].
pub fn biguint_deserialize(data: &SData) -> BigUint {
    BigUint::from_bytes_le(&data.bytes)
}
