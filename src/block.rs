//! Fixed-capacity symbol blocks.

use crate::statistics::{Statistics, ALPHABET_SIZE};

/// Fixed-capacity window of symbols processed as one unit.
///
/// A block holds exactly `size = 2^sigma` slots; the first `length` carry
/// message content and the tail stays zero. The zero tail is load-bearing:
/// statistics count padding under value 0, and the numeration engine ranks
/// the complete padded arrangement, so the tail must never hold stale data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    sigma: u32,
    size: usize,
    length: usize,
    chars: Vec<u8>,
}

impl Block {
    /// Creates an empty block of `2^sigma` zeroed slots.
    pub fn new(sigma: u32) -> Self {
        let size = 1usize << sigma;
        Block {
            sigma,
            size,
            length: 0,
            chars: vec![0; size],
        }
    }

    /// Block size exponent.
    pub fn sigma(&self) -> u32 {
        self.sigma
    }

    /// Slot capacity, `2^sigma`.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of content symbols; the rest is padding.
    pub fn length(&self) -> usize {
        self.length
    }

    /// All `size` slots, the zero tail included.
    pub fn chars(&self) -> &[u8] {
        &self.chars
    }

    /// Content symbols only, padding excluded.
    pub fn content(&self) -> &[u8] {
        &self.chars[..self.length]
    }

    /// Replaces the content with `bytes` and zero-fills the tail.
    ///
    /// # Panics
    /// Panics if `bytes` exceeds the block capacity.
    pub fn fill(&mut self, bytes: &[u8]) {
        assert!(bytes.len() <= self.size, "content exceeds block capacity");
        self.chars.fill(0);
        self.chars[..bytes.len()].copy_from_slice(bytes);
        self.length = bytes.len();
    }

    /// Zero-fills every slot and resets the length.
    pub(crate) fn clear(&mut self) {
        self.chars.fill(0);
        self.length = 0;
    }

    pub(crate) fn chars_mut(&mut self) -> &mut [u8] {
        &mut self.chars
    }

    pub(crate) fn set_length(&mut self, length: usize) {
        self.length = length;
    }

    /// Regenerates the canonical arrangement described by `statistics`:
    /// every value-0 symbol first, then value 1, ascending.
    ///
    /// Both ends derive identical rho seeds from this arrangement, so the
    /// symbol order itself never has to be transmitted — only the counts.
    pub fn generate(&mut self, statistics: &Statistics) {
        self.chars.fill(0);
        self.length = 0;
        for value in 0..ALPHABET_SIZE {
            for _ in 0..statistics.count(value) {
                self.chars[self.length] = value as u8;
                self.length += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_block_is_zeroed() {
        let block = Block::new(3);
        assert_eq!(block.size(), 8);
        assert_eq!(block.length(), 0);
        assert!(block.chars().iter().all(|&c| c == 0));
    }

    #[test]
    fn test_fill_zero_pads_tail() {
        let mut block = Block::new(3);
        block.fill(b"abc");
        assert_eq!(block.length(), 3);
        assert_eq!(block.content(), b"abc");
        assert_eq!(&block.chars()[3..], &[0, 0, 0, 0, 0]);

        // Refilling with shorter content must not leave stale symbols.
        block.fill(b"z");
        assert_eq!(block.content(), b"z");
        assert!(block.chars()[1..].iter().all(|&c| c == 0));
    }

    #[test]
    #[should_panic(expected = "content exceeds block capacity")]
    fn test_fill_rejects_oversized_content() {
        let mut block = Block::new(1);
        block.fill(b"abc");
    }

    #[test]
    fn test_generate_sorts_ascending() {
        let mut block = Block::new(2);
        block.fill(&[3, 1, 3, 1]);
        let statistics = Statistics::gather(&block);

        let mut canonical = Block::new(2);
        canonical.generate(&statistics);
        assert_eq!(canonical.chars(), &[1, 1, 3, 3]);
        assert_eq!(canonical.length(), 4);
    }

    #[test]
    fn test_generate_places_padding_first() {
        // Padding counts as value 0, so it leads the canonical arrangement.
        let mut block = Block::new(2);
        block.fill(&[7, 7]);
        let statistics = Statistics::gather(&block);

        let mut canonical = Block::new(2);
        canonical.generate(&statistics);
        assert_eq!(canonical.chars(), &[0, 0, 7, 7]);
        assert_eq!(canonical.length(), 4);
    }
}
