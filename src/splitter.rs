//! Context-based message splitter.
//!
//! Buckets message bytes by the `mu` bytes that precede them, producing one
//! independently-ranked sub-stream per distinct context window. Sources are
//! keyed by their window prefix in an ordered map, with the first-created
//! source remembered so the message's opening window survives the trip: on
//! merge it seeds the reconstruction and every later position consumes the
//! next symbol of the source its own trailing window selects.

use std::collections::BTreeMap;

use crate::bits::{self, BitCursor, BITS_IN_BYTE};
use crate::block::Block;
use crate::error::{EnumcryptError, Result};
use crate::io::BlockRead;
use crate::serializer::SData;

/// One context-keyed sub-stream of the message.
pub struct Source {
    prefix: Vec<u8>,
    chars: Vec<u8>,
    cursor: usize,
}

impl Source {
    /// Creates an empty source for the given context window.
    pub(crate) fn with_prefix(prefix: Vec<u8>) -> Self {
        Source {
            prefix,
            chars: Vec::new(),
            cursor: 0,
        }
    }

    /// The context window this source is keyed by.
    pub fn prefix(&self) -> &[u8] {
        &self.prefix
    }

    /// Number of symbols bucketed into this source.
    pub fn len(&self) -> usize {
        self.chars.len()
    }

    /// Whether the source holds no symbols.
    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub(crate) fn push(&mut self, ch: u8) {
        self.chars.push(ch);
    }

    /// Next unconsumed symbol, advancing the merge cursor.
    fn next_char(&mut self) -> Option<u8> {
        let ch = self.chars.get(self.cursor).copied();
        if ch.is_some() {
            self.cursor += 1;
        }
        ch
    }

    /// Appends a decoded block's content symbols.
    pub(crate) fn append_block(&mut self, block: &Block) {
        self.chars.extend_from_slice(block.content());
    }

    /// Copies up to one block of this source's symbols starting at `offset`.
    ///
    /// The final symbol is always reserved — it travels in the source-info
    /// header instead — so a source's last block is short, possibly empty,
    /// and a lone-symbol source skips numeration entirely.
    pub fn block_from_source(&self, block: &mut Block, offset: usize) -> BlockRead {
        let remaining = self.chars.len() - offset;
        let count = if remaining <= block.size() {
            remaining.saturating_sub(1)
        } else {
            block.size()
        };
        block.fill(&self.chars[offset..offset + count]);
        if count < block.size() {
            BlockRead::Final
        } else {
            BlockRead::Full
        }
    }

    /// Serializes the source header: the prefix bytes, the reserved final
    /// symbol, then the symbol count as 32 bits in ascending bit-index
    /// order behind the MSB-first cursor.
    pub(crate) fn info_serialize(&self) -> Result<SData> {
        let mu = self.prefix.len();
        let length =
            u32::try_from(self.chars.len()).map_err(|_| EnumcryptError::MessageTooLong)?;
        let mut data = SData::with_bits((mu + 1 + 4) * BITS_IN_BYTE);
        let bytes = data.bytes_mut();
        bytes[..mu].copy_from_slice(&self.prefix);
        bytes[mu] = *self.chars.last().expect("source has no symbols");
        let mut cursor = BitCursor {
            byte: mu + 1,
            bit: BITS_IN_BYTE - 1,
        };
        for i in 0..4 * BITS_IN_BYTE {
            let bit = bits::bit_get(length, i);
            bytes[cursor.byte] = bits::byte_bit_set(bytes[cursor.byte], cursor.bit, bit);
            cursor.ms_inc();
        }
        Ok(data)
    }
}

/// Exact inverse of [`Source::info_serialize`]: yields the prefix, the
/// reserved final symbol and the declared symbol count.
pub(crate) fn info_deserialize(data: &SData, mu: usize) -> (Vec<u8>, u8, u32) {
    let prefix = data.bytes()[..mu].to_vec();
    let last_char = data.bytes()[mu];
    let mut cursor = BitCursor {
        byte: mu + 1,
        bit: BITS_IN_BYTE - 1,
    };
    let mut length = 0u32;
    for i in 0..4 * BITS_IN_BYTE {
        let bit = bits::byte_bit_get(data.bytes()[cursor.byte], cursor.bit);
        length = bits::bit_set(length, i, bit);
        cursor.ms_inc();
    }
    (prefix, last_char, length)
}

/// Ordered collection of sources for one message.
pub struct SourceList {
    mu: usize,
    first_prefix: Option<Vec<u8>>,
    sources: BTreeMap<Vec<u8>, Source>,
}

impl SourceList {
    /// Creates an empty list for context windows of `mu` bytes.
    pub fn new(mu: usize) -> Self {
        SourceList {
            mu,
            first_prefix: None,
            sources: BTreeMap::new(),
        }
    }

    /// Splits `message` into context-keyed sources: every position past the
    /// opening window appends its byte to the source keyed by the `mu`
    /// bytes before it.
    ///
    /// # Errors
    /// [`EnumcryptError::MessageTooShort`] if the message cannot carry even
    /// one context window.
    pub fn split(message: &[u8], mu: usize) -> Result<SourceList> {
        if message.len() < mu + 1 {
            return Err(EnumcryptError::MessageTooShort {
                length: message.len(),
                mu,
            });
        }
        let mut list = SourceList::new(mu);
        for i in 0..message.len() - mu {
            let window = &message[i..i + mu];
            if list.first_prefix.is_none() {
                list.first_prefix = Some(window.to_vec());
            }
            list.sources
                .entry(window.to_vec())
                .or_insert_with(|| Source::with_prefix(window.to_vec()))
                .push(message[i + mu]);
        }
        Ok(list)
    }

    /// Inserts a reconstructed source; the first insertion becomes the
    /// first source (decode side).
    pub(crate) fn insert(&mut self, source: Source) {
        if self.first_prefix.is_none() {
            self.first_prefix = Some(source.prefix.clone());
        }
        self.sources.insert(source.prefix.clone(), source);
    }

    /// Number of distinct sources.
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Whether the list holds no sources.
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Total reconstructed message length: the opening window plus every
    /// source's symbols.
    pub fn message_length(&self) -> usize {
        self.mu + self.sources.values().map(Source::len).sum::<usize>()
    }

    /// Yields the first-created source, then the rest ascending by prefix.
    /// This order is the wire order.
    pub(crate) fn iter(&self) -> impl Iterator<Item = &Source> {
        let first_prefix = self.first_prefix.clone();
        let first = first_prefix
            .as_ref()
            .and_then(|prefix| self.sources.get(prefix));
        first.into_iter().chain(
            self.sources
                .iter()
                .filter(move |(prefix, _)| Some(prefix.as_slice()) != first_prefix.as_deref())
                .map(|(_, source)| source),
        )
    }

    /// Reassembles the message: the first source's prefix seeds the window,
    /// then every position consumes the next symbol of the source keyed by
    /// the `mu` bytes before it.
    pub fn merge(&mut self) -> Result<Vec<u8>> {
        let mu = self.mu;
        let first_prefix = self
            .first_prefix
            .clone()
            .ok_or(EnumcryptError::MalformedCiphertext("no sources to merge"))?;
        let total = self.message_length();
        let mut message = vec![0u8; total];
        message[..mu].copy_from_slice(&first_prefix);
        for i in mu..total {
            let window = message[i - mu..i].to_vec();
            let source = self
                .sources
                .get_mut(&window)
                .ok_or(EnumcryptError::MalformedCiphertext(
                    "no source matches a context window",
                ))?;
            message[i] = source
                .next_char()
                .ok_or(EnumcryptError::MalformedCiphertext(
                    "source exhausted before the message",
                ))?;
        }
        Ok(message)
    }
}
