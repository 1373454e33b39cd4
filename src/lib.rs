//! Enumerative symmetric encryption engine.
//!
//! A fixed-size block of symbols is mapped to its unique rank among all
//! distinct rearrangements of that exact multiset, and only the rank is
//! kept secret — XORed against a repeating key bit stream — while the
//! symbol-frequency statistics travel in the clear. Decryption recomputes
//! the combinatorial structure from the statistics and unranks the
//! decrypted index back into the exact original block. Ciphertext size
//! approaches the information-theoretic minimum implied by each block's
//! symbol distribution.
//!
//! # Architecture
//!
//! ```text
//! BitCursor             (bit-position bookkeeping; three advance modes)
//!     ↕
//! Serializer ∙ BitFile  (bit-exact fields, padding-free stream)
//!     ↕
//! Numeration Engine     (rank ↔ block, DeltaTable constants, subnumber)
//!     ↕
//! crypt                 (per-block pipelines; keystream over the rank)
//! ```
//!
//! Everything is synchronous and single-threaded; blocks are processed
//! strictly in sequence. This is not an authenticated cipher: the keystream
//! is a plain repeating XOR and no integrity is provided.
//!
//! # Examples
//!
//! ```
//! use enumcrypt::crypt;
//! use enumcrypt::delta::MemoryDeltaCache;
//! use enumcrypt::io::{BitFile, FileMode};
//!
//! let dir = tempfile::tempdir().unwrap();
//! let plain = dir.path().join("plain");
//! let cipher = dir.path().join("cipher");
//! let restored = dir.path().join("restored");
//! std::fs::write(&plain, b"attack at dawn").unwrap();
//!
//! let cache = MemoryDeltaCache::new();
//! let mut input = BitFile::open(&plain, FileMode::Read).unwrap();
//! let mut output = BitFile::open(&cipher, FileMode::Write).unwrap();
//! crypt::encrypt(&mut output, &mut input, b"secret", 3, 0, &cache).unwrap();
//! output.close().unwrap();
//!
//! let mut input = BitFile::open(&cipher, FileMode::Read).unwrap();
//! let mut output = BitFile::open(&restored, FileMode::Write).unwrap();
//! crypt::decrypt(&mut output, &mut input, b"secret", 3, 0, &cache).unwrap();
//! output.close().unwrap();
//!
//! assert_eq!(std::fs::read(&restored).unwrap(), b"attack at dawn");
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod bits;
pub mod block;
pub mod crypt;
pub mod delta;
pub mod error;
pub mod io;
pub mod keystream;
pub mod numeration;
pub mod serializer;
pub mod splitter;
pub mod statistics;

pub use block::Block;
pub use error::{EnumcryptError, Result};
pub use statistics::Statistics;
