//! Top-level encrypt/decrypt pipelines.
//!
//! With `mu == 0` the input is consumed block by block and the output is
//! the bare block stream: per block `[statistics][subset][subnumber]`, no
//! padding between fields or blocks, the subnumber keystream-encrypted and
//! the rest in the clear — the receiver needs the clear fields to locate
//! and size the ciphertext. With `mu > 0` the message is first split into
//! context-keyed sources, each preceded on the wire by its own header.

use tracing::debug;

use crate::bits::BITS_IN_BYTE;
use crate::block::Block;
use crate::delta::{DeltaCache, DeltaTable};
use crate::error::{EnumcryptError, Result};
use crate::io::{BitFile, BlockRead};
use crate::keystream::Key;
use crate::numeration::{self, Number, Subnumber};
use crate::serializer;
use crate::splitter::{self, Source, SourceList};
use crate::statistics::{Statistics, ALPHABET_SIZE};

/// Supported block size exponents.
const SIGMA_RANGE: std::ops::RangeInclusive<u32> = 1..=16;

/// Outcome of decoding one block from the ciphertext stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockDecode {
    /// The block was restored; its content is ready to emit.
    Decoded,
    /// The stream ended cleanly before the block — the normal terminator.
    EndOfStream,
}

fn check_sigma(sigma: u32) -> Result<()> {
    if SIGMA_RANGE.contains(&sigma) {
        Ok(())
    } else {
        Err(EnumcryptError::InvalidSigma(sigma))
    }
}

/// Encrypts `infile` into `outfile` with the given key and block size.
pub fn encrypt(
    outfile: &mut BitFile,
    infile: &mut BitFile,
    key_data: &[u8],
    sigma: u32,
    mu: usize,
    cache: &dyn DeltaCache,
) -> Result<()> {
    check_sigma(sigma)?;
    let deltas = DeltaTable::get(sigma, cache)?;
    let mut key = Key::new(key_data)?;
    if mu == 0 {
        encrypt_stream(outfile, infile, &mut key, &deltas)?;
    } else {
        encrypt_split(outfile, infile, &mut key, &deltas, mu)?;
    }
    outfile.flush()
}

/// Decrypts `infile` into `outfile`; the inverse of [`encrypt`] under the
/// same key, sigma and mu.
pub fn decrypt(
    outfile: &mut BitFile,
    infile: &mut BitFile,
    key_data: &[u8],
    sigma: u32,
    mu: usize,
    cache: &dyn DeltaCache,
) -> Result<()> {
    check_sigma(sigma)?;
    let deltas = DeltaTable::get(sigma, cache)?;
    let mut key = Key::new(key_data)?;
    if mu == 0 {
        decrypt_stream(outfile, infile, &mut key, &deltas)?;
    } else {
        decrypt_split(outfile, infile, &mut key, &deltas, mu)?;
    }
    outfile.flush()
}

/// Direct pipeline: one block per read, final block recognized by a short
/// read. An input that is an exact multiple of the block size is followed
/// by one empty all-padding block, so the loop always ends on a final one.
fn encrypt_stream(
    outfile: &mut BitFile,
    infile: &mut BitFile,
    key: &mut Key,
    deltas: &DeltaTable,
) -> Result<()> {
    let mut block = Block::new(deltas.sigma());
    loop {
        let read = infile.read_block(&mut block)?;
        let statistics = Statistics::gather(&block);
        encrypt_block(outfile, &block, &statistics, key, deltas)?;
        if read == BlockRead::Final {
            break;
        }
    }
    Ok(())
}

fn decrypt_stream(
    outfile: &mut BitFile,
    infile: &mut BitFile,
    key: &mut Key,
    deltas: &DeltaTable,
) -> Result<()> {
    let mut block = Block::new(deltas.sigma());
    while decrypt_block(&mut block, infile, key, deltas)? == BlockDecode::Decoded {
        outfile.write_block(&block)?;
    }
    Ok(())
}

/// Ranks one block and emits its three wire fields.
pub fn encrypt_block(
    outfile: &mut BitFile,
    block: &Block,
    statistics: &Statistics,
    key: &mut Key,
    deltas: &DeltaTable,
) -> Result<()> {
    let number = Number::eval(block, statistics, deltas);
    let subnumber = Subnumber::eval(&number);

    let mut subnum_data =
        serializer::biguint_serialize(subnumber.subnum(), subnumber.subnum_bit_length());
    key.apply(&mut subnum_data);
    let statistics_data = serializer::statistics_serialize(statistics, block.sigma());
    let subset_data = serializer::subset_serialize(subnumber.subset(), block.sigma());

    outfile.write_sdata(&statistics_data)?;
    outfile.write_sdata(&subset_data)?;
    outfile.write_sdata(&subnum_data)?;
    Ok(())
}

/// Decodes one block from the stream into `block`.
///
/// End-of-stream at the statistics field is the normal terminator; the
/// stream ending anywhere later inside the block is truncation.
pub fn decrypt_block(
    block: &mut Block,
    infile: &mut BitFile,
    key: &mut Key,
    deltas: &DeltaTable,
) -> Result<BlockDecode> {
    let sigma = deltas.sigma();
    let stats_bits = (sigma as usize + 1) * ALPHABET_SIZE;
    let statistics_data = match infile.read_sdata(stats_bits)? {
        Some(data) => data,
        None => return Ok(BlockDecode::EndOfStream),
    };
    let statistics = serializer::statistics_deserialize(&statistics_data, sigma)?;

    let subset_data = infile
        .read_sdata(sigma as usize + 4)?
        .ok_or(EnumcryptError::UnexpectedEof)?;
    let subset = serializer::subset_deserialize(&subset_data);

    block.generate(&statistics);
    let rho = numeration::eval_rho(block, &statistics);
    let delta = numeration::eval_delta(&rho, deltas);
    let subnum_bit_length = numeration::eval_subnum_bit_length(&delta, subset)?;

    let mut subnum_data = infile
        .read_sdata(subnum_bit_length)?
        .ok_or(EnumcryptError::UnexpectedEof)?;
    key.apply(&mut subnum_data);
    let subnum = serializer::biguint_deserialize(&subnum_data);

    let subnumber = Subnumber::from_parts(subset, subnum, subnum_bit_length);
    let number = Number::restore(&delta, &subnumber)?;
    numeration::block_restore(block, &statistics, &rho, deltas, &number)?;
    Ok(BlockDecode::Decoded)
}

/// Splitter pipeline: the whole message is bucketed into context sources;
/// each source travels as its header followed by its block stream.
fn encrypt_split(
    outfile: &mut BitFile,
    infile: &mut BitFile,
    key: &mut Key,
    deltas: &DeltaTable,
    mu: usize,
) -> Result<()> {
    let message = read_message(infile)?;
    let list = SourceList::split(&message, mu)?;
    debug!(sources = list.len(), mu, "message split into context sources");

    let mut block = Block::new(deltas.sigma());
    for source in list.iter() {
        outfile.write_sdata(&source.info_serialize()?)?;
        let mut offset = 0;
        loop {
            let read = source.block_from_source(&mut block, offset);
            let statistics = Statistics::gather(&block);
            encrypt_block(outfile, &block, &statistics, key, deltas)?;
            if read == BlockRead::Final {
                break;
            }
            offset += block.size();
        }
    }
    Ok(())
}

fn decrypt_split(
    outfile: &mut BitFile,
    infile: &mut BitFile,
    key: &mut Key,
    deltas: &DeltaTable,
    mu: usize,
) -> Result<()> {
    let mut list = SourceList::new(mu);
    let mut block = Block::new(deltas.sigma());
    loop {
        let info = match infile.read_sdata((mu + 1 + 4) * BITS_IN_BYTE)? {
            Some(data) => data,
            None => break,
        };
        let (prefix, last_char, length) = splitter::info_deserialize(&info, mu);

        let mut source = Source::with_prefix(prefix);
        loop {
            match decrypt_block(&mut block, infile, key, deltas)? {
                BlockDecode::Decoded => {}
                BlockDecode::EndOfStream => return Err(EnumcryptError::UnexpectedEof),
            }
            source.append_block(&block);
            if block.length() < block.size() {
                break;
            }
        }
        source.push(last_char);
        if source.len() != length as usize {
            return Err(EnumcryptError::MalformedCiphertext(
                "source length disagrees with its block stream",
            ));
        }
        list.insert(source);
    }

    let message = list.merge()?;
    debug!(bytes = message.len(), "message merged from context sources");
    outfile.write(&message)
}

/// Reads the remaining input in full.
fn read_message(infile: &mut BitFile) -> Result<Vec<u8>> {
    let mut message = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = infile.read(&mut chunk)?;
        message.extend_from_slice(&chunk[..n]);
        if n < chunk.len() {
            break;
        }
    }
    Ok(message)
}
